pub mod migrate;
pub mod orders;
pub mod server;
pub mod sync;
