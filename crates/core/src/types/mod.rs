//! Core types for Bakery Orders.
//!
//! This module provides the order record, its id and status workflows, and
//! the validated input shape used by both variants.

pub mod id;
pub mod order;
pub mod status;
pub mod validation;

pub use id::OrderId;
pub use order::{LocalOrder, Order, OrderItem, ServerOrder};
pub use status::{InvalidStatus, LocalStatus, OrderStatus, StatusWorkflow};
pub use validation::{
    DraftRules, FieldError, ItemDraft, OrderDraft, ValidOrder, ValidationErrors,
};
