//! Gist sync commands.
//!
//! # Usage
//!
//! ```bash
//! # Store a token (verified against GitHub first), optionally linking an existing gist
//! bakery sync configure --token ghp_xxx --gist-id 0123abcd
//!
//! bakery sync push
//! bakery sync pull
//! bakery sync status
//! ```
//!
//! Once a token and gist are configured, order commands pull before they
//! run and push after any change.

use chrono::{DateTime, Utc};
use thiserror::Error;

use bakery_local::sync::{self as engine, PullOutcome, PushOutcome, SyncEngine, SyncError};
use bakery_local::{
    ConfigError, GistClient, KeyValueStore, OrderBook, RemoteError, StoreError, SyncConfig,
    validate_token_format,
};

/// Errors from sync commands.
#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] RemoteError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn engine_for<S: KeyValueStore>(store: &S) -> Result<SyncEngine<GistClient>, SyncCommandError> {
    let config = SyncConfig::load(store)?;
    let token = config.token.ok_or(SyncError::NotConfigured)?;
    Ok(SyncEngine::new(GistClient::new(&token)?))
}

/// Validate, verify and store a token, then sync any existing orders.
///
/// Omitting `gist_id` unlinks the current gist. With orders on hand, a
/// linked gist is pulled and merged; otherwise a new gist is created.
///
/// # Errors
///
/// Returns error if the token is malformed or GitHub rejects it. A failed
/// follow-up sync is only logged.
pub async fn configure<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    token: &str,
    gist_id: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SyncCommandError> {
    let token = validate_token_format(token)?;
    let sync_engine = SyncEngine::new(GistClient::new(&token)?);
    let login = engine::configure(book.store(), sync_engine.remote(), token, gist_id).await?;
    tracing::info!(%login, "Token saved");

    if book.orders().is_empty() {
        return Ok(());
    }
    if SyncConfig::load(book.store())?.is_linked() {
        sync_engine.catch_up(book, now).await;
    } else {
        match sync_engine.push(book, now).await {
            Ok(outcome) => report_push(&outcome),
            Err(e) => tracing::warn!(error = %e, "Initial sync failed; run `bakery sync push` later"),
        }
    }
    Ok(())
}

/// Push the local list to the gist.
///
/// # Errors
///
/// Returns error if sync is not configured or the push fails.
pub async fn push<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    now: DateTime<Utc>,
) -> Result<(), SyncCommandError> {
    let engine = engine_for(book.store())?;
    report_push(&engine.push(book, now).await?);
    Ok(())
}

/// Pull and merge the gist into the local list.
///
/// # Errors
///
/// Returns error if sync is not configured or the pull fails.
pub async fn pull<S: KeyValueStore>(
    book: &mut OrderBook<S>,
    now: DateTime<Utc>,
) -> Result<(), SyncCommandError> {
    let engine = engine_for(book.store())?;
    match engine.pull(book, now).await? {
        PullOutcome::Skipped => tracing::info!("No gist linked yet; run `bakery sync push` first"),
        PullOutcome::Reconciled(report) => {
            tracing::info!(
                resolution = ?report.resolution,
                orders = report.orders,
                local_wins = report.local_wins,
                local_kept = report.local_kept,
                local_dropped = report.local_dropped,
                "Pulled"
            );
            if let Some(outcome) = &report.pushed {
                report_push(outcome);
            }
        }
    }
    Ok(())
}

/// Pull before an order command when a gist is linked, so a later push
/// does not overwrite orders added elsewhere. Failures are only logged.
pub async fn auto_pull<S: KeyValueStore>(book: &mut OrderBook<S>, now: DateTime<Utc>) {
    let linked = SyncConfig::load(book.store()).is_ok_and(|c| c.is_linked());
    if !linked {
        return;
    }
    match engine_for(book.store()) {
        Ok(engine) => {
            if let Some(report) = engine.catch_up(book, now).await {
                tracing::debug!(resolution = ?report.resolution, orders = report.orders, "Caught up");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Sync unavailable"),
    }
}

/// Push after a local change when a token is configured. Failures leave
/// the change saved locally and are only logged.
pub async fn auto_push<S: KeyValueStore>(book: &mut OrderBook<S>, now: DateTime<Utc>) {
    let engine = match engine_for(book.store()) {
        Ok(engine) => engine,
        Err(SyncCommandError::Sync(SyncError::NotConfigured)) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Sync unavailable");
            return;
        }
    };

    match engine.push(book, now).await {
        Ok(outcome) => report_push(&outcome),
        Err(e) if e.needs_token() => {
            tracing::warn!(error = %e, "Saved locally; run `bakery sync configure` with a valid token");
        }
        Err(e) => tracing::warn!(error = %e, "Saved locally; working offline"),
    }
}

/// Show sync configuration and the last sync time.
///
/// # Errors
///
/// Returns error if the store cannot be read.
#[allow(clippy::print_stdout)]
pub fn status<S: KeyValueStore>(book: &OrderBook<S>) -> Result<(), SyncCommandError> {
    let config = SyncConfig::load(book.store())?;
    let last_sync = engine::last_sync(book.store())?;

    println!(
        "Token      {}",
        if config.has_token() { "configured" } else { "not set" }
    );
    println!(
        "Gist       {}",
        config.gist_id.as_deref().unwrap_or("(created on next push)")
    );
    println!(
        "Last sync  {}",
        last_sync.map_or_else(|| "never".to_owned(), |t| t.to_rfc3339())
    );
    println!("Orders     {}", book.orders().len());
    Ok(())
}

fn report_push(outcome: &PushOutcome) {
    match outcome {
        PushOutcome::Updated => tracing::info!("Gist updated"),
        PushOutcome::Created { gist_id } => tracing::info!(%gist_id, "Gist created"),
        PushOutcome::Recreated { gist_id } => {
            tracing::warn!(%gist_id, "Previous gist was missing; created a new one");
        }
    }
}
