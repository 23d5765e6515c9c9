//! Gist synchronization for the standalone order book.
//!
//! A push writes the whole local list to the remote; a pull fetches the
//! remote snapshot and reconciles it with the local list using
//! [`bakery_core::reconcile`]. There is no locking or versioning: two
//! writers racing each other resolve by last write wins.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use bakery_core::{MergePolicy, Resolution, Snapshot, reconcile};

use crate::book::OrderBook;
use crate::config::{ConfigError, SyncConfig};
use crate::gist::{RemoteError, SnapshotStore};
use crate::store::{KeyValueStore, LAST_SYNC_KEY, StoreError};

/// Sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No token is configured.
    #[error("sync is not configured: set a GitHub token first")]
    NotConfigured,

    /// The remote rejected the token (401 or 403). The user must supply a new one.
    #[error("GitHub rejected the token: {0}")]
    Credentials(#[source] RemoteError),

    /// The configured gist no longer exists. Its id has been cleared and a
    /// new gist will be created on the next push.
    #[error("gist not found; it will be recreated on next sync")]
    GistMissing,

    /// Any other remote failure, usually a network problem.
    #[error("remote unavailable: {0}")]
    Remote(#[source] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the caller should ask for a new token.
    #[must_use]
    pub const fn needs_token(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::Credentials(_))
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        if err.is_credentials() {
            Self::Credentials(err)
        } else {
            Self::Remote(err)
        }
    }
}

/// Result of a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The configured gist was overwritten.
    Updated,
    /// No gist was configured; a new one was created.
    Created { gist_id: String },
    /// The configured gist was gone; a replacement was created.
    Recreated { gist_id: String },
}

/// Summary of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub resolution: Resolution,
    pub orders: usize,
    pub local_wins: usize,
    pub local_kept: usize,
    pub local_dropped: usize,
    /// Set when the merged list was written back to the remote.
    pub pushed: Option<PushOutcome>,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No token or no gist id; nothing was fetched.
    Skipped,
    Reconciled(PullReport),
}

/// Read the last successful sync stamp.
///
/// Accepts both a bare RFC 3339 string and a JSON-quoted one. An
/// unparseable value counts as never synced.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be read.
pub fn last_sync<S: KeyValueStore>(store: &S) -> Result<Option<DateTime<Utc>>, StoreError> {
    let Some(raw) = store.get(LAST_SYNC_KEY)? else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(raw.trim().trim_matches('"'))
        .map(|t| t.with_timezone(&Utc));
    if parsed.is_err() {
        tracing::warn!(value = %raw, "Ignoring unparseable last sync stamp");
    }
    Ok(parsed.ok())
}

fn set_last_sync<S: KeyValueStore>(store: &S, at: DateTime<Utc>) -> Result<(), StoreError> {
    store.set(LAST_SYNC_KEY, &at.to_rfc3339())
}

/// Check a token against the remote and store it with `gist_id`.
///
/// The gist id is stored as given: `None` or a blank id unlinks the current
/// gist, so the next push creates a new one. Returns the account name the
/// token belongs to.
///
/// # Errors
///
/// Returns [`SyncError::Credentials`] if the remote rejects the token,
/// [`SyncError::Remote`] if it cannot be reached and [`SyncError::Store`]
/// if the config cannot be saved.
#[instrument(skip_all)]
pub async fn configure<S, R>(
    store: &S,
    remote: &R,
    token: SecretString,
    gist_id: Option<String>,
) -> Result<String, SyncError>
where
    S: KeyValueStore,
    R: SnapshotStore,
{
    let login = remote.verify().await?;

    let mut config = SyncConfig::load(store)?;
    config.token = Some(token);
    config.gist_id = gist_id
        .map(|id| id.trim().to_owned())
        .filter(|id| !id.is_empty());
    config.save(store)?;

    tracing::info!(%login, linked = config.is_linked(), "Sync configured");
    Ok(login)
}

/// Pushes and pulls an [`OrderBook`] against a [`SnapshotStore`].
#[derive(Debug)]
pub struct SyncEngine<R> {
    remote: R,
    policy: MergePolicy,
}

impl<R: SnapshotStore> SyncEngine<R> {
    /// Engine with the default merge policy.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            policy: MergePolicy::default(),
        }
    }

    /// Replace the merge policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Write the local list to the remote.
    ///
    /// If the push fails and a gist id is still configured, a pull is
    /// attempted so the local list picks up remote changes; that pull's
    /// own failure is logged and dropped, and the push error is returned.
    ///
    /// # Errors
    ///
    /// See [`SyncError`].
    #[instrument(skip_all, fields(orders = book.orders().len()))]
    pub async fn push<S: KeyValueStore>(
        &self,
        book: &mut OrderBook<S>,
        now: DateTime<Utc>,
    ) -> Result<PushOutcome, SyncError> {
        match self.write_remote(book, now).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!(error = %err, "Push failed");
                let still_linked = SyncConfig::load(book.store())
                    .map(|c| c.is_linked())
                    .unwrap_or(false);
                if still_linked {
                    if let Err(pull_err) = self.pull(book, now).await {
                        tracing::warn!(error = %pull_err, "Fallback pull failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Fetch the remote snapshot and reconcile it into the local list.
    ///
    /// When the merge produces changes the remote lacks, they are written
    /// back. A failure of that write-back is logged and reported as
    /// `pushed: None`; the local list stays reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::GistMissing`] when the gist is gone (its id is
    /// cleared first), or another [`SyncError`] from the fetch or the store.
    #[instrument(skip_all)]
    pub async fn pull<S: KeyValueStore>(
        &self,
        book: &mut OrderBook<S>,
        now: DateTime<Utc>,
    ) -> Result<PullOutcome, SyncError> {
        let mut config = SyncConfig::load(book.store())?;
        let Some(gist_id) = config.gist_id.clone().filter(|_| config.has_token()) else {
            tracing::debug!("Sync not configured, skipping pull");
            return Ok(PullOutcome::Skipped);
        };

        let remote = match self.remote.fetch(&gist_id).await {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_not_found() => {
                tracing::warn!(%gist_id, "Gist not found, clearing stored id");
                config.gist_id = None;
                config.save(book.store())?;
                return Err(SyncError::GistMissing);
            }
            Err(err) => return Err(err.into()),
        };

        let local_last_sync = last_sync(book.store())?;
        let merged = reconcile(book.orders(), local_last_sync, remote, now, self.policy);
        tracing::info!(
            resolution = ?merged.resolution,
            orders = merged.orders.len(),
            local_wins = merged.local_wins,
            local_kept = merged.local_kept,
            local_dropped = merged.local_dropped,
            "Snapshot reconciled"
        );

        let mut report = PullReport {
            resolution: merged.resolution,
            orders: merged.orders.len(),
            local_wins: merged.local_wins,
            local_kept: merged.local_kept,
            local_dropped: merged.local_dropped,
            pushed: None,
        };

        book.replace_all(merged.orders)?;
        set_last_sync(book.store(), merged.last_sync)?;

        if merged.should_push {
            match self.write_remote(book, now).await {
                Ok(outcome) => report.pushed = Some(outcome),
                Err(err) => tracing::warn!(error = %err, "Write-back after merge failed"),
            }
        }

        Ok(PullOutcome::Reconciled(report))
    }

    /// Pull ahead of a local edit so the push that follows starts from the
    /// remote's latest list. Failures are logged and leave the local list
    /// untouched.
    pub async fn catch_up<S: KeyValueStore>(
        &self,
        book: &mut OrderBook<S>,
        now: DateTime<Utc>,
    ) -> Option<PullReport> {
        match self.pull(book, now).await {
            Ok(PullOutcome::Reconciled(report)) => Some(report),
            Ok(PullOutcome::Skipped) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Pull before edit failed, using local list");
                None
            }
        }
    }

    /// Push without the fallback pull.
    async fn write_remote<S: KeyValueStore>(
        &self,
        book: &OrderBook<S>,
        now: DateTime<Utc>,
    ) -> Result<PushOutcome, SyncError> {
        let mut config = SyncConfig::load(book.store())?;
        if !config.has_token() {
            return Err(SyncError::NotConfigured);
        }

        let snapshot = Snapshot::new(book.orders().to_vec(), now);

        let outcome = match config.gist_id.clone() {
            Some(gist_id) => match self.remote.update(&gist_id, &snapshot).await {
                Ok(()) => PushOutcome::Updated,
                Err(err) if err.is_not_found() => {
                    tracing::warn!(%gist_id, "Gist not found, creating a new one");
                    config.gist_id = None;
                    config.save(book.store())?;

                    let gist_id = self.remote.create(&snapshot).await?;
                    config.gist_id = Some(gist_id.clone());
                    config.save(book.store())?;
                    PushOutcome::Recreated { gist_id }
                }
                Err(err) => return Err(err.into()),
            },
            None => {
                let gist_id = self.remote.create(&snapshot).await?;
                config.gist_id = Some(gist_id.clone());
                config.save(book.store())?;
                PushOutcome::Created { gist_id }
            }
        };

        set_last_sync(book.store(), now)?;
        tracing::info!(?outcome, "Snapshot pushed");
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn test_last_sync_accepts_bare_and_quoted() {
        let store = MemoryStore::new();
        assert_eq!(last_sync(&store).unwrap(), None);

        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        set_last_sync(&store, at).unwrap();
        assert_eq!(last_sync(&store).unwrap(), Some(at));

        store
            .set(LAST_SYNC_KEY, "\"2026-03-04T05:06:07.000Z\"")
            .unwrap();
        assert_eq!(last_sync(&store).unwrap(), Some(at));
    }

    #[test]
    fn test_last_sync_garbage_is_none() {
        let store = MemoryStore::new();
        store.set(LAST_SYNC_KEY, "yesterday").unwrap();
        assert_eq!(last_sync(&store).unwrap(), None);
    }

    #[test]
    fn test_remote_error_classification() {
        assert!(matches!(
            SyncError::from(RemoteError::Unauthorized),
            SyncError::Credentials(_)
        ));
        assert!(matches!(
            SyncError::from(RemoteError::Forbidden),
            SyncError::Credentials(_)
        ));
        let offline = SyncError::from(RemoteError::Api {
            status: 502,
            message: "bad gateway".to_owned(),
        });
        assert!(matches!(offline, SyncError::Remote(_)));
        assert!(!offline.needs_token());
        assert!(SyncError::NotConfigured.needs_token());
    }
}
