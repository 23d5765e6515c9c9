//! Reconciliation of a local order list with a remote snapshot.
//!
//! Two writers share one remote snapshot: this instance, and whichever
//! instance wrote the snapshot last. There is no version token; the only
//! signals are the snapshot's `lastSync` stamp and each order's
//! `updatedAt`.
//!
//! # Algorithm
//!
//! 1. If this instance has never synced, or the remote `lastSync` is
//!    strictly newer than the local one, the remote list replaces the
//!    local list wholesale.
//! 2. Otherwise orders are merged by id:
//!    - remote-only orders are kept;
//!    - orders on both sides keep the copy with the later `updatedAt`,
//!      equal stamps go to [`TieBreak`];
//!    - local-only orders are kept according to [`LocalOnlyPolicy`].
//!
//! The caller pushes the result back when [`Reconciliation::should_push`]
//! is set.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Order, OrderId};

/// The remote JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "S: Deserialize<'de> + Default")
)]
pub struct Snapshot<S> {
    #[serde(default)]
    pub orders: Vec<Order<S>>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl<S> Snapshot<S> {
    /// Snapshot of `orders` stamped at `now`.
    #[must_use]
    pub const fn new(orders: Vec<Order<S>>, now: DateTime<Utc>) -> Self {
        Self {
            orders,
            last_sync: Some(now),
        }
    }
}

/// Which copy wins when both sides carry the same `updatedAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep the remote copy.
    #[default]
    RemoteWins,
    /// Keep the local copy.
    LocalWins,
}

/// What happens to orders that exist only locally during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOnlyPolicy {
    /// Keep them all.
    KeepAll,
    /// Keep only those updated within the window; older ones are treated
    /// as deleted by the other writer.
    KeepRecent(Duration),
}

impl Default for LocalOnlyPolicy {
    fn default() -> Self {
        Self::KeepRecent(Duration::minutes(5))
    }
}

/// Merge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergePolicy {
    pub tie_break: TieBreak,
    pub local_only: LocalOnlyPolicy,
}

/// How the reconciled list was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The remote list replaced the local list.
    ReplacedByRemote,
    /// The lists were merged order by order.
    Merged,
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<S> {
    pub orders: Vec<Order<S>>,
    /// New local last-sync stamp.
    pub last_sync: DateTime<Utc>,
    pub resolution: Resolution,
    /// Local orders that won over their remote copy.
    pub local_wins: usize,
    /// Local-only orders carried into the result.
    pub local_kept: usize,
    /// Local-only orders dropped as stale.
    pub local_dropped: usize,
    /// Whether the result differs from the remote list and should be written back.
    pub should_push: bool,
}

/// Reconcile `local` with `remote`.
///
/// `local_last_sync` is the stamp recorded after this instance's previous
/// successful sync, `now` the current time.
#[must_use]
pub fn reconcile<S: Clone>(
    local: &[Order<S>],
    local_last_sync: Option<DateTime<Utc>>,
    remote: Snapshot<S>,
    now: DateTime<Utc>,
    policy: MergePolicy,
) -> Reconciliation<S> {
    let remote_is_newer = match (local_last_sync, remote.last_sync) {
        (None, _) => true,
        (Some(local), Some(remote)) => remote > local,
        (Some(_), None) => false,
    };

    if remote_is_newer {
        return Reconciliation {
            orders: remote.orders,
            last_sync: remote.last_sync.unwrap_or(now),
            resolution: Resolution::ReplacedByRemote,
            local_wins: 0,
            local_kept: 0,
            local_dropped: 0,
            should_push: false,
        };
    }

    let local_by_id: HashMap<&OrderId, &Order<S>> = local.iter().map(|o| (&o.id, o)).collect();
    let remote_ids: HashSet<OrderId> = remote.orders.iter().map(|o| o.id.clone()).collect();

    let mut local_wins = 0;
    let mut merged: Vec<Order<S>> = remote
        .orders
        .into_iter()
        .map(|remote_order| match local_by_id.get(&remote_order.id) {
            Some(local_order) if local_takes_precedence(local_order, &remote_order, policy) => {
                local_wins += 1;
                (*local_order).clone()
            }
            _ => remote_order,
        })
        .collect();

    let mut local_kept = 0;
    let mut local_dropped = 0;
    for order in local.iter().filter(|o| !remote_ids.contains(&o.id)) {
        let keep = match policy.local_only {
            LocalOnlyPolicy::KeepAll => true,
            LocalOnlyPolicy::KeepRecent(window) => order.updated_at > now - window,
        };
        if keep {
            local_kept += 1;
            merged.push(order.clone());
        } else {
            local_dropped += 1;
        }
    }

    Reconciliation {
        orders: merged,
        last_sync: now,
        resolution: Resolution::Merged,
        local_wins,
        local_kept,
        local_dropped,
        should_push: local_wins > 0 || local_kept > 0,
    }
}

fn local_takes_precedence<S>(local: &Order<S>, remote: &Order<S>, policy: MergePolicy) -> bool {
    match local.updated_at.cmp(&remote.updated_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => policy.tie_break == TieBreak::LocalWins,
    }
}
