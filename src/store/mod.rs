//! Versioned snapshot store.
//!
//! The store is the only holder of "the" current snapshot in an agent
//! process. It has one logical writer and any number of subscribers:
//!
//! - Every committed snapshot gets a version strictly greater than the one
//!   before it, unless it is a same-state refresh of the current version.
//! - Commits are fanned out to bounded per-subscriber queues. A full queue
//!   costs that subscriber a missed notification; it never blocks or fails
//!   the writer. Closed queues are pruned after each fan-out.
//! - `get` only takes the short state lock and never waits on fan-out.
//!
//! # Example
//!
//! ```rust
//! use qcore_state::core::FsmState;
//! use qcore_state::engine::derive;
//! use qcore_state::store::{StateStore, StoreConfig};
//!
//! # tokio_test_block_on(async {
//! let store = StateStore::new(StoreConfig::default());
//! let mut feed = store.subscribe("logger").unwrap();
//!
//! let first = store.initialize_if_empty().await;
//! let next = derive(&first, FsmState::Idle, "BOOT_COMPLETE", None);
//! let committed = store.set_or_bump(next).await.unwrap();
//!
//! assert_eq!(committed.version, 1);
//! assert_eq!(feed.try_recv().unwrap().version, 0);
//! assert_eq!(feed.try_recv().unwrap().version, 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod config;
mod error;
pub mod health;
mod metrics;
mod subscription;

pub use config::{
    StoreConfig, VersionPolicy, DEFAULT_MAX_SUBSCRIBERS, DEFAULT_NOTIFY_TIMEOUT_MS,
    DEFAULT_QUEUE_CAPACITY,
};
pub use error::StoreError;
pub use health::{HealthReport, HealthThresholds};
pub use metrics::StoreMetrics;
pub use subscription::{SubscriberId, SubscriberStats, Subscription};

use crate::core::{new_instance_id, FsmState, Snapshot};
use chrono::{DateTime, Utc};
use metrics::Counters;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use subscription::SubscriberEntry;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, info, warn};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Diagnostic view returned by [`StateStore::get_with_metadata`].
#[derive(Clone, Debug)]
pub struct StoreDiagnostics {
    pub instance_id: String,
    pub metrics: StoreMetrics,
    pub config: StoreConfig,
    pub subscribers: Vec<SubscriberStats>,
}

/// Shared state guarded by the store lock.
#[derive(Debug, Default)]
struct Inner {
    current: Option<Snapshot>,
    subscribers: Vec<SubscriberEntry>,
    counters: Counters,
    last_update: Option<Instant>,
    last_update_wall: Option<DateTime<Utc>>,
}

type FanOutTarget = (SubscriberId, mpsc::Sender<Snapshot>);

/// What a `set` call does once it has been checked against `current`.
enum Commit {
    /// Advance to a new version and notify subscribers.
    Publish(Snapshot),
    /// Replace the current value at the same version, no notification.
    Refresh(Snapshot),
}

/// Single-writer, many-reader versioned store for FSM snapshots.
///
/// Share it as `Arc<StateStore>`; every method takes `&self`.
#[derive(Debug)]
pub struct StateStore {
    config: StoreConfig,
    instance_id: String,
    started: Instant,
    inner: Mutex<Inner>,
    // Held across commit and fan-out so subscribers see commits in order.
    write_gate: tokio::sync::Mutex<()>,
    next_subscriber: AtomicU64,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl StateStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_instance_id(config, new_instance_id())
    }

    /// Create a store whose cold-start snapshot carries `instance_id`.
    pub fn with_instance_id(config: StoreConfig, instance_id: impl Into<String>) -> Self {
        Self {
            config,
            instance_id: instance_id.into(),
            started: Instant::now(),
            inner: Mutex::new(Inner::default()),
            write_gate: tokio::sync::Mutex::new(()),
            next_subscriber: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Identifier of the FSM run this store belongs to.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Copy of the current snapshot, if any.
    pub fn get(&self) -> Option<Snapshot> {
        let mut inner = self.inner.lock();
        inner.counters.total_gets += 1;
        inner.current.clone()
    }

    pub fn get_with_metadata(&self) -> (Option<Snapshot>, StoreDiagnostics) {
        let snapshot = self.get();
        let subscribers = {
            let inner = self.inner.lock();
            inner.subscribers.iter().map(SubscriberStats::from).collect()
        };
        let diagnostics = StoreDiagnostics {
            instance_id: self.instance_id.clone(),
            metrics: self.metrics(),
            config: self.config.clone(),
            subscribers,
        };
        (snapshot, diagnostics)
    }

    /// Commit with [`VersionPolicy::Repair`].
    pub async fn set_or_bump(&self, candidate: Snapshot) -> StoreResult<Snapshot> {
        self.set(candidate, VersionPolicy::Repair).await
    }

    /// Commit with [`VersionPolicy::Strict`].
    pub async fn set_strict(&self, candidate: Snapshot) -> StoreResult<Snapshot> {
        self.set(candidate, VersionPolicy::Strict).await
    }

    /// Commit `candidate` as the current snapshot.
    ///
    /// A candidate derived from the current snapshot without a state change
    /// (same version, same state, `parent_snapshot_id` naming the current
    /// snapshot) is a refresh: it replaces the stored value without a
    /// version bump and is not fanned out. Any other candidate whose version
    /// does not exceed the current one is a conflict, rejected or repaired
    /// per `policy`. A conflict at `u64::MAX` cannot be repaired and is
    /// rejected under both policies.
    ///
    /// Returns the snapshot as committed, with any repaired version.
    pub async fn set(&self, candidate: Snapshot, policy: VersionPolicy) -> StoreResult<Snapshot> {
        validate_candidate(&candidate)?;

        let _gate = self.write_gate.lock().await;

        let (committed, targets) = {
            let mut inner = self.inner.lock();
            let current = inner
                .current
                .as_ref()
                .map(|c| (c.version, is_refresh(&candidate, c)));

            let commit = match current {
                None => Commit::Publish(candidate),
                Some((_, true)) => Commit::Refresh(candidate),
                Some((version, false)) if candidate.version <= version => {
                    inner.counters.version_conflicts += 1;
                    let repaired = match policy {
                        VersionPolicy::Strict => None,
                        VersionPolicy::Repair => version.checked_add(1),
                    };
                    let Some(repaired) = repaired else {
                        inner.counters.rejected_sets += 1;
                        warn!(
                            candidate = candidate.version,
                            current = version,
                            ?policy,
                            "Rejected non-advancing snapshot version"
                        );
                        return Err(StoreError::VersionConflict {
                            candidate: candidate.version,
                            current: version,
                        });
                    };
                    debug!(
                        candidate = candidate.version,
                        repaired, "Repaired non-advancing snapshot version"
                    );
                    Commit::Publish(candidate.with_version(repaired))
                }
                Some(_) => Commit::Publish(candidate),
            };

            let (snapshot, publish) = match commit {
                Commit::Publish(snapshot) => (snapshot, true),
                Commit::Refresh(snapshot) => {
                    inner.counters.refreshes += 1;
                    (snapshot, false)
                }
            };

            let targets = record_commit(&mut inner, &snapshot, publish);
            (snapshot, targets)
        };

        debug!(
            version = committed.version,
            state = %committed.state,
            subscribers = targets.len(),
            "Committed snapshot"
        );

        self.fan_out(&committed, targets).await;
        Ok(committed)
    }

    /// Commit the cold-start snapshot if the store is empty.
    ///
    /// Idempotent: returns the existing snapshot when there is one.
    pub async fn initialize_if_empty(&self) -> Snapshot {
        let _gate = self.write_gate.lock().await;

        let (snapshot, targets) = {
            let mut inner = self.inner.lock();
            if let Some(current) = inner.current.as_ref() {
                return current.clone();
            }
            let snapshot = Snapshot::cold_start(self.instance_id.clone());
            let targets = record_commit(&mut inner, &snapshot, true);
            (snapshot, targets)
        };

        info!(
            instance_id = %self.instance_id,
            snapshot_id = %snapshot.snapshot_id,
            "Initialized state store with cold-start snapshot"
        );

        self.fan_out(&snapshot, targets).await;
        snapshot
    }

    /// Register a subscriber with the default queue capacity.
    pub fn subscribe(&self, label: impl Into<String>) -> StoreResult<Subscription> {
        self.subscribe_with_capacity(label, self.config.queue_capacity)
    }

    /// Register a subscriber with its own queue capacity.
    ///
    /// If a snapshot has been committed, it is queued immediately.
    pub fn subscribe_with_capacity(
        &self,
        label: impl Into<String>,
        capacity: usize,
    ) -> StoreResult<Subscription> {
        if capacity == 0 {
            return Err(StoreError::InvalidArgument(
                "subscriber queue capacity must be at least 1".to_string(),
            ));
        }

        let label = label.into();
        let mut inner = self.inner.lock();

        if inner.subscribers.len() >= self.config.max_subscribers {
            warn!(
                label = %label,
                limit = self.config.max_subscribers,
                "Subscriber limit reached"
            );
            return Err(StoreError::SubscriberLimitExceeded {
                limit: self.config.max_subscribers,
            });
        }

        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(capacity);
        let mut entry = SubscriberEntry {
            id,
            label: label.clone(),
            capacity,
            sender,
            delivered: 0,
            missed: 0,
        };

        if let Some(current) = inner.current.as_ref() {
            // A fresh queue has room, so this cannot fail.
            if entry.sender.try_send(current.clone()).is_ok() {
                entry.delivered += 1;
                inner.counters.notifications_delivered += 1;
            }
        }

        inner.subscribers.push(entry);
        debug!(%id, label = %label, active = inner.subscribers.len(), "Subscriber registered");

        Ok(Subscription::new(id, label, receiver))
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        let removed = inner.subscribers.len() != before;
        if removed {
            debug!(%id, active = inner.subscribers.len(), "Subscriber removed");
        }
        removed
    }

    pub fn metrics(&self) -> StoreMetrics {
        let inner = self.inner.lock();
        let counters = &inner.counters;
        StoreMetrics {
            total_sets: counters.total_sets,
            total_gets: counters.total_gets,
            version_conflicts: counters.version_conflicts,
            rejected_sets: counters.rejected_sets,
            refreshes: counters.refreshes,
            notifications_delivered: counters.notifications_delivered,
            notifications_missed: counters.notifications_missed,
            subscribers_pruned: counters.subscribers_pruned,
            active_subscribers: inner.subscribers.len(),
            max_subscribers: self.config.max_subscribers,
            uptime: self.started.elapsed(),
            last_update_age: inner.last_update.map(|t| t.elapsed()),
            last_update_wall: inner.last_update_wall,
            current_version: inner.current.as_ref().map(|s| s.version),
            current_state: inner.current.as_ref().map(|s| s.state),
        }
    }

    /// Advisory evaluation of [`StateStore::metrics`] against the configured
    /// thresholds.
    pub fn health_check(&self) -> HealthReport {
        health::evaluate(&self.metrics(), &self.config.health)
    }

    async fn fan_out(&self, snapshot: &Snapshot, targets: Vec<FanOutTarget>) {
        if targets.is_empty() {
            return;
        }

        let timeout = self.config.notify_timeout();
        let mut delivered = Vec::with_capacity(targets.len());
        let mut missed = Vec::new();
        let mut dead = Vec::new();

        for (id, sender) in targets {
            match sender.send_timeout(snapshot.clone(), timeout).await {
                Ok(()) => delivered.push(id),
                Err(SendTimeoutError::Timeout(_)) => {
                    debug!(%id, version = snapshot.version, "Subscriber queue full, notification missed");
                    missed.push(id);
                }
                Err(SendTimeoutError::Closed(_)) => dead.push(id),
            }
        }

        let mut inner = self.inner.lock();
        inner.counters.notifications_delivered += delivered.len() as u64;
        inner.counters.notifications_missed += missed.len() as u64;

        for entry in inner.subscribers.iter_mut() {
            if delivered.contains(&entry.id) {
                entry.delivered += 1;
            } else if missed.contains(&entry.id) {
                entry.missed += 1;
            }
        }

        if !dead.is_empty() {
            let before = inner.subscribers.len();
            inner.subscribers.retain(|s| !dead.contains(&s.id));
            let pruned = (before - inner.subscribers.len()) as u64;
            inner.counters.subscribers_pruned += pruned;
            info!(
                pruned,
                active = inner.subscribers.len(),
                "Pruned closed subscribers"
            );
        }
    }
}

/// Install `snapshot` as current and collect fan-out targets.
fn record_commit(inner: &mut Inner, snapshot: &Snapshot, publish: bool) -> Vec<FanOutTarget> {
    inner.current = Some(snapshot.clone());
    inner.counters.total_sets += 1;
    inner.last_update = Some(Instant::now());
    inner.last_update_wall = Some(Utc::now());

    if !publish {
        return Vec::new();
    }
    inner
        .subscribers
        .iter()
        .map(|s| (s.id, s.sender.clone()))
        .collect()
}

/// A no-change derivation of `current`, as produced by the engine on a
/// tick where the state holds.
fn is_refresh(candidate: &Snapshot, current: &Snapshot) -> bool {
    candidate.version == current.version
        && candidate.state == current.state
        && candidate.is_derived_from(current)
}

fn validate_candidate(candidate: &Snapshot) -> StoreResult<()> {
    if candidate.state == FsmState::Unspecified {
        return Err(StoreError::InvalidArgument(
            "snapshot state must not be UNSPECIFIED".to_string(),
        ));
    }
    if candidate.snapshot_id.is_empty() {
        return Err(StoreError::InvalidArgument(
            "snapshot_id must not be empty".to_string(),
        ));
    }
    if candidate.instance_id.is_empty() {
        return Err(StoreError::InvalidArgument(
            "instance_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::derive;
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> StateStore {
        StateStore::with_instance_id(StoreConfig::default(), "test-run")
    }

    #[tokio::test]
    async fn empty_store_returns_none() {
        let store = store();
        assert!(store.get().is_none());
        assert_eq!(store.metrics().total_gets, 1);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let second = store.initialize_if_empty().await;

        assert_eq!(first.version, 0);
        assert_eq!(first.state, FsmState::Booting);
        assert_eq!(first.reason, "COLD_START");
        assert_eq!(first.instance_id, "test-run");
        assert_eq!(first, second);
        assert_eq!(store.metrics().total_sets, 1);
    }

    #[tokio::test]
    async fn advancing_version_commits_unchanged() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let next = derive(&first, FsmState::Idle, "BOOT_COMPLETE", None);

        let committed = store.set_strict(next.clone()).await.unwrap();
        assert_eq!(committed, next);
        assert_eq!(store.get().unwrap().version, 1);
        assert_eq!(store.metrics().version_conflicts, 0);
    }

    #[tokio::test]
    async fn strict_mode_rejects_racing_sibling() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let booted = store
            .set_strict(derive(&first, FsmState::Idle, "BOOT_COMPLETE", None))
            .await
            .unwrap();
        let mut feed = store.subscribe("feed").unwrap();
        assert_eq!(feed.drain().len(), 1);

        // Both writers read v1 and move to ACTIVE.
        let winner = derive(&booted, FsmState::Active, "PROPOSALS_READY", None);
        let loser = derive(&booted, FsmState::Active, "PROPOSALS_READY", None);

        let committed = store.set_strict(winner).await.unwrap();
        assert_eq!(committed.version, 2);

        let err = store.set_strict(loser).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                candidate: 2,
                current: 2
            }
        );
        assert_eq!(store.get().unwrap(), committed);
        assert_eq!(feed.drain(), vec![committed]);

        let metrics = store.metrics();
        assert_eq!(metrics.version_conflicts, 1);
        assert_eq!(metrics.rejected_sets, 1);
        assert_eq!(metrics.refreshes, 0);
    }

    #[tokio::test]
    async fn strict_mode_rejects_undecorated_copy() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let stale = Snapshot {
            state: FsmState::Idle,
            ..first.clone()
        };

        let err = store.set_strict(stale).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                candidate: 0,
                current: 0
            }
        );
        assert_eq!(store.get().unwrap(), first);

        // Same version and state, but not derived from the stored snapshot.
        let copy = Snapshot {
            reason: "copy".to_string(),
            ..first.clone()
        };
        assert!(store.set_strict(copy).await.is_err());
        assert_eq!(store.get().unwrap(), first);

        let metrics = store.metrics();
        assert_eq!(metrics.version_conflicts, 2);
        assert_eq!(metrics.rejected_sets, 2);
    }

    #[tokio::test]
    async fn repair_mode_gives_racing_siblings_distinct_versions() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let booted = store
            .set_or_bump(derive(&first, FsmState::Idle, "BOOT_COMPLETE", None))
            .await
            .unwrap();

        let a = derive(&booted, FsmState::Active, "PROPOSALS_READY", None);
        let b = derive(&booted, FsmState::Active, "PROPOSALS_READY", None);

        assert_eq!(store.set_or_bump(a).await.unwrap().version, 2);
        assert_eq!(store.set_or_bump(b).await.unwrap().version, 3);
        assert_eq!(store.metrics().version_conflicts, 1);
    }

    #[tokio::test]
    async fn repair_mode_bumps_stale_version() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let stale = Snapshot {
            state: FsmState::Idle,
            ..first.clone()
        };

        let committed = store.set_or_bump(stale).await.unwrap();
        assert_eq!(committed.version, 1);
        assert_eq!(committed.state, FsmState::Idle);
        assert_eq!(store.metrics().version_conflicts, 1);
    }

    #[tokio::test]
    async fn repair_at_maximum_version_is_rejected() {
        let store = store();
        let top = store
            .set_strict(Snapshot::new(FsmState::Idle, "top").with_version(u64::MAX))
            .await
            .unwrap();

        let next = derive(&top, FsmState::Active, "PROPOSALS_READY", None);
        assert_eq!(next.version, u64::MAX);

        let err = store.set_or_bump(next).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                candidate: u64::MAX,
                current: u64::MAX
            }
        );
        assert_eq!(store.get().unwrap(), top);
        assert_eq!(store.metrics().rejected_sets, 1);
    }

    #[tokio::test]
    async fn same_state_same_version_is_a_refresh() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let mut feed = store.subscribe("feed").unwrap();
        assert_eq!(feed.drain().len(), 1);

        for policy in [VersionPolicy::Strict, VersionPolicy::Repair] {
            let current = store.get().unwrap();
            let refreshed = derive(&current, FsmState::Booting, "still booting", None);
            let committed = store.set(refreshed.clone(), policy).await.unwrap();
            assert_eq!(committed, refreshed);
            assert_eq!(committed.version, first.version);
        }

        assert_eq!(store.get().unwrap().reason, "still booting");
        assert!(feed.try_recv().is_none());
        let metrics = store.metrics();
        assert_eq!(metrics.refreshes, 2);
        assert_eq!(metrics.version_conflicts, 0);
    }

    #[tokio::test]
    async fn refresh_from_superseded_snapshot_conflicts() {
        let store = store();
        let first = store.initialize_if_empty().await;

        let a = derive(&first, FsmState::Booting, "tick a", None);
        let b = derive(&first, FsmState::Booting, "tick b", None);

        store.set_strict(a.clone()).await.unwrap();
        assert!(matches!(
            store.set_strict(b).await,
            Err(StoreError::VersionConflict { .. })
        ));
        assert_eq!(store.get().unwrap(), a);
        assert_eq!(store.metrics().refreshes, 1);
    }

    #[tokio::test]
    async fn invalid_candidates_are_rejected() {
        let store = store();
        let unspecified = Snapshot::new(FsmState::Unspecified, "bad");
        let no_id = Snapshot {
            snapshot_id: String::new(),
            ..Snapshot::new(FsmState::Idle, "bad")
        };
        let no_instance = Snapshot {
            instance_id: String::new(),
            ..Snapshot::new(FsmState::Idle, "bad")
        };

        for candidate in [unspecified, no_id, no_instance] {
            assert!(matches!(
                store.set_or_bump(candidate).await,
                Err(StoreError::InvalidArgument(_))
            ));
        }
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn new_subscriber_catches_up() {
        let store = store();
        let first = store.initialize_if_empty().await;
        store
            .set_or_bump(derive(&first, FsmState::Idle, "BOOT_COMPLETE", None))
            .await
            .unwrap();

        let mut feed = store.subscribe("late").unwrap();
        let caught_up = feed.try_recv().unwrap();
        assert_eq!(caught_up.version, 1);
        assert_eq!(caught_up.state, FsmState::Idle);
        assert!(feed.try_recv().is_none());
    }

    #[tokio::test]
    async fn subscriber_before_init_sees_cold_start() {
        let store = store();
        let mut feed = store.subscribe("early").unwrap();
        assert!(feed.try_recv().is_none());

        store.initialize_if_empty().await;
        assert_eq!(feed.recv().await.unwrap().reason, "COLD_START");
    }

    #[tokio::test]
    async fn subscriber_limit_is_enforced() {
        let config = StoreConfig {
            max_subscribers: 2,
            ..StoreConfig::default()
        };
        let store = StateStore::new(config);
        let _a = store.subscribe("a").unwrap();
        let _b = store.subscribe("b").unwrap();

        assert_eq!(
            store.subscribe("c").unwrap_err(),
            StoreError::SubscriberLimitExceeded { limit: 2 }
        );
    }

    #[tokio::test]
    async fn zero_capacity_is_invalid() {
        let store = store();
        assert!(matches!(
            store.subscribe_with_capacity("zero", 0),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let store = store();
        let feed = store.subscribe("once").unwrap();

        assert!(store.unsubscribe(feed.id()));
        assert!(!store.unsubscribe(feed.id()));
        assert_eq!(store.metrics().active_subscribers, 0);
    }

    #[tokio::test]
    async fn full_queue_misses_without_blocking_writer() {
        let config = StoreConfig {
            notify_timeout_ms: 1,
            ..StoreConfig::default()
        };
        let store = StateStore::new(config);
        let mut current = store.initialize_if_empty().await;
        let stalled = store.subscribe_with_capacity("stalled", 1).unwrap();

        for i in 0..5 {
            let state = if i % 2 == 0 {
                FsmState::Idle
            } else {
                FsmState::Active
            };
            current = store
                .set_or_bump(derive(&current, state, "flip", None))
                .await
                .unwrap();
        }

        assert_eq!(current.version, 5);
        let (_, diagnostics) = store.get_with_metadata();
        let stats = &diagnostics.subscribers[0];
        assert_eq!(stats.label, "stalled");
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.missed, 5);
        assert_eq!(diagnostics.metrics.notifications_missed, 5);
        drop(stalled);
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let store = store();
        let first = store.initialize_if_empty().await;
        let feed = store.subscribe("gone").unwrap();
        let _kept = store.subscribe("kept").unwrap();
        drop(feed);

        store
            .set_or_bump(derive(&first, FsmState::Idle, "BOOT_COMPLETE", None))
            .await
            .unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.active_subscribers, 1);
        assert_eq!(metrics.subscribers_pruned, 1);
    }

    #[tokio::test]
    async fn metrics_track_current_fact() {
        let store = store();
        assert_eq!(store.metrics().current_version, None);

        store.initialize_if_empty().await;
        tokio::time::sleep(Duration::from_millis(2)).await;

        let metrics = store.metrics();
        assert_eq!(metrics.current_version, Some(0));
        assert_eq!(metrics.current_state, Some(FsmState::Booting));
        assert!(metrics.last_update_age.unwrap() >= Duration::from_millis(2));
        assert!(metrics.last_update_wall.is_some());
        assert!(store.health_check().healthy);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_run_alongside_writer() {
        let store = Arc::new(store());
        let mut current = store.initialize_if_empty().await;

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..200 {
                    if let Some(snapshot) = store.get() {
                        assert!(snapshot.version >= last);
                        last = snapshot.version;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for i in 0..50 {
            let state = if i % 2 == 0 {
                FsmState::Idle
            } else {
                FsmState::Active
            };
            current = store
                .set_or_bump(derive(&current, state, "flip", None))
                .await
                .unwrap();
        }

        reader.await.unwrap();
        assert_eq!(store.get().unwrap().version, 50);
    }
}
