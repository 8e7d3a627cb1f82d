//! services/bridge/src/coordinator.rs
//!
//! Owns the published snapshot. A single background task polls the backend on
//! an interval; handlers read the latest snapshot and may force a refresh after
//! a write. Concurrent refresh requests share one in-flight fetch.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use choreboard_core::domain::{ChoreAction, Snapshot};
use choreboard_core::ingest::merge_chores;
use choreboard_core::ports::{ChoreBoardService, PortError, PortResult};
use choreboard_core::views::{build_views, ViewSet};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a refresh produced no new snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefreshError {
    #[error("ChoreBoard is unavailable: {0}")]
    Unavailable(String),
    #[error("ChoreBoard refused the configured credentials")]
    NeedsReconfiguration,
}

impl From<PortError> for RefreshError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => RefreshError::NeedsReconfiguration,
            other => RefreshError::Unavailable(other.to_string()),
        }
    }
}

/// The parts of the configuration the coordinator needs.
#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    pub monitored_users: Vec<String>,
    pub time_zone: Tz,
    pub completions_limit: usize,
    pub scan_interval: Duration,
}

/// A snapshot together with the views derived from it at publish time.
#[derive(Debug)]
pub struct Published {
    pub snapshot: Snapshot,
    pub views: ViewSet,
}

/// Health of the polling loop as reported by `GET /status`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RefreshStatus {
    pub available: bool,
    pub needs_reconfiguration: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Arc<Published>, RefreshError>>>;

pub struct Coordinator {
    api: Arc<dyn ChoreBoardService>,
    settings: CoordinatorSettings,
    published: RwLock<Option<Arc<Published>>>,
    status: RwLock<RefreshStatus>,
    /// The fetch currently running, tagged with its generation.
    inflight: Mutex<Option<(u64, SharedRefresh)>>,
    next_generation: AtomicU64,
    /// Generation of the fetch that last wrote `published` or `status`.
    settled_generation: AtomicU64,
    wake: Notify,
}

impl Coordinator {
    pub fn new(api: Arc<dyn ChoreBoardService>, settings: CoordinatorSettings) -> Arc<Self> {
        Arc::new(Self {
            api,
            settings,
            published: RwLock::new(None),
            status: RwLock::new(RefreshStatus::default()),
            inflight: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            settled_generation: AtomicU64::new(0),
            wake: Notify::new(),
        })
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// The most recently published snapshot, if any refresh has succeeded.
    pub async fn current(&self) -> Option<Arc<Published>> {
        self.published.read().await.clone()
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    /// Fetches a new snapshot, or joins the fetch already in flight.
    ///
    /// On failure the previously published snapshot stays in place.
    pub async fn refresh(self: &Arc<Self>) -> Result<Arc<Published>, RefreshError> {
        self.refresh_from(0).await
    }

    /// Asks the poll loop to refresh now instead of waiting for the interval.
    pub fn request_refresh(&self) {
        self.wake.notify_one();
    }

    /// Forwards a write to the backend, then refreshes so readers see its effect.
    ///
    /// A failed write leaves local state untouched. A failed follow-up refresh
    /// is only logged; the write itself succeeded.
    pub async fn perform(self: &Arc<Self>, action: &ChoreAction) -> PortResult<()> {
        info!(
            action = action.name(),
            target_id = action.target_id(),
            "Forwarding action to ChoreBoard"
        );
        self.api.perform(action).await.map_err(|e| {
            warn!(action = action.name(), "Action failed: {}", e);
            e
        })?;

        // Any fetch that started before the write may miss it.
        let after_write = self.next_generation.load(Ordering::SeqCst);
        if let Err(e) = self.refresh_from(after_write).await {
            warn!(action = action.name(), "Refresh after action failed: {}", e);
        }
        Ok(())
    }

    /// Runs the poll loop until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            interval_secs = self.settings.scan_interval.as_secs(),
            "Poll loop started"
        );
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.scan_interval) => {}
                _ = self.wake.notified() => debug!("Poll loop woken early"),
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                // Failures are recorded in the status by the fetch itself.
                _ = self.refresh() => {}
            }
        }
        info!("Poll loop stopped");
    }

    /// Joins the in-flight fetch if its generation is at least `min_generation`,
    /// otherwise queues a new one behind it. At most one fetch runs at a time.
    async fn refresh_from(
        self: &Arc<Self>,
        min_generation: u64,
    ) -> Result<Arc<Published>, RefreshError> {
        let (generation, fetch) = {
            let mut slot = self.inflight.lock().await;
            match slot.as_ref() {
                Some((generation, fetch)) if *generation >= min_generation => {
                    debug!(generation, "Joining in-flight refresh");
                    (*generation, fetch.clone())
                }
                _ => {
                    let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
                    let previous = slot.as_ref().map(|(_, fetch)| fetch.clone());
                    let this = Arc::clone(self);
                    let fetch = async move {
                        if let Some(previous) = previous {
                            debug!(generation, "Waiting for the older refresh to finish");
                            let _ = previous.await;
                        }
                        this.fetch_and_publish(generation).await
                    }
                    .boxed()
                    .shared();
                    *slot = Some((generation, fetch.clone()));
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut slot = self.inflight.lock().await;
        if matches!(slot.as_ref(), Some((g, _)) if *g == generation) {
            *slot = None;
        }
        result
    }

    /// Fetches and publishes, unless a newer generation has already settled.
    async fn fetch_and_publish(&self, generation: u64) -> Result<Arc<Published>, RefreshError> {
        let fetched = self.fetch_snapshot().await;

        // Held while deciding and writing so generations settle in order.
        let mut current = self.published.write().await;
        let stale = generation < self.settled_generation.load(Ordering::SeqCst);
        if !stale {
            self.settled_generation.store(generation, Ordering::SeqCst);
        }

        match fetched {
            Ok(snapshot) => {
                let now = snapshot.fetched_at.with_timezone(&self.settings.time_zone);
                let views = build_views(&snapshot, &self.settings.monitored_users, &now);
                info!(
                    outstanding = views.counts.outstanding,
                    late = views.counts.late,
                    pool = views.counts.pool,
                    "Snapshot refreshed"
                );
                let fetched_at = snapshot.fetched_at;
                let published = Arc::new(Published { snapshot, views });
                if stale {
                    debug!(generation, "Discarding a refresh older than the published one");
                    return Ok(published);
                }

                *current = Some(Arc::clone(&published));
                *self.status.write().await = RefreshStatus {
                    available: true,
                    needs_reconfiguration: false,
                    last_success: Some(fetched_at),
                    last_error: None,
                };
                Ok(published)
            }
            Err(err) => {
                let err = RefreshError::from(err);
                if stale {
                    return Err(err);
                }
                match &err {
                    RefreshError::NeedsReconfiguration => {
                        error!("Refresh failed, credentials need reconfiguration")
                    }
                    RefreshError::Unavailable(reason) => {
                        warn!("Refresh failed, keeping the previous snapshot: {}", reason)
                    }
                }
                let mut status = self.status.write().await;
                status.available = false;
                status.needs_reconfiguration = err == RefreshError::NeedsReconfiguration;
                status.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch_snapshot(&self) -> PortResult<Snapshot> {
        debug!("Fetching data from ChoreBoard");
        let api = self.api.as_ref();
        let (outstanding, late, users, completions, chore_leaderboards, points_label) = tokio::try_join!(
            api.outstanding_chores(),
            api.late_chores(),
            api.users(),
            api.recent_completions(self.settings.completions_limit),
            api.chore_leaderboards(),
            api.points_label(),
        )?;

        let mut arcade_sessions = BTreeMap::new();
        for username in &self.settings.monitored_users {
            let Some(user) = users.iter().find(|u| &u.username == username) else {
                debug!(username = %username, "Monitored user not found, skipping arcade status");
                continue;
            };
            match api.arcade_session(user).await {
                Ok(Some(session)) => {
                    arcade_sessions.insert(username.clone(), session);
                }
                Ok(None) => {}
                Err(e) => debug!(username = %username, "Failed to fetch arcade status: {}", e),
            }
        }

        Ok(Snapshot {
            fetched_at: Utc::now(),
            chores: merge_chores(outstanding, late),
            users,
            completions,
            chore_leaderboards,
            arcade_sessions,
            points_label,
        })
    }
}
