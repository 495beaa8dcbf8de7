//! Live refresh: a cancellable polling loop per selected chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::chains::ChainRegistry;
use crate::display::{DisplayPair, DisplayState};
use crate::fetcher::{
    CollectionOverview, CollectionsFetcher, CollectionsQuery, CollectionsResponse, FillType,
};

/// What the refresh loop is currently fetching: the chain plus the filter
/// fields the user can change. The request start time is derived from the
/// lookback at fetch time, so two requests with the same filter compare
/// equal no matter when they were made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshParams {
    pub chain_id: String,
    pub fill_type: FillType,
    pub minutes: i64,
}

impl RefreshParams {
    pub fn new(chain_id: impl Into<String>, fill_type: FillType, minutes: i64) -> Self {
        Self {
            chain_id: chain_id.into(),
            fill_type,
            minutes,
        }
    }

    fn to_query(&self, now_ts_utc: i64) -> CollectionsQuery {
        CollectionsQuery::last_minutes(now_ts_utc, self.minutes, self.fill_type)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub seed: Option<CollectionsResponse>,
}

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(300_000);

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            seed: None,
        }
    }
}

struct RefreshShared {
    latest: RwLock<Option<CollectionsResponse>>,
    validating: AtomicBool,
}

/// Continuously refreshed top-selling data for one chain.
///
/// Fetches immediately on spawn, again on every params change, and on a
/// fixed interval otherwise. A params change while a request is in flight
/// supersedes it: the stale request is dropped and its result can never
/// overwrite state belonging to the newer params. Failures keep the last
/// good value and are retried on the next tick.
///
/// The polling task is bound to this handle; dropping it aborts the task,
/// so no fetch outlives the owner.
pub struct LiveRefresh {
    shared: Arc<RefreshShared>,
    params: watch::Sender<RefreshParams>,
    task: JoinHandle<()>,
}

impl LiveRefresh {
    pub fn spawn(
        fetcher: Arc<dyn CollectionsFetcher>,
        registry: ChainRegistry,
        params: RefreshParams,
        config: RefreshConfig,
    ) -> Self {
        let shared = Arc::new(RefreshShared {
            latest: RwLock::new(config.seed),
            validating: AtomicBool::new(false),
        });
        let (params_tx, params_rx) = watch::channel(params);
        let task = tokio::spawn(run_refresh_loop(
            Arc::clone(&shared),
            fetcher,
            registry,
            params_rx,
            config.interval,
        ));
        Self {
            shared,
            params: params_tx,
            task,
        }
    }

    /// Replaces the fetch parameters. Returns true (and triggers exactly one
    /// new fetch) only when they differ from the current ones.
    pub fn set_params(&self, params: RefreshParams) -> bool {
        self.params.send_if_modified(|current| {
            if *current == params {
                false
            } else {
                *current = params;
                true
            }
        })
    }

    pub fn params(&self) -> RefreshParams {
        self.params.borrow().clone()
    }

    /// The seed value until the first completed fetch, then the last
    /// successfully fetched value.
    pub fn latest(&self) -> Option<CollectionsResponse> {
        self.shared
            .latest
            .read()
            .expect("latest lock should not be poisoned")
            .clone()
    }

    pub fn collections(&self) -> Vec<CollectionOverview> {
        self.latest()
            .map(|response| response.collections_overview())
            .unwrap_or_default()
    }

    /// True strictly while a refresh request is outstanding.
    pub fn is_validating(&self) -> bool {
        self.shared.validating.load(Ordering::SeqCst)
    }
}

impl Drop for LiveRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_refresh_loop(
    shared: Arc<RefreshShared>,
    fetcher: Arc<dyn CollectionsFetcher>,
    registry: ChainRegistry,
    mut params_rx: watch::Receiver<RefreshParams>,
    interval: Duration,
) {
    loop {
        let params = params_rx.borrow_and_update().clone();

        let Some(chain) = registry.get(&params.chain_id).cloned() else {
            warn!(chain_id = %params.chain_id, "refresh requested for unknown chain");
            shared.validating.store(false, Ordering::SeqCst);
            if params_rx.changed().await.is_err() {
                return;
            }
            continue;
        };

        let query = params.to_query(Utc::now().timestamp());
        shared.validating.store(true, Ordering::SeqCst);
        let superseded = tokio::select! {
            result = fetcher.fetch_top_selling(&chain, &query) => {
                // The params may have changed in the same poll that completed
                // the fetch; a result for the old params never lands.
                if params_rx.has_changed().unwrap_or(false) {
                    debug!(chain_id = %chain.id, "refresh result discarded; params changed during fetch");
                    true
                } else {
                    match result {
                        Ok(response) => {
                            let mut latest = shared
                                .latest
                                .write()
                                .expect("latest lock should not be poisoned");
                            *latest = Some(response);
                            debug!(chain_id = %chain.id, "refresh applied");
                        }
                        Err(err) => {
                            // Keep the previous value; the next tick retries.
                            warn!(chain_id = %chain.id, error = %err, "refresh fetch failed");
                        }
                    }
                    false
                }
            }
            changed = params_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!(chain_id = %chain.id, "in-flight refresh superseded by params change");
                true
            }
        };

        if superseded {
            // Re-issue immediately for the new params; the request window is
            // still open, so the validating flag stays up.
            continue;
        }
        shared.validating.store(false, Ordering::SeqCst);

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = params_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// One chain's refresh loop plus its reconciled display state.
pub struct LiveBoard {
    refresh: LiveRefresh,
    display: Mutex<DisplayState>,
}

impl LiveBoard {
    pub fn spawn(
        fetcher: Arc<dyn CollectionsFetcher>,
        registry: ChainRegistry,
        params: RefreshParams,
        config: RefreshConfig,
    ) -> Self {
        let seeded = config
            .seed
            .as_ref()
            .map(DisplayPair::from_response)
            .unwrap_or_default();
        Self {
            refresh: LiveRefresh::spawn(fetcher, registry, params, config),
            display: Mutex::new(DisplayState::seeded(seeded)),
        }
    }

    pub fn set_params(&self, params: RefreshParams) -> bool {
        self.refresh.set_params(params)
    }

    pub fn params(&self) -> RefreshParams {
        self.refresh.params()
    }

    /// Re-evaluates the commit rule against the refresh loop and returns the
    /// committed pair. Called on every render.
    pub fn display(&self) -> DisplayPair {
        let mut display = self
            .display
            .lock()
            .expect("display lock should not be poisoned");
        if let Some(latest) = self.refresh.latest() {
            let pending = DisplayPair::from_response(&latest);
            display.observe(&pending, self.refresh.is_validating());
        }
        display.committed().clone()
    }
}
