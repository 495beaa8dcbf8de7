//! Static snapshot: one concurrent fetch per chain, cached behind a
//! revalidation period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::chains::ChainRegistry;
use crate::fetcher::{CollectionsFetcher, CollectionsQuery, CollectionsResponse};

/// Per-chain snapshot data keyed by chain id. Chains whose fetch failed are
/// simply absent.
pub type SnapshotMap = HashMap<String, CollectionsResponse>;

pub const DEFAULT_REVALIDATE: Duration = Duration::from_secs(5);

/// Fans the fetcher out across every chain and collects the successes.
///
/// All fetches run as independent tasks and every outcome is observed; a
/// failing chain never aborts or omits the others.
pub async fn build_snapshot(
    registry: &ChainRegistry,
    query: CollectionsQuery,
    fetcher: Arc<dyn CollectionsFetcher>,
) -> SnapshotMap {
    let mut tasks = JoinSet::new();
    for chain in registry.chains() {
        let chain = chain.clone();
        let fetcher = Arc::clone(&fetcher);
        tasks.spawn(async move {
            let result = fetcher.fetch_top_selling(&chain, &query).await;
            (chain.id, result)
        });
    }

    let mut snapshot = SnapshotMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((chain_id, Ok(response))) => {
                snapshot.insert(chain_id, response);
            }
            Ok((chain_id, Err(err))) => {
                warn!(chain_id, error = %err, "snapshot fetch failed; chain omitted");
            }
            Err(err) => {
                warn!(error = %err, "snapshot fetch task failed to join");
            }
        }
    }

    info!(
        chains = registry.chains().len(),
        fetched = snapshot.len(),
        "snapshot built"
    );
    snapshot
}

struct CachedSnapshot {
    built_at: Instant,
    map: Arc<SnapshotMap>,
}

/// Serves the latest snapshot, rebuilding it at most once per revalidation
/// period. Requests arriving before the first build (or concurrently with a
/// rebuild) wait for the in-flight build rather than racing their own.
pub struct SnapshotCache {
    registry: ChainRegistry,
    fetcher: Arc<dyn CollectionsFetcher>,
    revalidate: Duration,
    cached: Mutex<Option<CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(
        registry: ChainRegistry,
        fetcher: Arc<dyn CollectionsFetcher>,
        revalidate: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            revalidate,
            cached: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub async fn current(&self) -> Arc<SnapshotMap> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.built_at.elapsed() < self.revalidate {
                return Arc::clone(&entry.map);
            }
        }

        let map = Arc::new(
            build_snapshot(
                &self.registry,
                CollectionsQuery::snapshot_default(),
                Arc::clone(&self.fetcher),
            )
            .await,
        );
        *cached = Some(CachedSnapshot {
            built_at: Instant::now(),
            map: Arc::clone(&map),
        });
        map
    }
}
