//! Top-selling-collections board core.
//!
//! Aggregates per-chain collection statistics from Reservoir-compatible
//! APIs: a periodically revalidated static snapshot seeds per-chain live
//! refresh loops, whose results are committed into display state without
//! flicker and served as an HTML board.

mod board;
mod chains;
mod display;
mod fetcher;
mod footer;
mod observability;
mod refresh;
mod snapshot;

pub use board::{board_router, render_board_html, BoardQuery, BoardState};
pub use chains::{Chain, ChainConfigError, ChainRegistry};
pub use display::{DisplayPair, DisplayState};
pub use fetcher::{
    CollectionOverview, CollectionsFetcher, CollectionsQuery, CollectionsResponse, FetchError,
    FetchFuture, FillType, HttpCollectionsFetcher, RecentSale, TopSellingCollection,
    DEFAULT_LIMIT, DEFAULT_LOOKBACK_MINUTES, TOP_SELLING_PATH,
};
pub use footer::{render_footer, FooterLink, DEVELOPER_LINKS, SOCIAL_LINK};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_registry_loaded, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use refresh::{
    LiveBoard, LiveRefresh, RefreshConfig, RefreshParams, DEFAULT_REFRESH_INTERVAL,
};
pub use snapshot::{build_snapshot, SnapshotCache, SnapshotMap, DEFAULT_REVALIDATE};
