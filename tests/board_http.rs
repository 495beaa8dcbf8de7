use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use topsell::{
    board_router, BoardState, Chain, ChainRegistry, CollectionsFetcher, CollectionsQuery,
    CollectionsResponse, FetchError, FetchFuture, TopSellingCollection,
};
use tower::util::ServiceExt;

struct CountingFetcher {
    failing_chains: Vec<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    fn new(failing_chains: &[&str]) -> Self {
        Self {
            failing_chains: failing_chains.iter().map(|id| id.to_string()).collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls_for(&self, chain_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(chain_id)
            .copied()
            .unwrap_or(0)
    }
}

impl CollectionsFetcher for CountingFetcher {
    fn fetch_top_selling<'a>(
        &'a self,
        chain: &'a Chain,
        _query: &'a CollectionsQuery,
    ) -> FetchFuture<'a> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(chain.id.clone())
            .or_insert(0) += 1;
        let fail = self.failing_chains.contains(&chain.id);
        let chain_id = chain.id.clone();
        Box::pin(async move {
            if fail {
                Err(FetchError::Status {
                    url: format!("test://{chain_id}"),
                    status: 500,
                })
            } else {
                Ok(CollectionsResponse {
                    collections: vec![TopSellingCollection {
                        id: format!("collection-{chain_id}"),
                        name: Some(format!("Collection on {chain_id}")),
                        image: None,
                        primary_contract: None,
                        volume: Some(9.5),
                        count: Some(3),
                        recent_sales: Vec::new(),
                    }],
                })
            }
        })
    }
}

fn registry() -> ChainRegistry {
    ChainRegistry::new(vec![
        Chain {
            id: "1".to_string(),
            name: "Ethereum".to_string(),
            reservoir_base_url: "https://1.example".to_string(),
            api_key: String::new(),
        },
        Chain {
            id: "137".to_string(),
            name: "Polygon".to_string(),
            reservoir_base_url: "https://137.example".to_string(),
            api_key: String::new(),
        },
    ])
    .unwrap()
}

fn state_with(fetcher: Arc<CountingFetcher>) -> Arc<BoardState> {
    Arc::new(BoardState::new(
        registry(),
        fetcher,
        Duration::from_secs(5),
        Duration::from_secs(3600),
    ))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn board_page_renders_collections_filters_and_footer() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let app = board_router(state_with(fetcher));

    let (status, text) = get(app, "/1").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("Top Selling Collections"));
    assert!(text.contains("Collection on 1"));
    assert!(text.contains("fillType=mint"));
    assert!(text.contains("minutes=1440"));
    assert!(text.contains("https://knny.io"));
    assert!(text.contains("https://twitter.com/0xknny"));
}

#[tokio::test]
async fn unknown_chain_returns_not_found() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let app = board_router(state_with(fetcher));

    let (status, _) = get(app, "/424242").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_redirects_to_default_chain() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let app = board_router(state_with(fetcher));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()["location"], "/1");
}

#[tokio::test]
async fn snapshot_endpoint_returns_the_committed_pair_as_json() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let app = board_router(state_with(fetcher));

    let (status, text) = get(app, "/1/snapshot").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let top_selling = json["topSelling"].as_array().unwrap();
    let collections = json["collections"].as_array().unwrap();
    assert_eq!(top_selling.len(), collections.len());
    assert_eq!(top_selling[0]["id"], "collection-1");
    assert_eq!(collections[0]["id"], "collection-1");
}

#[tokio::test]
async fn cached_snapshot_is_reused_within_the_revalidation_period() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let state = state_with(Arc::clone(&fetcher));

    let (status, _) = get(board_router(Arc::clone(&state)), "/1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(board_router(Arc::clone(&state)), "/1").await;
    assert_eq!(status, StatusCode::OK);

    // Chain 137 is only ever fetched by snapshot builds; a second build
    // within the 5s period would double this count.
    assert_eq!(fetcher.calls_for("137"), 1);
}

#[tokio::test]
async fn unchanged_filter_across_requests_does_not_refetch() {
    let fetcher = Arc::new(CountingFetcher::new(&[]));
    let state = state_with(Arc::clone(&fetcher));

    let (status, _) = get(
        board_router(Arc::clone(&state)),
        "/1?fillType=sale&minutes=1440",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Cross a wall-clock second so a start time re-derived per request
    // would differ, and let the spawned refresh settle.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let calls_after_first = fetcher.calls_for("1");

    let (status, _) = get(
        board_router(Arc::clone(&state)),
        "/1?fillType=sale&minutes=1440",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.calls_for("1"), calls_after_first);

    // A different lookback is a real change: exactly one new fetch.
    let (status, _) = get(
        board_router(Arc::clone(&state)),
        "/1?fillType=sale&minutes=60",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.calls_for("1"), calls_after_first + 1);
}

#[tokio::test]
async fn failed_chain_degrades_to_an_empty_board_not_an_error() {
    let fetcher = Arc::new(CountingFetcher::new(&["137"]));
    let state = state_with(fetcher);

    let (status, text) = get(board_router(Arc::clone(&state)), "/137").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("No collection data yet"));

    let (status, text) = get(board_router(state), "/137/snapshot").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["topSelling"].as_array().unwrap().len(), 0);
    assert_eq!(json["collections"].as_array().unwrap().len(), 0);
}
