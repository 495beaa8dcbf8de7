//! Board HTTP surface: per-chain page and snapshot routes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::chains::{Chain, ChainRegistry};
use crate::display::DisplayPair;
use crate::fetcher::{CollectionsFetcher, FillType, DEFAULT_LOOKBACK_MINUTES};
use crate::footer::render_footer;
use crate::refresh::{LiveBoard, RefreshConfig, RefreshParams};
use crate::snapshot::SnapshotCache;

pub struct BoardState {
    cache: SnapshotCache,
    fetcher: Arc<dyn CollectionsFetcher>,
    refresh_interval: Duration,
    boards: Mutex<HashMap<String, Arc<LiveBoard>>>,
}

impl BoardState {
    pub fn new(
        registry: ChainRegistry,
        fetcher: Arc<dyn CollectionsFetcher>,
        revalidate: Duration,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            cache: SnapshotCache::new(registry, Arc::clone(&fetcher), revalidate),
            fetcher,
            refresh_interval,
            boards: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.cache.registry()
    }

    /// The chain's live board, created on first use and seeded from the
    /// static snapshot. Subsequent calls push the params into the existing
    /// board (a no-op when they are unchanged).
    async fn board_for(&self, chain: &Chain, params: RefreshParams) -> Arc<LiveBoard> {
        let snapshot = self.cache.current().await;
        let mut boards = self
            .boards
            .lock()
            .expect("boards lock should not be poisoned");
        if let Some(board) = boards.get(&chain.id) {
            board.set_params(params);
            return Arc::clone(board);
        }

        let board = Arc::new(LiveBoard::spawn(
            Arc::clone(&self.fetcher),
            self.registry().clone(),
            params,
            RefreshConfig {
                interval: self.refresh_interval,
                seed: snapshot.get(&chain.id).cloned(),
            },
        ));
        boards.insert(chain.id.clone(), Arc::clone(&board));
        board
    }
}

pub fn board_router(state: Arc<BoardState>) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/{chain}", get(get_board_page))
        .route("/{chain}/snapshot", get(get_board_snapshot))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(rename = "fillType")]
    pub fill_type: Option<String>,
    pub minutes: Option<i64>,
}

impl BoardQuery {
    fn fill_type(&self) -> FillType {
        self.fill_type
            .as_deref()
            .and_then(FillType::parse)
            .unwrap_or(FillType::Sale)
    }

    fn minutes(&self) -> i64 {
        match self.minutes {
            Some(minutes) if minutes > 0 => minutes,
            _ => DEFAULT_LOOKBACK_MINUTES,
        }
    }
}

async fn get_root(State(state): State<Arc<BoardState>>) -> Redirect {
    let chain_id = state.registry().default_chain().id.clone();
    Redirect::temporary(&format!("/{chain_id}"))
}

async fn get_board_page(
    State(state): State<Arc<BoardState>>,
    Path(chain_id): Path<String>,
    Query(query): Query<BoardQuery>,
) -> impl IntoResponse {
    let Some(chain) = state.registry().get(&chain_id).cloned() else {
        return (StatusCode::NOT_FOUND, "unknown chain").into_response();
    };

    let pair = resolve_display(&state, &chain, &query).await;
    Html(render_board_html(
        &chain,
        state.registry(),
        &pair,
        query.fill_type(),
        query.minutes(),
    ))
    .into_response()
}

async fn get_board_snapshot(
    State(state): State<Arc<BoardState>>,
    Path(chain_id): Path<String>,
    Query(query): Query<BoardQuery>,
) -> impl IntoResponse {
    let Some(chain) = state.registry().get(&chain_id).cloned() else {
        return (StatusCode::NOT_FOUND, "unknown chain").into_response();
    };

    let pair = resolve_display(&state, &chain, &query).await;
    Json(pair).into_response()
}

async fn resolve_display(state: &BoardState, chain: &Chain, query: &BoardQuery) -> DisplayPair {
    let params = RefreshParams::new(chain.id.clone(), query.fill_type(), query.minutes());
    let board = state.board_for(chain, params).await;
    board.display()
}

pub fn render_board_html(
    chain: &Chain,
    registry: &ChainRegistry,
    pair: &DisplayPair,
    fill_type: FillType,
    minutes: i64,
) -> String {
    let now_utc = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!(
        "<title>Top Selling Collections - {}</title>\n",
        escape_html(&chain.name)
    ));
    out.push_str("<style>:root{--bg:#0d1117;--card:#161b22;--ink:#e6edf3;--muted:#8b949e;--line:#30363d;--accent:#58a6ff}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Segoe UI\",\"Helvetica Neue\",sans-serif;background:var(--bg);min-height:100vh}.shell{max-width:1100px;margin:0 auto;padding:24px 18px}.hero{display:flex;justify-content:space-between;align-items:baseline;flex-wrap:wrap;gap:8px}.hero h1{margin:0;font-size:1.5rem}.hero-meta{color:var(--muted);font-size:.88rem}.filters{display:flex;gap:8px;margin:14px 0;flex-wrap:wrap}.filter{color:var(--muted);text-decoration:none;border:1px solid var(--line);border-radius:8px;padding:5px 10px;font-size:.82rem}.filter.active{color:var(--ink);border-color:var(--accent)}.card{background:var(--card);border:1px solid var(--line);border-radius:12px;overflow:hidden}table{width:100%;border-collapse:collapse}thead th{text-align:left;color:var(--muted);font-size:.76rem;text-transform:uppercase;letter-spacing:.05em;padding:10px 12px;border-bottom:1px solid var(--line)}tbody td{padding:10px 12px;border-bottom:1px solid var(--line);font-size:.88rem}tbody tr:last-child td{border-bottom:none}.empty{padding:28px;color:var(--muted);text-align:center}.footer{display:flex;justify-content:space-between;align-items:flex-start;gap:36px;border-top:1px solid var(--line);margin-top:28px;padding-top:20px;flex-wrap:wrap}.footer-links,.footer-social{display:flex;flex-direction:column;gap:10px}.footer-title{color:var(--muted);font-size:.8rem;text-transform:uppercase;letter-spacing:.05em}.footer-link{color:var(--ink);text-decoration:none;font-size:.88rem}.social-btn{display:inline-flex;align-items:center;justify-content:center;width:30px;height:30px;border:1px solid var(--line);border-radius:8px;color:var(--ink);text-decoration:none}</style>\n");
    out.push_str("</head><body><main class=\"shell\">\n");

    out.push_str("<section class=\"hero\"><h1>Top Selling Collections</h1>");
    out.push_str("<span class=\"hero-meta\">");
    out.push_str(&escape_html(&chain.name));
    out.push_str(&format!(" &middot; rendered {}", escape_html(&now_utc)));
    out.push_str("</span></section>\n");

    render_filters(&mut out, chain, registry, fill_type, minutes);

    out.push_str("<section class=\"card\">");
    if pair.top_selling.is_empty() {
        out.push_str("<div class=\"empty\">No collection data yet for this chain.</div>");
    } else {
        out.push_str("<table><thead><tr><th>#</th><th>Collection</th><th>Volume</th><th>Sales</th><th>Latest Sale</th></tr></thead><tbody>\n");
        for (idx, entry) in pair.top_selling.iter().enumerate() {
            out.push_str("<tr><td>");
            out.push_str(&(idx + 1).to_string());
            out.push_str("</td><td>");
            out.push_str(&escape_html(entry.name.as_deref().unwrap_or(&entry.id)));
            out.push_str("</td><td>");
            out.push_str(&format_amount(entry.volume));
            out.push_str("</td><td>");
            out.push_str(
                &entry
                    .count
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
            out.push_str("</td><td>");
            let latest_sale = entry
                .recent_sales
                .first()
                .and_then(|sale| sale.price)
                .map(|price| format!("{price:.4}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&escape_html(&latest_sale));
            out.push_str("</td></tr>\n");
        }
        out.push_str("</tbody></table>");
    }
    out.push_str("</section>\n");

    render_footer(&mut out);
    out.push_str("</main></body></html>\n");
    out
}

fn render_filters(
    out: &mut String,
    chain: &Chain,
    registry: &ChainRegistry,
    fill_type: FillType,
    minutes: i64,
) {
    out.push_str("<nav class=\"filters\">");
    for candidate in [FillType::Sale, FillType::Mint, FillType::Any] {
        let class = if candidate == fill_type {
            "filter active"
        } else {
            "filter"
        };
        out.push_str(&format!(
            "<a class=\"{class}\" href=\"/{}?fillType={}&minutes={minutes}\">{}</a>",
            chain.id,
            candidate.as_str(),
            candidate.as_str()
        ));
    }
    for (label, window) in [("1h", 60), ("6h", 360), ("24h", 1440), ("7d", 10_080)] {
        let class = if window == minutes {
            "filter active"
        } else {
            "filter"
        };
        out.push_str(&format!(
            "<a class=\"{class}\" href=\"/{}?fillType={}&minutes={window}\">{label}</a>",
            chain.id,
            fill_type.as_str()
        ));
    }
    for other in registry.chains() {
        let class = if other.id == chain.id {
            "filter active"
        } else {
            "filter"
        };
        out.push_str(&format!(
            "<a class=\"{class}\" href=\"/{}?fillType={}&minutes={minutes}\">{}</a>",
            other.id,
            fill_type.as_str(),
            escape_html(&other.name)
        ));
    }
    out.push_str("</nav>\n");
}

fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => "-".to_string(),
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{CollectionsResponse, TopSellingCollection};

    fn chain() -> Chain {
        Chain {
            id: "1".to_string(),
            name: "Ethereum".to_string(),
            reservoir_base_url: "https://1.example".to_string(),
            api_key: String::new(),
        }
    }

    fn registry() -> ChainRegistry {
        ChainRegistry::new(vec![chain()]).unwrap()
    }

    #[test]
    fn board_query_defaults_and_parsing() {
        let query = BoardQuery::default();
        assert_eq!(query.fill_type(), FillType::Sale);
        assert_eq!(query.minutes(), 1440);

        let query = BoardQuery {
            fill_type: Some("mint".to_string()),
            minutes: Some(60),
        };
        assert_eq!(query.fill_type(), FillType::Mint);
        assert_eq!(query.minutes(), 60);

        let query = BoardQuery {
            fill_type: Some("bogus".to_string()),
            minutes: Some(-5),
        };
        assert_eq!(query.fill_type(), FillType::Sale);
        assert_eq!(query.minutes(), 1440);
    }

    #[test]
    fn rendered_page_contains_table_rows_and_footer() {
        let response = CollectionsResponse {
            collections: vec![TopSellingCollection {
                id: "0xabc".to_string(),
                name: Some("Cool <Cats>".to_string()),
                image: None,
                primary_contract: None,
                volume: Some(12.5),
                count: Some(42),
                recent_sales: Vec::new(),
            }],
        };
        let pair = DisplayPair::from_response(&response);

        let html = render_board_html(&chain(), &registry(), &pair, FillType::Sale, 1440);
        assert!(html.contains("<table>"));
        assert!(html.contains("Cool &lt;Cats&gt;"));
        assert!(html.contains("12.50"));
        assert!(html.contains("42"));
        assert!(html.contains("fillType=mint"));
        assert!(html.contains("minutes=60"));
        assert!(html.contains("https://knny.io"));
    }

    #[test]
    fn empty_pair_renders_placeholder_instead_of_table() {
        let html = render_board_html(
            &chain(),
            &registry(),
            &DisplayPair::default(),
            FillType::Sale,
            1440,
        );
        assert!(html.contains("No collection data yet"));
        assert!(!html.contains("<table>"));
    }
}
