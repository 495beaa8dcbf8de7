//! Collection fetcher: query model and the Reservoir `top-selling` HTTP call.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chains::Chain;

pub const TOP_SELLING_PATH: &str = "/collections/top-selling/v1";
pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_LOOKBACK_MINUTES: i64 = 1440;

/// Classification of the sale events a query counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillType {
    Mint,
    Sale,
    Any,
}

impl FillType {
    pub fn as_str(self) -> &'static str {
        match self {
            FillType::Mint => "mint",
            FillType::Sale => "sale",
            FillType::Any => "any",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "mint" => Some(FillType::Mint),
            "sale" => Some(FillType::Sale),
            "any" => Some(FillType::Any),
            _ => None,
        }
    }
}

/// Parameters of one top-selling-collections request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionsQuery {
    pub start_time: i64,
    pub fill_type: FillType,
    pub limit: u32,
    pub include_recent_sales: bool,
}

impl CollectionsQuery {
    /// Query looking back `minutes` from `now_ts_utc` (unix seconds).
    pub fn last_minutes(now_ts_utc: i64, minutes: i64, fill_type: FillType) -> Self {
        Self {
            start_time: now_ts_utc.saturating_sub(minutes.saturating_mul(60)),
            fill_type,
            limit: DEFAULT_LIMIT,
            include_recent_sales: true,
        }
    }

    /// The fixed query used at snapshot-build time: 24h lookback, sales only.
    pub fn snapshot_default() -> Self {
        Self::last_minutes(Utc::now().timestamp(), DEFAULT_LOOKBACK_MINUTES, FillType::Sale)
    }

    fn to_query_pairs(self) -> [(&'static str, String); 4] {
        [
            ("startTime", self.start_time.to_string()),
            ("fillType", self.fill_type.as_str().to_string()),
            ("limit", self.limit.to_string()),
            ("includeRecentSales", self.include_recent_sales.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// One ranked entry of the top-selling response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSellingCollection {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_contract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_sales: Vec<RecentSale>,
}

/// Wire payload of `GET {base}/collections/top-selling/v1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsResponse {
    #[serde(default)]
    pub collections: Vec<TopSellingCollection>,
}

/// The auxiliary per-collection view derived from the ranked list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOverview {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl CollectionsResponse {
    pub fn collections_overview(&self) -> Vec<CollectionOverview> {
        self.collections
            .iter()
            .map(|entry| CollectionOverview {
                id: entry.id.clone(),
                name: entry.name.clone(),
                image: entry.image.clone(),
                volume: entry.volume,
                count: entry.count,
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CollectionsResponse, FetchError>> + Send + 'a>>;

/// Seam between the sync flow and the HTTP boundary; tests substitute fakes.
pub trait CollectionsFetcher: Send + Sync + 'static {
    fn fetch_top_selling<'a>(
        &'a self,
        chain: &'a Chain,
        query: &'a CollectionsQuery,
    ) -> FetchFuture<'a>;
}

pub struct HttpCollectionsFetcher {
    client: reqwest::Client,
}

impl HttpCollectionsFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn build_request(
        &self,
        chain: &Chain,
        query: &CollectionsQuery,
    ) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .get(format!("{}{}", chain.reservoir_base_url, TOP_SELLING_PATH))
            .query(&query.to_query_pairs())
            .header("x-api-key", chain.api_key.as_str())
            .build()
    }

    async fn fetch(
        &self,
        chain: &Chain,
        query: &CollectionsQuery,
    ) -> Result<CollectionsResponse, FetchError> {
        let request = self
            .build_request(chain, query)
            .map_err(|source| FetchError::Transport {
                url: format!("{}{}", chain.reservoir_base_url, TOP_SELLING_PATH),
                source,
            })?;
        let url = request.url().to_string();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<CollectionsResponse>()
            .await
            .map_err(|source| FetchError::Decode { url, source })
    }
}

impl CollectionsFetcher for HttpCollectionsFetcher {
    fn fetch_top_selling<'a>(
        &'a self,
        chain: &'a Chain,
        query: &'a CollectionsQuery,
    ) -> FetchFuture<'a> {
        Box::pin(self.fetch(chain, query))
    }
}
