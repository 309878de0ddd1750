pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::{placeholder_set, StockRecord};
use crate::registry::{ScreenerDefinition, ScreenerQuery};
use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use self::cleaner::{clean_screener_rows, pre_rank};
use self::http_client::HttpClient;
use self::parsers::{extract_csrf_token, parse_screener_body};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a screener produced no rows. Never leaves this module: `fetch`
/// collapses every variant into the placeholder row and logs it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("csrf-token not found on {url}")]
    MissingToken { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unparseable screener response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable screener backend. Implementations must not fail: every problem
/// becomes the placeholder record set.
#[async_trait]
pub trait ScreenerSource: Send + Sync {
    async fn fetch(&self, screener: &ScreenerDefinition) -> Vec<StockRecord>;
}

// ── Chartink scraper ──────────────────────────────────────────────────────────

pub struct ChartinkScraper {
    client: HttpClient,
    process_url: String,
}

impl ChartinkScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let base = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid scraper base_url {:?}", config.base_url))?;
        let process_url = base
            .join("screener/process")
            .context("Failed to build processing endpoint URL")?;

        Ok(Self {
            client: HttpClient::new(config)?,
            process_url: process_url.to_string(),
        })
    }

    /// Handshake + query. Returns the normalised rows before ranking.
    async fn run_scan(&self, endpoint: &str, scan_clause: &str) -> Result<Vec<StockRecord>, FetchError> {
        let landing = self.client.get_text(endpoint).await?;

        let token = extract_csrf_token(&landing).ok_or_else(|| FetchError::MissingToken {
            url: endpoint.to_string(),
        })?;
        debug!("csrf-token acquired from {}", endpoint);

        let body = self
            .client
            .post_scan(&self.process_url, endpoint, &token, scan_clause)
            .await?;

        let resp = parse_screener_body(&body)?;
        debug!("{} raw rows from {}", resp.data.len(), self.process_url);

        Ok(clean_screener_rows(&resp.data))
    }
}

#[async_trait]
impl ScreenerSource for ChartinkScraper {
    async fn fetch(&self, screener: &ScreenerDefinition) -> Vec<StockRecord> {
        let (endpoint, scan_clause) = match &screener.query {
            ScreenerQuery::Configured { endpoint, scan_clause } => (endpoint, scan_clause),
            ScreenerQuery::Unconfigured { endpoint } => {
                info!("{}: no scan clause configured for {}, storing placeholder", screener.id, endpoint);
                return placeholder_set();
            }
        };

        info!("Fetching screener {}", screener.id);

        match self.run_scan(endpoint, scan_clause).await {
            Ok(records) => {
                let total = records.len();
                let ranked = pre_rank(records);
                if ranked.first().is_some_and(StockRecord::is_placeholder) {
                    info!("{}: {} rows, none with change >= 2, storing placeholder", screener.id, total);
                } else {
                    info!("{}: kept {} of {} rows", screener.id, ranked.len(), total);
                }
                ranked
            }
            Err(e) => {
                warn!("{}: fetch failed, storing placeholder: {}", screener.id, e);
                placeholder_set()
            }
        }
    }
}
