use super::FetchError;
use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, REFERER};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

const AJAX_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Cookie-keeping client shared by the handshake GET and the query POST.
pub struct HttpClient {
    inner: reqwest::Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // The token handed out by the landing page is tied to its session cookie
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            max_retries: config.max_retries,
        })
    }

    /// GET a page as text, retrying transport errors, 429 and 5xx.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries as usize);

        let this = self;
        let mut attempt = 0u32;
        RetryIf::spawn(
            strategy,
            move || {
                attempt += 1;
                debug!("GET {} (attempt {})", url, attempt);
                this.get_once(url)
            },
            |e: &FetchError| {
                let retry = e.is_transient();
                if retry {
                    warn!("GET {} failed, retrying: {}", url, e);
                }
                retry
            },
        )
        .await
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.inner.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }

    /// POST a scan clause the way the screener page's own XHR does.
    pub async fn post_scan(
        &self,
        url: &str,
        referer: &str,
        csrf_token: &str,
        scan_clause: &str,
    ) -> Result<String, FetchError> {
        debug!("POST {} (referer {})", url, referer);

        let resp = self
            .inner
            .post(url)
            .header("X-CSRF-TOKEN", csrf_token)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, referer)
            .header(ACCEPT, AJAX_ACCEPT)
            .form(&[("scan_clause", scan_clause)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
