//! [`FetchSource`] implementation over the fulfillment feed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use stockwatch_core::{AppConfig, FetchSource, Snapshot};

use crate::client::FulfillmentClient;
use crate::error::FetchError;
use crate::parse::{parse_fulfillment, ParsedFeed};

/// What to ask the feed for.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub part_numbers: Vec<String>,
    pub location: String,
    /// Label used when the feed does not report a product title.
    pub target_product: String,
    pub region_filter: Option<String>,
}

/// Fetches and parses the feed, turning every error into a failure snapshot.
#[derive(Debug, Clone)]
pub struct FulfillmentSource {
    client: FulfillmentClient,
    query: FeedQuery,
    fetch_timeout: Duration,
    debug_dir: Option<PathBuf>,
}

impl FulfillmentSource {
    /// Default bound on one whole fetch, retries included.
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(90);

    #[must_use]
    pub fn new(client: FulfillmentClient, query: FeedQuery) -> Self {
        Self {
            client,
            query,
            fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
            debug_dir: None,
        }
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Directory that receives raw bodies of malformed responses.
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Builds the client and source from application config.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let client = FulfillmentClient::new(
            &config.fulfillment_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )?;
        let query = FeedQuery {
            part_numbers: config.part_numbers.clone(),
            location: config.location.clone(),
            target_product: config.target_product.clone(),
            region_filter: config.region_filter.clone(),
        };
        Ok(Self::new(client, query)
            .with_fetch_timeout(Duration::from_secs(config.fetch_timeout_secs))
            .with_debug_dir(&config.debug_dir))
    }

    async fn try_fetch(&self) -> Result<ParsedFeed, FetchError> {
        let raw = self
            .client
            .fetch_raw(&self.query.part_numbers, &self.query.location)
            .await?;
        parse_fulfillment(&raw, self.query.region_filter.as_deref())
    }

    /// Writes a malformed body to `{debug_dir}/malformed-{timestamp}.json`.
    async fn dump_raw(dir: &Path, raw: &str) -> Result<PathBuf, std::io::Error> {
        tokio::fs::create_dir_all(dir).await?;
        let name = format!("malformed-{}.json", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let path = dir.join(name);
        tokio::fs::write(&path, raw).await?;
        Ok(path)
    }

    async fn failure_reason(&self, err: FetchError) -> String {
        let (reason, raw) = match err {
            FetchError::MalformedSourceData { reason, raw } => (reason, raw),
            other => return other.to_string(),
        };
        let base = format!("malformed fulfillment data: {reason}");
        let Some(dir) = &self.debug_dir else {
            return base;
        };
        match Self::dump_raw(dir, &raw).await {
            Ok(path) => {
                tracing::warn!(path = %path.display(), "saved malformed feed body");
                format!("{base} (raw response saved to {})", path.display())
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not save malformed feed body");
                base
            }
        }
    }
}

#[async_trait]
impl FetchSource for FulfillmentSource {
    async fn fetch(&self) -> Snapshot {
        tracing::info!(
            parts = ?self.query.part_numbers,
            location = %self.query.location,
            "fetching availability"
        );

        let outcome = match tokio::time::timeout(self.fetch_timeout, self.try_fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                after: self.fetch_timeout,
            }),
        };

        match outcome {
            Ok(feed) => {
                let label = feed
                    .product_title
                    .unwrap_or_else(|| self.query.target_product.clone());
                let snapshot = Snapshot::success(Utc::now(), label, feed.stores);
                tracing::info!(
                    stores = snapshot.stores().len(),
                    available = snapshot.available_count(),
                    "availability fetched"
                );
                snapshot
            }
            Err(err) => {
                let reason = self.failure_reason(err).await;
                tracing::error!(reason = %reason, "availability fetch failed");
                Snapshot::failure(Utc::now(), self.query.target_product.clone(), reason)
            }
        }
    }
}
