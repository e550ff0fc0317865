//! HTTP client for the retailer's `fulfillment-messages` endpoint.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::FetchError;
use crate::retry::retry_with_backoff;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for the pickup-availability feed.
///
/// Non-2xx responses surface as [`FetchError::UnexpectedStatus`]. Transient
/// errors (timeouts, connect failures, 5xx, 429) are retried with
/// exponential back-off up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct FulfillmentClient {
    client: Client,
    base_url: Url,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    backoff_base_ms: u64,
}

impl FulfillmentClient {
    /// Creates a client with the configured timeout, `User-Agent` and retry
    /// policy. Set `max_retries` to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `fulfillment_url` is not an
    /// absolute http(s) URL, or [`FetchError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        fulfillment_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(fulfillment_url).map_err(|e| FetchError::InvalidUrl {
            url: fulfillment_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: fulfillment_url.to_owned(),
                reason: format!("unsupported scheme {}", base_url.scheme()),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds the feed URL:
    /// `{base}?pl=true&mts.0=regular&mts.1=compact&parts.N={part}&location={location}`.
    #[must_use]
    pub fn request_url(&self, part_numbers: &[String], location: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("pl", "true")
                .append_pair("mts.0", "regular")
                .append_pair("mts.1", "compact");
            for (i, part) in part_numbers.iter().enumerate() {
                query.append_pair(&format!("parts.{i}"), part);
            }
            query.append_pair("location", location);
        }
        url
    }

    /// Fetches the raw feed body for `part_numbers` near `location`, with
    /// automatic retry on transient errors.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnexpectedStatus`]: non-2xx after retries (4xx other than 429 is not retried).
    /// - [`FetchError::Http`]: network or TLS failure after retries.
    pub async fn fetch_raw(
        &self,
        part_numbers: &[String],
        location: &str,
    ) -> Result<String, FetchError> {
        let url = self.request_url(part_numbers, location);

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json")
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                tracing::debug!(url = %url, bytes = body.len(), "fulfillment feed fetched");
                Ok(body)
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> FulfillmentClient {
        FulfillmentClient::new(url, 5, "stockwatch-test/0.1", 0, 0).unwrap()
    }

    #[test]
    fn request_url_lists_parts_and_location() {
        let c = client("https://www.apple.com/shop/fulfillment-messages");
        let url = c.request_url(
            &["MG8H4LL/A".to_owned(), "MG8J4LL/A".to_owned()],
            "Miami, FL",
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("pl".to_owned(), "true".to_owned()),
                ("mts.0".to_owned(), "regular".to_owned()),
                ("mts.1".to_owned(), "compact".to_owned()),
                ("parts.0".to_owned(), "MG8H4LL/A".to_owned()),
                ("parts.1".to_owned(), "MG8J4LL/A".to_owned()),
                ("location".to_owned(), "Miami, FL".to_owned()),
            ]
        );
        assert_eq!(url.path(), "/shop/fulfillment-messages");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = FulfillmentClient::new("not a url", 5, "ua", 0, 0).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = FulfillmentClient::new("ftp://feed.test/x", 5, "ua", 0, 0).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
