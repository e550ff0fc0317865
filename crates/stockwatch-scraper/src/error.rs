use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response did not have the expected shape. `raw` keeps the body so
    /// it can be written out for inspection.
    #[error("malformed fulfillment data: {reason}")]
    MalformedSourceData { reason: String, raw: String },

    #[error("invalid fulfillment URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
