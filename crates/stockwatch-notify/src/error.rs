use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Transport failure. The request URL is stripped so the bot token never
    /// reaches logs.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram rejected the request (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("notifications are not configured: {0}")]
    NotConfigured(String),
}
