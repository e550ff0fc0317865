use std::path::PathBuf;

/// Process-wide settings, built once at startup and passed by reference into
/// the fetch source, state store and notification sink constructors.
///
/// The diff engine and alert policy never see this struct.
#[derive(Clone)]
pub struct AppConfig {
    pub fulfillment_url: String,
    pub part_numbers: Vec<String>,
    pub location: String,
    pub target_product: String,
    /// When set, only stores whose region matches (case-insensitive) are kept.
    pub region_filter: Option<String>,
    pub state_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub log_level: String,
    pub request_timeout_secs: u64,
    /// Upper bound on a whole fetch, retries included.
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub watch_interval_secs: u64,
    pub lock_stale_secs: u64,
    pub notify_enabled: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_ids: Vec<String>,
    pub telegram_api_base: String,
}

impl AppConfig {
    /// `true` when delivery is enabled and both a token and at least one
    /// recipient are configured.
    #[must_use]
    pub fn notifications_ready(&self) -> bool {
        self.notify_enabled
            && self.telegram_bot_token.is_some()
            && !self.telegram_chat_ids.is_empty()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("fulfillment_url", &self.fulfillment_url)
            .field("part_numbers", &self.part_numbers)
            .field("location", &self.location)
            .field("target_product", &self.target_product)
            .field("region_filter", &self.region_filter)
            .field("state_dir", &self.state_dir)
            .field("debug_dir", &self.debug_dir)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("watch_interval_secs", &self.watch_interval_secs)
            .field("lock_stale_secs", &self.lock_stale_secs)
            .field("notify_enabled", &self.notify_enabled)
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "[redacted]"),
            )
            .field("telegram_chat_ids", &self.telegram_chat_ids)
            .field("telegram_api_base", &self.telegram_api_base)
            .finish()
    }
}
