use crate::app_config::AppConfig;
use crate::ConfigError;

const DEFAULT_FULFILLMENT_URL: &str = "https://www.apple.com/shop/fulfillment-messages";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let non_empty = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(raw.trim().to_string())
    };

    let part_numbers = split_list(&require("STOCKWATCH_PART_NUMBERS")?);
    if part_numbers.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKWATCH_PART_NUMBERS".to_string(),
            reason: "expected at least one part number".to_string(),
        });
    }

    let fulfillment_url = non_empty("STOCKWATCH_FULFILLMENT_URL", DEFAULT_FULFILLMENT_URL)?;
    let location = non_empty("STOCKWATCH_LOCATION", "Miami, FL")?;
    let target_product = non_empty("STOCKWATCH_TARGET_PRODUCT", "iPhone 17")?;
    let region_filter = lookup("STOCKWATCH_REGION_FILTER")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let state_dir = PathBuf::from(or_default("STOCKWATCH_STATE_DIR", "cache"));
    let debug_dir = PathBuf::from(or_default("STOCKWATCH_DEBUG_DIR", "debug"));
    let log_level = or_default("STOCKWATCH_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("STOCKWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let fetch_timeout_secs = parse_u64("STOCKWATCH_FETCH_TIMEOUT_SECS", "90")?;
    let user_agent = or_default("STOCKWATCH_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("STOCKWATCH_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("STOCKWATCH_RETRY_BACKOFF_BASE_MS", "1000")?;
    let watch_interval_secs = parse_u64("STOCKWATCH_WATCH_INTERVAL_SECS", "300")?;
    let lock_stale_secs = parse_u64("STOCKWATCH_LOCK_STALE_SECS", "3600")?;

    if watch_interval_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKWATCH_WATCH_INTERVAL_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let notify_enabled = parse_bool(
        "STOCKWATCH_NOTIFY_ENABLED",
        &or_default("STOCKWATCH_NOTIFY_ENABLED", "true"),
    )?;
    let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let telegram_chat_ids = lookup("TELEGRAM_CHAT_ID")
        .map(|raw| split_list(&raw))
        .unwrap_or_default();
    let telegram_api_base = or_default("TELEGRAM_API_BASE", "https://api.telegram.org");

    Ok(AppConfig {
        fulfillment_url,
        part_numbers,
        location,
        target_product,
        region_filter,
        state_dir,
        debug_dir,
        log_level,
        request_timeout_secs,
        fetch_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        watch_interval_secs,
        lock_stale_secs,
        notify_enabled,
        telegram_bot_token,
        telegram_chat_ids,
        telegram_api_base,
    })
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
