//! Notification sinks for stockwatch.
//!
//! [`TelegramSink`] delivers rendered messages through the Telegram Bot API;
//! [`NoopSink`] stands in when delivery is disabled.

pub mod error;
mod noop;
pub mod telegram;

pub use error::DeliveryError;
pub use noop::NoopSink;
pub use telegram::TelegramSink;
