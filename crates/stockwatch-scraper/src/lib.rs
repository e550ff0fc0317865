//! Fulfillment-feed fetch source for stockwatch.
//!
//! [`FulfillmentClient`] talks HTTP, [`parse_fulfillment`] turns the feed's
//! JSON into [`StoreStatus`] records, and [`FulfillmentSource`] wraps both
//! behind the core [`FetchSource`] contract.
//!
//! [`StoreStatus`]: stockwatch_core::StoreStatus
//! [`FetchSource`]: stockwatch_core::FetchSource

pub mod client;
pub mod error;
pub mod parse;
mod retry;
pub mod source;
pub mod types;

pub use client::FulfillmentClient;
pub use error::FetchError;
pub use parse::{parse_fulfillment, ParsedFeed};
pub use source::{FeedQuery, FulfillmentSource};
