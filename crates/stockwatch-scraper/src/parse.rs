//! Tolerant parsing of the fulfillment feed into [`StoreStatus`] records.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use stockwatch_core::StoreStatus;

use crate::error::FetchError;
use crate::types::FeedStore;

const STORES_POINTER: &str = "/body/content/pickupMessage/stores";
const NOT_AVAILABLE: &str = "Not Available";

/// Stores extracted from one feed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    /// First product title the feed reported, if any.
    pub product_title: Option<String>,
    pub stores: Vec<StoreStatus>,
}

/// Parse a raw feed body.
///
/// The envelope must contain `body.content.pickupMessage.stores` as an array.
/// Individual store records are handled leniently: records that fail to
/// deserialize or lack a `storeNumber` are skipped, and repeated store
/// numbers keep their first occurrence. When a store lists several parts the
/// lowest part number decides availability.
///
/// With `region_filter` set, only stores whose `state` matches it
/// (case-insensitive) are kept.
///
/// # Errors
///
/// Returns [`FetchError::MalformedSourceData`] if the body is not JSON, the
/// stores array is missing, or the array is non-empty but not one record in
/// it carries a usable `storeNumber`.
pub fn parse_fulfillment(raw: &str, region_filter: Option<&str>) -> Result<ParsedFeed, FetchError> {
    let malformed = |reason: String| FetchError::MalformedSourceData {
        reason,
        raw: raw.to_owned(),
    };

    let value: Value =
        serde_json::from_str(raw).map_err(|e| malformed(format!("body is not JSON: {e}")))?;
    let records = value
        .pointer(STORES_POINTER)
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing body.content.pickupMessage.stores array".to_owned()))?;

    let mut product_title = None;
    let mut seen = HashSet::new();
    let mut identified = 0usize;
    let mut stores = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let feed_store = match FeedStore::deserialize(record) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping unreadable store record");
                continue;
            }
        };

        let Some(store_id) = feed_store
            .store_number
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
        else {
            tracing::warn!(index, "skipping store record without storeNumber");
            continue;
        };
        identified += 1;

        if let Some(filter) = region_filter {
            let region = feed_store.state.as_deref().unwrap_or_default().trim();
            if !region.eq_ignore_ascii_case(filter.trim()) {
                continue;
            }
        }

        if !seen.insert(store_id.clone()) {
            tracing::warn!(store_id = %store_id, "skipping duplicate store record");
            continue;
        }

        let deciding_part = feed_store.parts_availability.values().next();
        if product_title.is_none() {
            product_title = deciding_part
                .and_then(|p| p.product_title())
                .map(str::to_owned);
        }

        let status = StoreStatus {
            display_name: feed_store
                .store_name
                .unwrap_or_else(|| store_id.clone()),
            store_id,
            city: feed_store.city.unwrap_or_default(),
            region: feed_store.state.unwrap_or_default(),
            available: deciding_part.is_some_and(|p| p.is_available()),
            availability_note: deciding_part
                .and_then(|p| p.quote())
                .unwrap_or(NOT_AVAILABLE)
                .to_owned(),
        };
        tracing::debug!(
            store_id = %status.store_id,
            available = status.available,
            note = %status.availability_note,
            "parsed store"
        );
        stores.push(status);
    }

    if identified == 0 && !records.is_empty() {
        return Err(malformed(format!(
            "none of {} store records had a usable storeNumber",
            records.len()
        )));
    }

    Ok(ParsedFeed {
        product_title,
        stores,
    })
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
