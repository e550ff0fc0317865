//! Response types for the retailer's `fulfillment-messages` endpoint.
//!
//! ## Observed shape
//!
//! ```text
//! body.content.pickupMessage.stores[]
//!   storeNumber      "R623"
//!   storeName        "Aventura"
//!   city, state      "Aventura", "FL"
//!   partsAvailability
//!     "<part number>"
//!       pickupDisplay       "available" | "unavailable" | "ineligible"
//!       pickupSearchQuote   "Available Today"
//!       messageTypes.compact.storePickupProductTitle
//!       messageTypes.regular.storePickupQuote
//! ```
//!
//! Every field is optional here. Stores come and go from the feed, and a
//! store may list no parts at all when nothing is stocked. The envelope is
//! navigated by JSON pointer in `parse.rs`; only the per-store records are
//! typed.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One store record from `pickupMessage.stores`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedStore {
    pub store_number: Option<String>,
    pub store_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Keyed by part number. Ordered so the deciding part is deterministic.
    pub parts_availability: BTreeMap<String, PartAvailability>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartAvailability {
    pub pickup_display: Option<String>,
    pub pickup_search_quote: Option<String>,
    pub message_types: Option<MessageTypes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageTypes {
    pub compact: Option<CompactMessage>,
    pub regular: Option<RegularMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompactMessage {
    pub store_pickup_product_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegularMessage {
    pub store_pickup_quote: Option<String>,
}

impl PartAvailability {
    /// Only an explicit `"available"` counts.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.pickup_display
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("available"))
    }

    #[must_use]
    pub fn product_title(&self) -> Option<&str> {
        self.message_types
            .as_ref()
            .and_then(|m| m.compact.as_ref())
            .and_then(|c| c.store_pickup_product_title.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Human-readable pickup quote: the search quote, else the regular
    /// message quote.
    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        self.pickup_search_quote
            .as_deref()
            .or_else(|| {
                self.message_types
                    .as_ref()
                    .and_then(|m| m.regular.as_ref())
                    .and_then(|r| r.store_pickup_quote.as_deref())
            })
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}
