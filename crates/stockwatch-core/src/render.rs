//! Telegram-HTML message rendering.
//!
//! Presentation only: nothing here feeds back into the notify decision. All
//! feed-derived text is escaped before it is embedded in markup.

use chrono::{DateTime, Duration, Utc};

use crate::diff::ChangeSet;
use crate::snapshot::{Snapshot, StoreStatus};

/// Maximum number of still-available stores listed in an alert.
pub const STILL_AVAILABLE_PREVIEW: usize = 5;

/// Maximum number of stores listed per transition section.
pub const TRANSITION_LIST_CAP: usize = 25;

/// Telegram rejects `sendMessage` text longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const MAX_REASON_CHARS: usize = 1000;
const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━";
const SIGNATURE: &str = "🤖 <i>stockwatch</i>";

/// Escape the three characters Telegram's HTML parse mode treats as markup.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Human-readable age: minutes under an hour, hours under a day, days beyond.
#[must_use]
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes().max(0);
    if minutes < 60 {
        plural(minutes, "minute")
    } else if minutes < 60 * 24 {
        plural(age.num_hours(), "hour")
    } else {
        plural(age.num_days(), "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn store_name(store: &StoreStatus) -> String {
    if store.display_name.trim().is_empty() {
        escape_html(&store.store_id)
    } else {
        escape_html(&store.display_name)
    }
}

fn store_location(store: &StoreStatus) -> String {
    let parts: Vec<&str> = [store.city.as_str(), store.region.as_str()]
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    escape_html(&parts.join(", "))
}

fn header(lines: &mut Vec<String>, title: &str, current: &Snapshot) {
    lines.push(title.to_string());
    lines.push(format!("📱 <b>{}</b>", escape_html(current.product_label())));
    lines.push(String::new());
    lines.push(format!("🕐 <i>{}</i>", format_timestamp(current.timestamp())));
}

fn footer(lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(SEPARATOR.to_string());
    lines.push(SIGNATURE.to_string());
}

fn more_line(lines: &mut Vec<String>, total: usize, shown: usize) {
    if total > shown {
        lines.push(format!("<i>…and {} more</i>", total - shown));
    }
}

fn char_len(lines: &[String]) -> usize {
    lines.iter().map(|l| l.chars().count()).sum::<usize>() + lines.len().saturating_sub(1)
}

/// Join `body` and a footer, dropping trailing body lines until the message
/// fits in [`MAX_MESSAGE_CHARS`]. Lines are dropped whole so markup stays
/// balanced.
fn finish(mut body: Vec<String>) -> String {
    let mut tail = Vec::new();
    footer(&mut tail);
    let marker = "<i>…message truncated</i>".to_string();

    if char_len(&body) + 1 + char_len(&tail) > MAX_MESSAGE_CHARS {
        let budget = MAX_MESSAGE_CHARS - char_len(&tail) - 1 - marker.chars().count() - 1;
        while !body.is_empty() && char_len(&body) > budget {
            body.pop();
        }
        body.push(marker);
    }

    body.extend(tail);
    body.join("\n")
}

fn compact_entry(bullet: &str, store: &StoreStatus) -> String {
    let location = store_location(store);
    if location.is_empty() {
        format!("{bullet} {}", store_name(store))
    } else {
        format!("{bullet} {} ({location})", store_name(store))
    }
}

/// Alert body for a cycle with transitions. Newly available stores come
/// first, then newly unavailable, then a capped preview of the stores that
/// stayed available, then stores missing from the feed.
pub(crate) fn render_changes(
    current: &Snapshot,
    changes: &ChangeSet,
    previous_age: Option<Duration>,
) -> String {
    let title = if changes.became_available.is_empty() {
        "⚠️ <b>Stock update</b>"
    } else {
        "🎉 <b>STOCK AVAILABLE!</b>"
    };

    let mut lines = Vec::new();
    header(&mut lines, title, current);
    if let Some(age) = previous_age {
        lines.push(format!("⏱ <i>Previous check {} ago</i>", format_age(age)));
    }

    if !changes.became_available.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "<b>✅ NOW AVAILABLE ({}):</b>",
            changes.became_available.len()
        ));
        for store in changes.became_available.iter().take(TRANSITION_LIST_CAP) {
            lines.push(String::new());
            lines.push(format!("✅ <b>{}</b>", store_name(store)));
            let location = store_location(store);
            if !location.is_empty() {
                lines.push(format!("   📍 {location}"));
            }
            if !store.availability_note.trim().is_empty() {
                lines.push(format!("   ⏰ {}", escape_html(&store.availability_note)));
            }
        }
        more_line(&mut lines, changes.became_available.len(), TRANSITION_LIST_CAP);
    }

    if !changes.became_unavailable.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "<b>❌ NO LONGER AVAILABLE ({}):</b>",
            changes.became_unavailable.len()
        ));
        for store in changes.became_unavailable.iter().take(TRANSITION_LIST_CAP) {
            lines.push(compact_entry("❌", store));
        }
        more_line(&mut lines, changes.became_unavailable.len(), TRANSITION_LIST_CAP);
    }

    if !changes.still_available.is_empty() {
        let total = changes.still_available.len();
        lines.push(String::new());
        lines.push(format!("<b>🟢 STILL AVAILABLE ({total}):</b>"));
        if total > STILL_AVAILABLE_PREVIEW {
            lines.push(format!(
                "<i>(showing {STILL_AVAILABLE_PREVIEW} of {total})</i>"
            ));
        }
        for store in changes.still_available.iter().take(STILL_AVAILABLE_PREVIEW) {
            lines.push(compact_entry("•", store));
        }
    }

    if !changes.removed.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "<b>❔ MISSING FROM FEED ({}):</b>",
            changes.removed.len()
        ));
        for store in changes.removed.iter().take(TRANSITION_LIST_CAP) {
            lines.push(compact_entry("•", store));
        }
        more_line(&mut lines, changes.removed.len(), TRANSITION_LIST_CAP);
    }

    finish(lines)
}

/// Informational message for the first observation.
pub(crate) fn render_baseline(current: &Snapshot, changes: &ChangeSet) -> String {
    let mut lines = Vec::new();
    header(&mut lines, "📋 <b>Baseline captured</b>", current);
    lines.push(String::new());
    lines.push(format!(
        "Tracking {} store(s): {} available, {} unavailable.",
        changes.available_now() + changes.unavailable_now(),
        changes.available_now(),
        changes.unavailable_now()
    ));
    for store in changes.became_available.iter().take(TRANSITION_LIST_CAP) {
        lines.push(compact_entry("✅", store));
    }
    more_line(&mut lines, changes.became_available.len(), TRANSITION_LIST_CAP);
    finish(lines)
}

/// Message for a failed fetch.
pub(crate) fn render_failure(snapshot: &Snapshot) -> String {
    let reason: String = snapshot
        .failure_reason()
        .unwrap_or("unknown error")
        .chars()
        .take(MAX_REASON_CHARS)
        .collect();
    let mut lines = Vec::new();
    header(&mut lines, "❌ <b>FETCH FAILED</b>", snapshot);
    lines.push(String::new());
    lines.push("<b>Error:</b>".to_string());
    lines.push(format!("<code>{}</code>", escape_html(&reason)));
    finish(lines)
}

/// Connectivity check sent by `stockwatch test-notify`.
#[must_use]
pub fn render_test_message() -> String {
    let mut lines = vec![
        "🧪 <b>Connection test</b>".to_string(),
        String::new(),
        "✅ Notifications are reaching this chat.".to_string(),
    ];
    footer(&mut lines);
    lines.join("\n")
}
