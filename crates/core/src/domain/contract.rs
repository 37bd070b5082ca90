//! Field-by-field validation of the untrusted `deals` payload the model
//! returns. Nothing from the raw JSON reaches a [`Deal`] without a type check.

use crate::domain::deal::{Deal, DEFAULT_CATEGORY, DEFAULT_TIME, DEFAULT_TITLE};
use serde_json::{Map, Number, Value};

pub const MAX_DEALS: usize = 12;

pub const MAX_TITLE_CHARS: usize = 140;
pub const MAX_STORE_CHARS: usize = 60;
pub const MAX_URL_CHARS: usize = 2000;
pub const MAX_TIME_CHARS: usize = 60;
pub const MAX_CATEGORY_CHARS: usize = 30;

/// Normalizes the `deals` array of an extracted model payload.
///
/// A missing payload, a payload without `deals`, or a `deals` value that is
/// not an array all yield an empty list. At most [`MAX_DEALS`] entries are kept.
pub fn normalize_deals(payload: Option<&Value>) -> Vec<Deal> {
    let Some(entries) = payload
        .and_then(|p| p.get("deals"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries.iter().take(MAX_DEALS).map(normalize_deal).collect()
}

pub fn normalize_deal(entry: &Value) -> Deal {
    let Some(fields) = entry.as_object() else {
        return Deal::default();
    };

    Deal {
        title: string_field(fields, "title", MAX_TITLE_CHARS)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        price: number_field(fields, "price"),
        original_price: number_field(fields, "originalPrice"),
        discount: number_field(fields, "discount"),
        store: string_field(fields, "store", MAX_STORE_CHARS),
        url: string_field(fields, "url", MAX_URL_CHARS),
        image: string_field(fields, "image", MAX_URL_CHARS),
        time: string_field(fields, "time", MAX_TIME_CHARS)
            .unwrap_or_else(|| DEFAULT_TIME.to_string()),
        category: string_field(fields, "category", MAX_CATEGORY_CHARS)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        hot: false,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str, max_chars: usize) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s, max_chars))
}

// Relies on serde_json's arbitrary precision: `1e400` parses as a number and
// is rejected here instead of failing the whole payload.
fn number_field(fields: &Map<String, Value>, key: &str) -> Option<Number> {
    fields
        .get(key)
        .and_then(Value::as_number)
        .filter(|n| n.as_f64().is_some_and(f64::is_finite))
        .cloned()
}

/// Truncates to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
