use serde_json::{Map, Value};

use super::{Extractor, normalize_whitespace};
use crate::config::{DATE_UNSPECIFIED, PRICE_UNKNOWN};
use crate::types::EventRecord;

const WRAPPER_KEYS: &[&str] = &["events", "data", "results", "items", "list", "eventsData"];
const MAX_DEPTH: usize = 4;

const TITLE_KEYS: &[&str] = &["name", "title", "eventName", "event_name", "eventTitle"];
const DATE_KEYS: &[&str] = &[
    "date",
    "eventDate",
    "startDate",
    "start_date",
    "showDate",
    "dateTime",
    "displayDate",
];
const VENUE_KEYS: &[&str] = &["venue", "venueName", "venue_name", "location", "place"];
const PRICE_KEYS: &[&str] = &["price", "minPrice", "ticketPrice", "priceRange", "price_range"];
const URL_KEYS: &[&str] = &["url", "link", "eventUrl", "event_url", "href"];

/// The first array of objects found at the top level or under a wrapper key.
fn find_items(value: &Value, depth: usize) -> Option<&Vec<Value>> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Array(items) if items.iter().any(Value::is_object) => Some(items),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| find_items(inner, depth + 1)),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => normalize_whitespace(s),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => return map.get("name").and_then(value_text),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn field(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| item.get(*key).and_then(value_text))
}

fn to_record(ex: &Extractor, item: &Map<String, Value>) -> Option<EventRecord> {
    let title = field(item, TITLE_KEYS)?;
    if !ex.is_relevant(&title) {
        log::debug!("Skipping non-event item: {}", title);
        return None;
    }

    let url = field(item, URL_KEYS)
        .and_then(|href| ex.target.absolutize(&href))
        .unwrap_or_else(|| ex.target.listing_url.clone());

    Some(EventRecord::new(
        title,
        field(item, DATE_KEYS).unwrap_or_else(|| DATE_UNSPECIFIED.to_string()),
        field(item, VENUE_KEYS).unwrap_or_else(|| ex.target.city.clone()),
        field(item, PRICE_KEYS).unwrap_or_else(|| PRICE_UNKNOWN.to_string()),
        url,
    ))
}

pub(super) fn extract(ex: &Extractor, value: &Value) -> Vec<EventRecord> {
    let Some(items) = find_items(value, 0) else {
        log::debug!("No event array found in structured payload");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| to_record(ex, item))
        .collect()
}
