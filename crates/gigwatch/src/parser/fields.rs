use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{Extractor, normalize_whitespace};
use crate::config::{DATE_UNSPECIFIED, PRICE_UNKNOWN};
use crate::types::EventRecord;

/// Path segments that carry no title: ids such as `ET00412345`, pure numbers.
static RE_ID_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z]{0,4}\d{3,}$").expect("invalid regex: id segment"));

const GENERIC_SEGMENTS: &[&str] = &["events", "event", "explore", "m", "buytickets", "music-shows"];

fn elem_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// First non-empty text among the matches of each selector, tried in order.
fn first_text(element: ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        element
            .select(sel)
            .map(elem_text)
            .find(|text| !text.is_empty())
    })
}

fn link_of<'a>(element: ElementRef<'a>, anchor: &Selector) -> Option<&'a str> {
    if element.value().name() == "a"
        && let Some(href) = element.value().attr("href")
    {
        return Some(href);
    }
    element
        .select(anchor)
        .find_map(|a| a.value().attr("href"))
}

/// Readable title from the last meaningful path segment, e.g.
/// `/events/sunburn-arena-mumbai/ET00412345` becomes `Sunburn Arena Mumbai`.
pub(crate) fn title_from_url(url: &str) -> Option<String> {
    let path = url.split_once("://").map_or(url, |(_, rest)| {
        rest.find('/').map_or("", |i| &rest[i..])
    });
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let segment = path.split('/').rev().find(|seg| {
        !seg.is_empty()
            && !RE_ID_SEGMENT.is_match(seg)
            && !GENERIC_SEGMENTS.contains(&seg.to_lowercase().as_str())
            && seg.chars().any(|c| c.is_alphabetic())
    })?;

    let title = segment
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    (!title.is_empty()).then_some(title)
}

/// Best-effort record for one candidate element.
///
/// Each field takes the first non-empty match from its selector list. A
/// missing title falls back to the element's own text when short enough,
/// then to the link path. Returns `None` when no title can be found or the
/// title is not relevant.
pub(crate) fn extract_fields(ex: &Extractor, element: ElementRef) -> Option<EventRecord> {
    let sel = &ex.selectors;
    let cfg = &ex.config;

    let url = link_of(element, &sel.anchor).and_then(|href| ex.target.absolutize(href));

    let title = first_text(element, &sel.title)
        .or_else(|| {
            let own = elem_text(element);
            (!own.is_empty() && own.chars().count() < cfg.title_fallback_max)
                .then(|| own.chars().take(cfg.title_truncate).collect())
        })
        .or_else(|| url.as_deref().and_then(title_from_url))?;

    if !ex.is_relevant(&title) {
        log::debug!("Skipping non-event listing: {}", title);
        return None;
    }

    let date = first_text(element, &sel.date).unwrap_or_else(|| DATE_UNSPECIFIED.to_string());
    let venue = first_text(element, &sel.venue).unwrap_or_else(|| ex.target.city.clone());
    let price = first_text(element, &sel.price).unwrap_or_else(|| PRICE_UNKNOWN.to_string());
    let url = url.unwrap_or_else(|| ex.target.listing_url.clone());

    Some(EventRecord::new(title, date, venue, price, url))
}
