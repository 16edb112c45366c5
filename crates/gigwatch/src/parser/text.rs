use super::{Extractor, normalize_whitespace};
use crate::config::{DATE_UNSPECIFIED, PRICE_UNKNOWN};
use crate::types::EventRecord;

/// Degenerate one-field records from free text: any line of plausible
/// length mentioning a relevance keyword and no boilerplate keyword.
pub(super) fn extract<'a>(ex: &Extractor, lines: impl Iterator<Item = &'a str>) -> Vec<EventRecord> {
    let cfg = &ex.config;
    lines
        .map(normalize_whitespace)
        .filter(|line| {
            let len = line.chars().count();
            (cfg.text_line_min..=cfg.text_line_max).contains(&len)
                && ex.is_relevant(line)
                && !ex.is_boilerplate(line)
        })
        .take(cfg.max_text_lines)
        .map(|line| {
            EventRecord::new(
                line,
                DATE_UNSPECIFIED,
                ex.target.city.as_str(),
                PRICE_UNKNOWN,
                ex.target.listing_url.as_str(),
            )
        })
        .collect()
}
