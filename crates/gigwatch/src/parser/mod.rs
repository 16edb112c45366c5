//! Turns raw payloads into relevant, deduplicated [`EventRecord`]s.
//!
//! Three payload shapes are routed to separate routines that share only the
//! output record and the relevance filter: markup goes through prioritised
//! candidate selectors, structured data through known key aliases, and
//! plain text through line scanning. Markup that yields nothing from its
//! candidates falls through to line scanning of its visible text.

mod fields;
mod markup;
mod structured;
mod text;

use std::collections::HashSet;

use scraper::Selector;
use serde_json::Value;

use crate::config::{ExtractionConfig, Target};
use crate::types::EventRecord;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// A raw response body, classified by shape.
#[derive(Debug, Clone)]
pub enum Payload<'a> {
    Markup(&'a str),
    Structured(Value),
    Text(&'a str),
}

impl<'a> Payload<'a> {
    /// JSON documents are structured, anything with tags is markup, the
    /// rest is text.
    pub fn sniff(body: &'a str) -> Self {
        let trimmed = body.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && let Ok(value) = serde_json::from_str::<Value>(trimmed)
        {
            return Payload::Structured(value);
        }
        if trimmed.contains('<') && trimmed.contains('>') {
            Payload::Markup(body)
        } else {
            Payload::Text(body)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Markup(_) => "markup",
            Payload::Structured(_) => "structured",
            Payload::Text(_) => "text",
        }
    }
}

pub(crate) struct Selectors {
    pub candidates: Vec<(String, Selector)>,
    pub title: Vec<Selector>,
    pub date: Vec<Selector>,
    pub venue: Vec<Selector>,
    pub price: Vec<Selector>,
    pub anchor: Selector,
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>, ParseError> {
    selectors.iter().map(|s| compile(s)).collect()
}

/// Heuristic event extractor. Selectors are compiled once up front so a bad
/// configuration fails at construction instead of mid-run.
pub struct Extractor {
    pub(crate) config: ExtractionConfig,
    pub(crate) target: Target,
    pub(crate) selectors: Selectors,
    relevance: Vec<String>,
    pub(crate) boilerplate: Vec<String>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig, target: Target) -> Result<Self, ParseError> {
        let selectors = Selectors {
            candidates: config
                .candidate_selectors
                .iter()
                .map(|s| Ok((s.clone(), compile(s)?)))
                .collect::<Result<_, ParseError>>()?,
            title: compile_all(&config.title_selectors)?,
            date: compile_all(&config.date_selectors)?,
            venue: compile_all(&config.venue_selectors)?,
            price: compile_all(&config.price_selectors)?,
            anchor: compile("a[href]")?,
        };
        let relevance = config
            .relevance_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        let boilerplate = config
            .boilerplate_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        Ok(Self {
            config,
            target,
            selectors,
            relevance,
            boilerplate,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// True when the title mentions at least one relevance keyword.
    pub fn is_relevant(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.relevance.iter().any(|k| title.contains(k.as_str()))
    }

    pub(crate) fn is_boilerplate(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.boilerplate.iter().any(|k| line.contains(k.as_str()))
    }

    pub fn extract(&self, payload: &Payload<'_>, source: &str) -> Vec<EventRecord> {
        let records = match payload {
            Payload::Markup(html) => markup::extract(self, html),
            Payload::Structured(value) => structured::extract(self, value),
            Payload::Text(body) => text::extract(self, body.lines()),
        };
        let records = finish(records, source);
        log::info!(
            "[{}] {} payload yielded {} event(s)",
            source,
            payload.kind(),
            records.len()
        );
        records
    }

    /// Structured parsing when the body is JSON, markup parsing otherwise.
    /// JSON without a recognisable event array yields nothing.
    pub fn extract_structured_first(&self, body: &str, source: &str) -> Vec<EventRecord> {
        match Payload::sniff(body) {
            payload @ Payload::Structured(_) => self.extract(&payload, source),
            _ => self.extract(&Payload::Markup(body), source),
        }
    }
}

/// Drops repeated identities (first occurrence wins) and tags the source.
fn finish(records: Vec<EventRecord>, source: &str) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id().to_string()))
        .map(|r| r.with_source(source))
        .collect()
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extractor() -> Extractor {
        Extractor::new(ExtractionConfig::default(), Target::default()).expect("default selectors")
    }

    #[test]
    fn test_sniff_shapes() {
        assert_eq!(Payload::sniff(r#"{"events": []}"#).kind(), "structured");
        assert_eq!(Payload::sniff("  [1, 2]").kind(), "structured");
        assert_eq!(Payload::sniff("<html><body></body></html>").kind(), "markup");
        assert_eq!(Payload::sniff("{ not json <b>bold</b>").kind(), "markup");
        assert_eq!(Payload::sniff("Live concert tonight\nMenu").kind(), "text");
    }

    #[test]
    fn test_invalid_selector_rejected_at_construction() {
        let config = ExtractionConfig {
            title_selectors: vec!["[[broken".to_string()],
            ..ExtractionConfig::default()
        };
        let err = Extractor::new(config, Target::default())
            .err()
            .expect("selector should not compile");
        assert!(matches!(err, ParseError::InvalidSelector { .. }));
    }

    #[test]
    fn test_three_cards_two_relevant() {
        let html = r#"
            <html><body>
              <div class="event-card">
                <h3 class="event-title">Live Concert: The Local Train</h3>
                <span class="date">Sat, 19 Oct</span>
                <a href="/events/the-local-train/ET001">Book</a>
              </div>
              <div class="event-card">
                <h3 class="event-title">Live Concert: Prateek Kuhad</h3>
                <span class="date">Sun, 20 Oct</span>
                <a href="/events/prateek-kuhad/ET002">Book</a>
              </div>
              <div class="event-card">
                <h3 class="event-title">Terms &amp; Conditions</h3>
                <a href="/terms">Read</a>
              </div>
            </body></html>
        "#;
        let ex = extractor();
        let records = ex.extract(&Payload::sniff(html), "direct");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.title.starts_with("Live Concert")));
        assert!(records.iter().all(|r| r.source == "direct"));

        let new = crate::utils::diff_new_events(&records, &[]);
        assert_eq!(new, records);
    }

    #[test]
    fn test_duplicate_cards_collapse_to_one() {
        let html = r#"
            <div class="event-card"><h3>Live Jazz Night</h3><span class="date">Fri</span></div>
            <div class="event-card"><h3>Live  Jazz Night</h3><span class="date">Fri</span></div>
            <div class="event-card"><h3>Rock Show</h3><span class="date">Sat</span></div>
        "#;
        let records = extractor().extract(&Payload::Markup(html), "direct");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Live Jazz Night");
        assert_eq!(records[1].title, "Rock Show");
    }

    #[test]
    fn test_relevance_filter_holds_for_every_shape() {
        let ex = extractor();
        let markup = r#"
            <article><h2>Cooking Workshop</h2></article>
            <article><h2>Stand-up Comedy</h2></article>
            <article><h2>Indie Music Festival</h2></article>
        "#;
        let structured = r#"{"data": {"events": [
            {"name": "Pottery Class", "date": "Mon"},
            {"name": "Sufi Live Performance", "date": "Tue"}
        ]}}"#;
        let plain = "Pottery class for beginners\nSufi live performance at Bandra\n";

        for (body, expected) in [
            (markup, "Indie Music Festival"),
            (structured, "Sufi Live Performance"),
            (plain, "Sufi live performance at Bandra"),
        ] {
            let records = ex.extract(&Payload::sniff(body), "test");
            assert_eq!(records.len(), 1, "body: {body}");
            assert_eq!(records[0].title, expected);
            assert!(records.iter().all(|r| ex.is_relevant(&r.title)));
        }
    }

    #[test]
    fn test_structured_first_falls_back_to_markup() {
        let ex = extractor();
        let html = r#"
            <div class="event-item"><div class="title">Bollywood Night Live</div></div>
            <div class="event-item"><div class="title">Techno Gig</div></div>
        "#;
        let records = ex.extract_structured_first(html, "api-probe");
        assert_eq!(records.len(), 2);

        let json = r#"{"results": [{"title": "Classical Music Evening", "venue": {"name": "NCPA"}}]}"#;
        let records = ex.extract_structured_first(json, "api-probe");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].venue, "NCPA");
    }

    #[test]
    fn test_json_without_events_is_not_scanned_as_text() {
        let ex = extractor();
        let error = r#"{"status": "error", "message": "No live shows found"}"#;
        assert!(ex.extract_structured_first(error, "api-probe").is_empty());

        let pretty = r#"{
            "page": {
                "category": "music-shows",
                "isLive": true,
                "banner": "Live music this weekend"
            }
        }"#;
        assert!(ex.extract_structured_first(pretty, "api-probe").is_empty());
    }

    #[test]
    fn test_explore_fixture() {
        let html =
            fs::read_to_string("fixtures/explore_music.html").expect("Failed to read fixture");
        let records = extractor().extract(&Payload::sniff(&html), "direct");

        assert_eq!(records.len(), 4, "got {:#?}", records);
        let first = &records[0];
        assert_eq!(first.title, "Sunburn Arena ft. Alan Walker - Live in Concert");
        assert_eq!(first.date, "Sat, 26 Oct onwards");
        assert_eq!(first.venue, "Jio World Garden: Mumbai");
        assert_eq!(first.price, "₹ 1999 onwards");
        assert_eq!(
            first.url,
            "https://in.bookmyshow.com/events/sunburn-arena-ft-alan-walker/ET00412345"
        );
        assert!(
            records.iter().all(|r| !r.title.contains("Workshop")),
            "non-music listing leaked"
        );
    }

    #[test]
    fn test_api_fixture() {
        let json =
            fs::read_to_string("fixtures/api_events.json").expect("Failed to read fixture");
        let records = extractor().extract(&Payload::sniff(&json), "api-probe");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Lollapalooza India 2026 - Music Festival");
        assert_eq!(records[0].price, "4500");
        assert_eq!(records[1].venue, "Mumbai");
    }
}
