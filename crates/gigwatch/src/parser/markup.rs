use scraper::{ElementRef, Html};

use super::{Extractor, fields::extract_fields, text};
use crate::types::EventRecord;

/// Candidate elements: the first selector matching at least
/// `min_candidates` elements, else hyperlinks whose target contains the
/// link keyword.
fn locate_candidates<'a>(ex: &Extractor, document: &'a Html) -> Vec<ElementRef<'a>> {
    for (name, sel) in &ex.selectors.candidates {
        let found: Vec<_> = document.select(sel).collect();
        if found.len() >= ex.config.min_candidates {
            log::debug!("Found {} candidates using selector: {}", found.len(), name);
            return found;
        }
    }

    let links: Vec<_> = document
        .select(&ex.selectors.anchor)
        .filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|href| href.contains(ex.config.link_keyword.as_str()))
        })
        .take(ex.config.max_link_candidates)
        .collect();
    log::debug!("Fallback: found {} event links", links.len());
    links
}

const HIDDEN_ELEMENTS: [&str; 6] = ["head", "title", "script", "style", "noscript", "template"];

/// Visible text lines of the document. Text anywhere under a hidden element
/// (the whole `<head>` included) is skipped.
fn visible_lines(document: &Html) -> Vec<String> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            (!hidden).then(|| text.to_string())
        })
        .flat_map(|chunk| {
            chunk
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

pub(super) fn extract(ex: &Extractor, html: &str) -> Vec<EventRecord> {
    let document = Html::parse_document(html);

    let records: Vec<_> = locate_candidates(ex, &document)
        .into_iter()
        .take(ex.config.max_candidates)
        .filter_map(|element| extract_fields(ex, element))
        .collect();

    if !records.is_empty() {
        return records;
    }

    log::debug!("No records from candidates, scanning visible text lines");
    let lines = visible_lines(&document);
    text::extract(ex, lines.iter().map(String::as_str))
}
