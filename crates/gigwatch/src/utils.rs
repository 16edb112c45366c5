use std::collections::{BTreeMap, HashSet};

use crate::types::EventRecord;

/// Members of `current` whose id is absent from `previous`, in `current`'s order.
pub fn diff_new_events(current: &[EventRecord], previous: &[EventRecord]) -> Vec<EventRecord> {
    let previous_ids: HashSet<&str> = previous.iter().map(EventRecord::id).collect();
    current
        .iter()
        .filter(|e| !previous_ids.contains(e.id()))
        .cloned()
        .collect()
}

#[derive(Debug)]
pub struct EventStats {
    pub by_source: BTreeMap<String, usize>,
    pub dated: usize,
    pub total: usize,
}

impl EventStats {
    pub fn from_events(events: &[EventRecord]) -> EventStats {
        let mut by_source = BTreeMap::new();
        for event in events {
            let source = if event.source.is_empty() {
                "unknown".to_string()
            } else {
                event.source.clone()
            };
            *by_source.entry(source).or_insert(0) += 1;
        }
        EventStats {
            by_source,
            dated: events
                .iter()
                .filter(|e| e.date != crate::config::DATE_UNSPECIFIED)
                .count(),
            total: events.len(),
        }
    }
}

impl std::fmt::Display for EventStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        for (source, count) in &self.by_source {
            writeln!(f, "  From {:<16} {}", format!("{source}:"), count)?;
        }
        writeln!(f, "  With a date:          {}", self.dated)?;
        writeln!(f, "  Total:                {}", self.total)
    }
}
