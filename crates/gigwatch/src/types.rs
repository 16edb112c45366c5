use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::identity::identity;

/// One scraped event listing.
///
/// `id` is derived from `title` and `date` when the record is built and
/// never recomputed afterwards, so it is only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub date: String,
    pub venue: String,
    pub price: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    id: String,
}

impl EventRecord {
    pub fn new(
        title: impl Into<String>,
        date: impl Into<String>,
        venue: impl Into<String>,
        price: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let date = date.into();
        let id = identity(&title, &date);
        Self {
            title,
            date,
            venue: venue.into(),
            price: price.into(),
            url: url.into(),
            source: String::new(),
            id,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshots written without an id get one derived on load.
    pub(crate) fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = identity(&self.title, &self.date);
        }
    }
}

impl Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.date, self.title)?;
        write!(f, "\n     Venue: {} · Price: {}", self.venue, self.price)?;
        write!(f, "\n     {}", self.url)?;
        if !self.source.is_empty() {
            write!(f, "\n     via {}", self.source)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid notify mode '{0}'. Accepted values: 'diff_only', 'always_all'")]
pub struct NotifyModeParseError(String);

/// Which events go into the notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// Only events absent from the previous snapshot.
    #[default]
    DiffOnly,
    /// Every event found in this run, whenever there is at least one.
    AlwaysAll,
}

impl FromStr for NotifyMode {
    type Err = NotifyModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff_only" | "diff" => Ok(NotifyMode::DiffOnly),
            "always_all" | "all" => Ok(NotifyMode::AlwaysAll),
            _ => Err(NotifyModeParseError(s.to_string())),
        }
    }
}

impl Display for NotifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyMode::DiffOnly => write!(f, "diff_only"),
            NotifyMode::AlwaysAll => write!(f, "always_all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_follows_title_and_date() {
        let record = EventRecord::new("Live Concert", "Sat, 12 Oct", "NSCI Dome", "₹999", "");
        assert_eq!(record.id(), "live_concert_sat,_12_oct");
    }

    #[test]
    fn test_source_does_not_change_id() {
        let record = EventRecord::new("Jazz Night Live", "Fri", "", "", "");
        let id = record.id().to_string();
        let tagged = record.with_source("direct");
        assert_eq!(tagged.id(), id);
        assert_eq!(tagged.source, "direct");
    }

    #[test]
    fn test_deserialize_without_source_or_id() {
        let json = r#"{"title":"Indie Music Fest","date":"Sun, 3 Nov","venue":"Mumbai","price":"₹500","url":"https://in.bookmyshow.com/x"}"#;
        let mut record: EventRecord = serde_json::from_str(json).expect("valid record");
        assert!(record.source.is_empty());
        assert!(record.id().is_empty());
        record.ensure_id();
        assert_eq!(record.id(), "indie_music_fest_sun,_3_nov");
    }

    #[test]
    fn test_notify_mode_parse() {
        assert_eq!("diff_only".parse::<NotifyMode>().unwrap(), NotifyMode::DiffOnly);
        assert_eq!("always_all".parse::<NotifyMode>().unwrap(), NotifyMode::AlwaysAll);
        assert!("sometimes".parse::<NotifyMode>().is_err());
        assert_eq!(NotifyMode::AlwaysAll.to_string(), "always_all");
    }
}
