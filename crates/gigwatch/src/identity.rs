//! Stable keys for "the same event" across runs.
//!
//! The key is a heuristic: two listings that render the same title and
//! date collapse into one, and a listing whose rendering drifts between
//! runs is reported again. Both outcomes are accepted.

use chrono::{Local, NaiveDate};

use crate::config::DATE_UNSPECIFIED;

/// Characters of the normalised title kept in the key.
pub const TITLE_KEY_LEN: usize = 50;
/// Characters of the normalised date kept in the key.
pub const DATE_KEY_LEN: usize = 20;

/// Identity key using today's local date as the placeholder for undated events.
pub fn identity(title: &str, date: &str) -> String {
    identity_on(title, date, Local::now().date_naive())
}

/// `normalize(title)[..50] + "_" + normalize(date)[..20]`, lowercased with
/// spaces replaced by underscores. A missing date is replaced by
/// `undated-<today>` so the key stays computable.
pub fn identity_on(title: &str, date: &str, today: NaiveDate) -> String {
    let date = normalize(date);
    let date = if date.is_empty() || date == DATE_UNSPECIFIED {
        format!("undated-{}", today.format("%Y-%m-%d"))
    } else {
        date
    };

    let title: String = normalize(title).chars().take(TITLE_KEY_LEN).collect();
    let date: String = date.chars().take(DATE_KEY_LEN).collect();

    format!("{title}_{date}").replace(' ', "_").to_lowercase()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
