pub mod config;
pub mod identity;
pub mod notify;
pub mod parser;
pub mod runner;
pub mod scraper;
pub mod store;
pub mod strategy;
pub mod types;
pub mod utils;

pub use runner::{RunOutcome, RunReport, Runner};
pub use crate::scraper::{ScraperError, WebScraper};
pub use types::EventRecord;

#[cfg(test)]
mod testing;
