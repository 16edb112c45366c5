//! Ordered acquisition strategies.
//!
//! Every strategy is isolated: its failure is logged and the chain moves on.
//! The chain stops at the first strategy that yields at least one record;
//! later strategies are never invoked.

use async_trait::async_trait;

use crate::config::Target;
use crate::parser::{Extractor, Payload};
use crate::scraper::{Fetcher, ScraperError};
use crate::types::EventRecord;

pub const DIRECT: &str = "direct";
pub const CACHE_MIRROR: &str = "cache-mirror";
pub const ARCHIVE_MIRROR: &str = "archive-mirror";
pub const MOBILE: &str = "mobile";
pub const API_PROBE: &str = "api-probe";

/// Collaborators shared by every strategy of one run.
pub struct AcquireContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub extractor: &'a Extractor,
}

#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn label(&self) -> &str;

    async fn acquire(&self, ctx: &AcquireContext<'_>) -> Result<Vec<EventRecord>, ScraperError>;
}

/// Fetches one page and runs it through the payload extractor.
#[derive(Debug, Clone)]
pub struct PageStrategy {
    label: String,
    url: String,
}

impl PageStrategy {
    pub fn new(label: &str, url: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            url: url.into(),
        }
    }

    pub fn direct(target: &Target) -> Self {
        Self::new(DIRECT, target.listing_url.clone())
    }

    pub fn cache_mirror(target: &Target) -> Self {
        Self::new(CACHE_MIRROR, target.cache_url())
    }

    pub fn archive_mirror(target: &Target) -> Self {
        Self::new(ARCHIVE_MIRROR, target.archive_url())
    }

    pub fn mobile(target: &Target) -> Self {
        Self::new(MOBILE, target.mobile_url.clone())
    }
}

#[async_trait]
impl AcquisitionStrategy for PageStrategy {
    fn label(&self) -> &str {
        &self.label
    }

    async fn acquire(&self, ctx: &AcquireContext<'_>) -> Result<Vec<EventRecord>, ScraperError> {
        log::info!("[{}] Fetching {}", self.label, self.url);
        let body = ctx.fetcher.get(&self.url).await?.into_text(&self.url)?;
        Ok(ctx.extractor.extract(&Payload::sniff(&body), &self.label))
    }
}

/// Tries guessed API endpoints in order; the first one yielding records wins.
#[derive(Debug, Clone)]
pub struct ApiProbeStrategy {
    endpoints: Vec<String>,
}

impl ApiProbeStrategy {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl AcquisitionStrategy for ApiProbeStrategy {
    fn label(&self) -> &str {
        API_PROBE
    }

    async fn acquire(&self, ctx: &AcquireContext<'_>) -> Result<Vec<EventRecord>, ScraperError> {
        for endpoint in &self.endpoints {
            log::info!("[{}] Probing {}", API_PROBE, endpoint);
            let body = match ctx.fetcher.get(endpoint).await {
                Ok(response) => response.into_text(endpoint),
                Err(e) => Err(e),
            };
            match body {
                Ok(body) => {
                    let records = ctx.extractor.extract_structured_first(&body, API_PROBE);
                    if !records.is_empty() {
                        return Ok(records);
                    }
                }
                Err(e) => log::warn!("[{}] {} failed: {}", API_PROBE, endpoint, e),
            }
        }
        Ok(Vec::new())
    }
}

#[derive(Debug)]
pub enum ChainOutcome {
    Found {
        source: String,
        events: Vec<EventRecord>,
    },
    Exhausted,
}

impl ChainOutcome {
    pub fn into_events(self) -> Vec<EventRecord> {
        match self {
            ChainOutcome::Found { events, .. } => events,
            ChainOutcome::Exhausted => Vec::new(),
        }
    }
}

pub struct StrategyChain {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        Self { strategies }
    }

    /// direct, cache mirror, archive mirror, mobile, API probing.
    pub fn standard(target: &Target) -> Self {
        Self::new(vec![
            Box::new(PageStrategy::direct(target)),
            Box::new(PageStrategy::cache_mirror(target)),
            Box::new(PageStrategy::archive_mirror(target)),
            Box::new(PageStrategy::mobile(target)),
            Box::new(ApiProbeStrategy::new(target.api_endpoints.clone())),
        ])
    }

    pub fn labels(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.label()).collect()
    }

    pub async fn acquire(&self, ctx: &AcquireContext<'_>) -> ChainOutcome {
        for strategy in &self.strategies {
            match strategy.acquire(ctx).await {
                Ok(events) if !events.is_empty() => {
                    log::info!("[{}] Found {} event(s)", strategy.label(), events.len());
                    return ChainOutcome::Found {
                        source: strategy.label().to_string(),
                        events,
                    };
                }
                Ok(_) => log::info!("[{}] No events, trying next strategy", strategy.label()),
                Err(e) => log::warn!("[{}] Failed: {}", strategy.label(), e),
            }
        }
        log::warn!("All {} strategies exhausted", self.strategies.len());
        ChainOutcome::Exhausted
    }
}
