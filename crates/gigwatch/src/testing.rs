//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::notify::{Mailer, NotifyError, RenderedMessage};
use crate::scraper::{FetchResponse, Fetcher, ScraperError};
use crate::store::{SnapshotStore, StoreError};
use crate::types::EventRecord;

/// Serves canned pages; unknown URLs answer 404. Records every request.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, (u16, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, ScraperError> {
        self.calls.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(FetchResponse {
            status,
            body: body.into_bytes(),
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub events: Arc<Mutex<Vec<EventRecord>>>,
    pub saves: Arc<Mutex<usize>>,
    pub fail_load: bool,
    pub fail_save: bool,
}

impl MemoryStore {
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

fn unavailable() -> StoreError {
    StoreError::Io {
        path: "memory".into(),
        source: std::io::Error::other("store unavailable"),
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Vec<EventRecord>, StoreError> {
        if self.fail_load {
            return Err(unavailable());
        }
        Ok(self.snapshot())
    }

    fn save(&self, events: &[EventRecord]) -> Result<(), StoreError> {
        if self.fail_save {
            return Err(unavailable());
        }
        *self.events.lock().unwrap() = events.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<RenderedMessage>>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<RenderedMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Address {
                address: "nobody".to_string(),
                source: "nobody".parse::<lettre::Address>().unwrap_err(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
