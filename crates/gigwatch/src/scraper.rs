use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::FetchConfig;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body as text, or a [`ScraperError::Status`] for non-2xx responses.
    pub fn into_text(self, url: &str) -> Result<String, ScraperError> {
        if !self.is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: self.status,
            });
        }
        Ok(self.text())
    }
}

/// The HTTP collaborator: one GET, status and body back.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, ScraperError>;
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    config: FetchConfig,
}

impl WebScraper {
    pub fn new(config: FetchConfig) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// A random pause within the configured bounds and a client identity
    /// picked from the pool.
    fn next_disguise(&self) -> (Duration, String) {
        let mut rng = rand::thread_rng();

        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        let delay = if max > min {
            Duration::from_millis(rng.gen_range(min..=max))
        } else {
            self.config.min_delay
        };

        let agent = self
            .config
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| {
                format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
            });

        (delay, agent)
    }
}

#[async_trait]
impl Fetcher for WebScraper {
    async fn get(&self, url: &str) -> Result<FetchResponse, ScraperError> {
        let (delay, agent) = self.next_disguise();
        if !delay.is_zero() {
            log::debug!("Waiting {:.1}s before {}", delay.as_secs_f32(), url);
            tokio::time::sleep(delay).await;
        }

        log::debug!("GET {} as {}", url, agent);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, agent)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?
            .to_vec();

        Ok(FetchResponse { status, body })
    }
}
