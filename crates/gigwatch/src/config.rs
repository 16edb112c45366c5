use std::time::Duration;

pub const DATE_UNSPECIFIED: &str = "Not specified";
pub const PRICE_UNKNOWN: &str = "Check website";
pub const DEFAULT_CITY: &str = "Mumbai";
pub const DEFAULT_SNAPSHOT_PATH: &str = "previous_events.json";

pub const DEFAULT_LISTING_URL: &str =
    "https://in.bookmyshow.com/explore/events-mumbai?categories=music-shows";
pub const DEFAULT_BASE_ORIGIN: &str = "https://in.bookmyshow.com";
pub const DEFAULT_MOBILE_URL: &str =
    "https://in.bookmyshow.com/m/explore/events-mumbai?categories=music-shows";

/// The watched listing and every alternate way of reaching it.
#[derive(Debug, Clone)]
pub struct Target {
    pub listing_url: String,
    /// Origin prepended to relative links found in any payload.
    pub base_origin: String,
    pub mobile_url: String,
    pub api_endpoints: Vec<String>,
    pub cache_mirror: String,
    pub archive_mirror: String,
    pub city: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            base_origin: DEFAULT_BASE_ORIGIN.to_string(),
            mobile_url: DEFAULT_MOBILE_URL.to_string(),
            api_endpoints: vec![
                format!("{DEFAULT_BASE_ORIGIN}/api/explore/v1/discover/events-mumbai?categories=music-shows"),
                format!("{DEFAULT_BASE_ORIGIN}/api/events/mumbai?category=music-shows"),
                format!("{DEFAULT_BASE_ORIGIN}/serv/getData?cmd=GETEVENTLIST&f=json&et=MT&rc=MUMBAI"),
            ],
            cache_mirror: "https://webcache.googleusercontent.com/search?q=cache:".to_string(),
            archive_mirror: "https://web.archive.org/web/2/".to_string(),
            city: DEFAULT_CITY.to_string(),
        }
    }
}

impl Target {
    pub fn cache_url(&self) -> String {
        format!("{}{}", self.cache_mirror, self.listing_url)
    }

    pub fn archive_url(&self) -> String {
        format!("{}{}", self.archive_mirror, self.listing_url)
    }

    /// Turns an `href` into an absolute URL, or `None` when it is not a
    /// navigable link (fragments, `javascript:`, `mailto:` ...).
    pub fn absolutize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.starts_with("//") {
            Some(format!("https:{href}"))
        } else if href.starts_with('/') {
            Some(format!("{}{}", self.base_origin.trim_end_matches('/'), href))
        } else if href.starts_with("http://") || href.starts_with("https://") {
            Some(href.to_string())
        } else {
            None
        }
    }
}

/// Heuristic lists and bounds driving extraction. Every list is ordered
/// from most to least specific.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub candidate_selectors: Vec<String>,
    pub title_selectors: Vec<String>,
    pub date_selectors: Vec<String>,
    pub venue_selectors: Vec<String>,
    pub price_selectors: Vec<String>,
    pub relevance_keywords: Vec<String>,
    pub boilerplate_keywords: Vec<String>,
    /// Path fragment a bare hyperlink must contain to be scanned as a candidate.
    pub link_keyword: String,
    /// A selector is accepted only when it matches at least this many elements.
    pub min_candidates: usize,
    pub max_candidates: usize,
    pub max_link_candidates: usize,
    pub max_text_lines: usize,
    pub text_line_min: usize,
    pub text_line_max: usize,
    /// Element text shorter than this may stand in for a missing title.
    pub title_fallback_max: usize,
    pub title_truncate: usize,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            candidate_selectors: owned(&[
                r#"div[data-testid="event-card"]"#,
                ".event-card",
                ".event-item",
                r#"[class*="event"]"#,
                "article",
                ".list-card",
            ]),
            title_selectors: owned(&[
                r#"[data-testid*="title"]"#,
                ".event-title",
                ".title",
                "h1, h2, h3, h4",
                ".name",
                r#"[class*="title"]"#,
            ]),
            date_selectors: owned(&[
                r#"[data-testid*="date"]"#,
                "time",
                ".event-date",
                ".date",
                r#"[class*="date"]"#,
            ]),
            venue_selectors: owned(&[
                r#"[data-testid*="venue"]"#,
                ".venue",
                ".location",
                r#"[class*="venue"]"#,
                r#"[class*="location"]"#,
            ]),
            price_selectors: owned(&[
                r#"[data-testid*="price"]"#,
                ".price",
                r#"[class*="price"]"#,
                r#"[class*="cost"]"#,
            ]),
            relevance_keywords: owned(&[
                "concert",
                "live",
                "show",
                "festival",
                "performance",
                "music",
                "gig",
            ]),
            boilerplate_keywords: owned(&[
                "menu",
                "login",
                "log in",
                "sign in",
                "sign up",
                "footer",
                "cookie",
                "privacy",
                "terms",
                "copyright",
                "subscribe",
                "download the app",
            ]),
            link_keyword: "events".to_string(),
            min_candidates: 2,
            max_candidates: 20,
            max_link_candidates: 15,
            max_text_lines: 10,
            text_line_min: 10,
            text_line_max: 150,
            title_fallback_max: 200,
            title_truncate: 100,
        }
    }
}

/// Per-request behaviour of the HTTP collaborator.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
            user_agents: owned(&[
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
                "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
            ]),
        }
    }
}

impl FetchConfig {
    /// No delay between requests; for tests and local file runs.
    pub fn without_delay(mut self) -> Self {
        self.min_delay = Duration::ZERO;
        self.max_delay = Duration::ZERO;
        self
    }
}

/// SMTP settings. All four of sender, password, receiver and server must
/// be present for delivery to be attempted.
#[derive(Clone)]
pub struct MailConfig {
    pub sender: String,
    pub password: String,
    pub receiver: String,
    pub smtp_server: String,
    pub smtp_port: u16,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

impl MailConfig {
    pub const DEFAULT_PORT: u16 = 587;

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let value = lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            if value.is_none() {
                log::warn!("Missing mail setting {key}");
            }
            value
        };

        let sender = get("SENDER_EMAIL");
        let password = get("SENDER_PASSWORD");
        let receiver = get("RECEIVER_EMAIL");
        let smtp_server = get("SMTP_SERVER");

        let smtp_port = lookup("SMTP_PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(Self::DEFAULT_PORT);

        Some(Self {
            sender: sender?,
            password: password?,
            receiver: receiver?,
            smtp_server: smtp_server?,
            smtp_port,
        })
    }
}
