mod email;

pub use email::SmtpMailer;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::{DATE_UNSPECIFIED, PRICE_UNKNOWN, Target};
use crate::types::{EventRecord, NotifyMode};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid mail address '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// The outbound mail collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError>;
}

/// Formats an event set as a notification. Pure: no I/O, the timestamp is
/// passed in.
#[derive(Debug, Clone)]
pub struct Renderer {
    city: String,
    listing_url: String,
}

/// "New " when only unseen events are reported, empty otherwise.
fn qualifier(mode: NotifyMode) -> &'static str {
    match mode {
        NotifyMode::DiffOnly => "New ",
        NotifyMode::AlwaysAll => "",
    }
}

fn found_label(mode: NotifyMode) -> &'static str {
    match mode {
        NotifyMode::DiffOnly => "new events",
        NotifyMode::AlwaysAll => "events",
    }
}

fn or_sentinel<'a>(value: &'a str, sentinel: &'a str) -> &'a str {
    if value.trim().is_empty() { sentinel } else { value }
}

impl Renderer {
    pub fn new(target: &Target) -> Self {
        Self {
            city: target.city.clone(),
            listing_url: target.listing_url.clone(),
        }
    }

    pub fn render(
        &self,
        events: &[EventRecord],
        mode: NotifyMode,
        generated_at: NaiveDateTime,
    ) -> RenderedMessage {
        RenderedMessage {
            subject: format!(
                "🎵 {} {}Music Events in {}!",
                events.len(),
                qualifier(mode),
                self.city
            ),
            html: self.render_html(events, mode, generated_at),
            text: self.render_text(events, mode, generated_at),
        }
    }

    fn venue<'a>(&'a self, event: &'a EventRecord) -> &'a str {
        or_sentinel(&event.venue, &self.city)
    }

    fn url<'a>(&'a self, event: &'a EventRecord) -> &'a str {
        or_sentinel(&event.url, &self.listing_url)
    }

    pub fn render_html(
        &self,
        events: &[EventRecord],
        mode: NotifyMode,
        generated_at: NaiveDateTime,
    ) -> String {
        let mut html = String::from(HTML_HEAD);
        html.push_str(&format!(
            r#"
  <div class="header">
    <h1>🎵 {new}Music Events in {city}!</h1>
    <p>Found {count} {found}</p>
  </div>
"#,
            new = qualifier(mode),
            city = encode_text(&self.city),
            count = events.len(),
            found = found_label(mode),
        ));

        for event in events {
            html.push_str(&format!(
                r#"
  <div class="event-card">
    <div class="event-title">{title}</div>
    <div class="event-detail"><span class="label">📅 Date:</span> {date}</div>
    <div class="event-detail"><span class="label">📍 Venue:</span> {venue}</div>
    <div class="event-detail"><span class="label">💰 Price:</span> {price}</div>
    <a href="{url}" class="book-btn">Book Now →</a>
  </div>
"#,
                title = encode_text(&event.title),
                date = encode_text(or_sentinel(&event.date, DATE_UNSPECIFIED)),
                venue = encode_text(self.venue(event)),
                price = encode_text(or_sentinel(&event.price, PRICE_UNKNOWN)),
                url = encode_double_quoted_attribute(self.url(event)),
            ));
        }

        html.push_str(&format!(
            r#"
  <div class="footer">
    <p>This alert was generated automatically on {generated}</p>
    <p>🔗 <a href="{listing}">View all {city} music events</a></p>
  </div>
</body>
</html>
"#,
            generated = generated_at.format("%Y-%m-%d at %H:%M"),
            listing = encode_double_quoted_attribute(&self.listing_url),
            city = encode_text(&self.city),
        ));
        html
    }

    pub fn render_text(
        &self,
        events: &[EventRecord],
        mode: NotifyMode,
        generated_at: NaiveDateTime,
    ) -> String {
        let mut text = format!(
            "🎵 {}MUSIC EVENTS IN {}! 🎵\n\n",
            qualifier(mode).to_uppercase(),
            self.city.to_uppercase()
        );
        text.push_str(&format!("Found {} {}:\n", events.len(), found_label(mode)));
        text.push_str(&"=".repeat(50));
        text.push_str("\n\n");

        for (i, event) in events.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, event.title));
            text.push_str(&format!(
                "   📅 Date: {}\n",
                or_sentinel(&event.date, DATE_UNSPECIFIED)
            ));
            text.push_str(&format!("   📍 Venue: {}\n", self.venue(event)));
            text.push_str(&format!(
                "   💰 Price: {}\n",
                or_sentinel(&event.price, PRICE_UNKNOWN)
            ));
            text.push_str(&format!("   🔗 Link: {}\n", self.url(event)));
            text.push('\n');
            text.push_str(&"-".repeat(30));
            text.push_str("\n\n");
        }

        text.push_str(&format!(
            "Generated on: {}\n",
            generated_at.format("%Y-%m-%d at %H:%M")
        ));
        text.push_str(&format!("View all events: {}", self.listing_url));
        text
    }
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; }
    .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 20px; text-align: center; border-radius: 10px; margin-bottom: 20px; }
    .event-card { border: 1px solid #ddd; margin: 15px 0; padding: 20px; border-radius: 10px; background: #f9f9f9; }
    .event-title { font-size: 18px; font-weight: bold; color: #2c3e50; margin-bottom: 10px; }
    .event-detail { margin: 8px 0; padding: 5px 0; border-bottom: 1px solid #eee; }
    .label { font-weight: bold; color: #34495e; }
    .book-btn { background: #e74c3c; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block; margin-top: 15px; }
    .footer { margin-top: 30px; padding: 20px; background: #ecf0f1; border-radius: 10px; text-align: center; font-size: 14px; color: #7f8c8d; }
  </style>
</head>
<body>"#;
