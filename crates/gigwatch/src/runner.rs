use std::fmt::Display;

use chrono::Local;

use crate::notify::{Mailer, RenderedMessage, Renderer};
use crate::parser::Extractor;
use crate::scraper::Fetcher;
use crate::store::SnapshotStore;
use crate::strategy::{AcquireContext, StrategyChain};
use crate::types::{EventRecord, NotifyMode};
use crate::utils::diff_new_events;

/// How a run ended. None of these is a process failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every strategy came back empty; nothing was saved or sent.
    NoData,
    /// Events were found but none qualified for a notification.
    NothingToNotify,
    Delivered { count: usize },
    /// No mail configuration, or a dry run.
    DeliverySkipped,
    DeliveryFailed(String),
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub previous: usize,
    pub found: usize,
    pub new: usize,
    pub snapshot_saved: bool,
    pub outcome: RunOutcome,
    pub message: Option<RenderedMessage>,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nRun summary:")?;
        writeln!(f, "  Previous events: {}", self.previous)?;
        writeln!(f, "  Found:           {}", self.found)?;
        writeln!(f, "  New:             {}", self.new)?;
        writeln!(
            f,
            "  Snapshot:        {}",
            if self.snapshot_saved { "saved" } else { "not saved" }
        )?;
        let outcome = match &self.outcome {
            RunOutcome::NoData => "no data this run".to_string(),
            RunOutcome::NothingToNotify => "no new events, no email sent".to_string(),
            RunOutcome::Delivered { count } => format!("email sent with {count} event(s)"),
            RunOutcome::DeliverySkipped => "email skipped".to_string(),
            RunOutcome::DeliveryFailed(e) => format!("email failed: {e}"),
        };
        writeln!(f, "  Outcome:         {}", outcome)
    }
}

/// Sequences one run: load previous, acquire, diff, save, notify.
pub struct Runner {
    store: Box<dyn SnapshotStore>,
    fetcher: Box<dyn Fetcher>,
    extractor: Extractor,
    chain: StrategyChain,
    renderer: Renderer,
    mailer: Option<Box<dyn Mailer>>,
    notify_mode: NotifyMode,
    dry_run: bool,
}

impl Runner {
    pub fn new(
        store: Box<dyn SnapshotStore>,
        fetcher: Box<dyn Fetcher>,
        extractor: Extractor,
        chain: StrategyChain,
    ) -> Self {
        let renderer = Renderer::new(extractor.target());
        Self {
            store,
            fetcher,
            extractor,
            chain,
            renderer,
            mailer: None,
            notify_mode: NotifyMode::default(),
            dry_run: false,
        }
    }

    pub fn with_mailer(mut self, mailer: Option<Box<dyn Mailer>>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_notify_mode(mut self, mode: NotifyMode) -> Self {
        self.notify_mode = mode;
        self
    }

    /// Renders the notification but neither saves nor sends.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn load_previous(&self) -> Vec<EventRecord> {
        match self.store.load() {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!("Error loading previous events, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn save_current(&self, current: &[EventRecord]) -> bool {
        if self.dry_run {
            log::info!("Dry run: snapshot not written");
            return false;
        }
        match self.store.save(current) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error saving events: {}", e);
                false
            }
        }
    }

    async fn deliver(&self, message: &RenderedMessage, count: usize) -> RunOutcome {
        if self.dry_run {
            log::info!("Dry run: email not sent");
            return RunOutcome::DeliverySkipped;
        }
        let Some(mailer) = &self.mailer else {
            log::warn!("Missing email credentials, skipping delivery");
            return RunOutcome::DeliverySkipped;
        };

        log::info!("Sending email alert for {} events...", count);
        match mailer.send(message).await {
            Ok(()) => RunOutcome::Delivered { count },
            Err(e) => {
                log::error!("Error sending email: {}", e);
                RunOutcome::DeliveryFailed(e.to_string())
            }
        }
    }

    pub async fn run(&self) -> RunReport {
        log::info!("Run started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        let previous = self.load_previous();
        log::info!("Loaded {} previous events", previous.len());

        let ctx = AcquireContext {
            fetcher: self.fetcher.as_ref(),
            extractor: &self.extractor,
        };
        let current = self.chain.acquire(&ctx).await.into_events();

        let mut report = RunReport {
            previous: previous.len(),
            found: current.len(),
            new: 0,
            snapshot_saved: false,
            outcome: RunOutcome::NoData,
            message: None,
        };

        if current.is_empty() {
            log::warn!("No events found - possibly blocked or page changed");
            return report;
        }

        let new = diff_new_events(&current, &previous);
        log::info!("Found {} new events", new.len());
        report.new = new.len();

        report.snapshot_saved = self.save_current(&current);

        let to_notify = match self.notify_mode {
            NotifyMode::DiffOnly => new,
            NotifyMode::AlwaysAll => current,
        };
        if to_notify.is_empty() {
            log::info!("No new events found - no email sent");
            report.outcome = RunOutcome::NothingToNotify;
            return report;
        }

        let message = self
            .renderer
            .render(&to_notify, self.notify_mode, Local::now().naive_local());
        report.outcome = self.deliver(&message, to_notify.len()).await;
        report.message = Some(message);

        log::info!("Run completed");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionConfig, Target};
    use crate::testing::{FakeFetcher, MemoryStore, RecordingMailer};

    const PAGE: &str = r#"
        <div class="event-card"><h3>Live Concert: The Local Train</h3><span class="date">Sat, 19 Oct</span></div>
        <div class="event-card"><h3>Live Concert: Prateek Kuhad</h3><span class="date">Sun, 20 Oct</span></div>
        <div class="event-card"><h3>Terms &amp; Conditions</h3></div>
    "#;

    fn runner(store: &MemoryStore, fetcher: FakeFetcher, mailer: Option<&RecordingMailer>) -> Runner {
        let target = Target::default();
        let extractor = Extractor::new(ExtractionConfig::default(), target.clone()).unwrap();
        Runner::new(
            Box::new(store.clone()),
            Box::new(fetcher),
            extractor,
            StrategyChain::standard(&target),
        )
        .with_mailer(mailer.map(|m| Box::new(m.clone()) as Box<dyn Mailer>))
    }

    fn serving_page() -> FakeFetcher {
        FakeFetcher::default().with_page(&Target::default().listing_url, 200, PAGE)
    }

    #[tokio::test]
    async fn test_first_run_notifies_all_relevant_events() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();

        let report = runner(&store, serving_page(), Some(&mailer)).run().await;

        assert_eq!(report.found, 2);
        assert_eq!(report.new, 2);
        assert!(report.snapshot_saved);
        assert_eq!(report.outcome, RunOutcome::Delivered { count: 2 });
        assert_eq!(store.snapshot().len(), 2);
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "🎵 2 New Music Events in Mumbai!");
    }

    #[tokio::test]
    async fn test_second_run_has_nothing_new() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        runner(&store, serving_page(), Some(&mailer)).run().await;

        let report = runner(&store, serving_page(), Some(&mailer)).run().await;
        assert_eq!(report.new, 0);
        assert_eq!(report.outcome, RunOutcome::NothingToNotify);
        assert_eq!(store.save_count(), 2);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_always_all_notifies_full_set() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        runner(&store, serving_page(), Some(&mailer)).run().await;

        let report = runner(&store, serving_page(), Some(&mailer))
            .with_notify_mode(NotifyMode::AlwaysAll)
            .run()
            .await;
        assert_eq!(report.new, 0);
        assert_eq!(report.outcome, RunOutcome::Delivered { count: 2 });
        assert_eq!(mailer.sent().len(), 2);
        assert_eq!(mailer.sent()[1].subject, "🎵 2 Music Events in Mumbai!");
    }

    #[tokio::test]
    async fn test_no_data_keeps_previous_snapshot() {
        let store = MemoryStore::default();
        store
            .save(&[EventRecord::new("Old Show", "Mon", "", "", "")])
            .unwrap();
        let mailer = RecordingMailer::default();

        let report = runner(&store, FakeFetcher::default(), Some(&mailer)).run().await;
        assert_eq!(report.outcome, RunOutcome::NoData);
        assert_eq!(report.previous, 1);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.save_count(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_degrades_to_empty() {
        let store = MemoryStore {
            fail_load: true,
            ..MemoryStore::default()
        };
        let report = runner(&store, serving_page(), None).run().await;
        assert_eq!(report.previous, 0);
        assert_eq!(report.new, 2);
        assert_eq!(report.outcome, RunOutcome::DeliverySkipped);
    }

    #[tokio::test]
    async fn test_save_failure_still_notifies() {
        let store = MemoryStore {
            fail_save: true,
            ..MemoryStore::default()
        };
        let mailer = RecordingMailer::default();
        let report = runner(&store, serving_page(), Some(&mailer)).run().await;
        assert!(!report.snapshot_saved);
        assert_eq!(report.outcome, RunOutcome::Delivered { count: 2 });
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        };
        let report = runner(&store, serving_page(), Some(&mailer)).run().await;
        assert!(matches!(report.outcome, RunOutcome::DeliveryFailed(_)));
        assert!(report.snapshot_saved);
    }

    #[tokio::test]
    async fn test_dry_run_neither_saves_nor_sends() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        let report = runner(&store, serving_page(), Some(&mailer))
            .with_dry_run(true)
            .run()
            .await;
        assert_eq!(report.outcome, RunOutcome::DeliverySkipped);
        assert!(!report.snapshot_saved);
        assert!(store.snapshot().is_empty());
        assert!(mailer.sent().is_empty());
        let message = report.message.expect("rendered preview");
        assert!(message.text.contains("Live Concert: Prateek Kuhad"));
    }
}
