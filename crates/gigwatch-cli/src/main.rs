use std::fs;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use gigwatch::config::{DEFAULT_SNAPSHOT_PATH, ExtractionConfig, FetchConfig, MailConfig, Target};
use gigwatch::notify::{Mailer, Renderer, SmtpMailer};
use gigwatch::parser::{Extractor, Payload};
use gigwatch::store::{JsonSnapshotStore, SnapshotStore};
use gigwatch::strategy::{AcquireContext, ChainOutcome, StrategyChain};
use gigwatch::types::{EventRecord, NotifyMode};
use gigwatch::utils::EventStats;
use gigwatch::{Runner, WebScraper};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "gigwatch")]
#[command(about = "Watches a music event listing and emails new events", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Skip the randomized pause before each request"
    )]
    no_delay: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing, diff against the last snapshot, save it and email new events
    Run {
        #[arg(
            long,
            value_name = "PATH",
            default_value = DEFAULT_SNAPSHOT_PATH,
            help = "Snapshot file holding the previous run's events"
        )]
        snapshot: PathBuf,

        #[arg(
            long,
            default_value = "diff_only",
            value_parser = parse_notify_mode,
            help = "Which events to email: 'diff_only' or 'always_all'"
        )]
        notify_mode: NotifyMode,

        #[arg(long, help = "Render the email but neither send it nor write the snapshot")]
        dry_run: bool,
    },
    /// Run the acquisition strategies and print the events found
    Fetch {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Extract events from a saved page or API response
    Extract {
        #[arg(help = "HTML, JSON or text file to extract events from")]
        file: PathBuf,

        #[arg(long, default_value = "file", help = "Source label attached to each event")]
        source: String,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Print the events stored by the last run
    Snapshot {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_SNAPSHOT_PATH)]
        snapshot: PathBuf,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Render the notification for the stored events without sending it
    Preview {
        #[arg(long, value_name = "PATH", default_value = DEFAULT_SNAPSHOT_PATH)]
        snapshot: PathBuf,

        #[arg(long, help = "Print the HTML body instead of the plain text one")]
        html: bool,
    },
}

fn parse_notify_mode(s: &str) -> Result<NotifyMode, String> {
    NotifyMode::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn print_events(events: &[EventRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => serialize_json(&events),
        OutputFormat::Text => {
            if events.is_empty() {
                println!("No events to display.");
            } else {
                for (i, event) in events.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, event);
                }
                print!("{}", EventStats::from_events(events));
            }
        }
    }
}

fn build_extractor(target: &Target) -> Extractor {
    Extractor::new(ExtractionConfig::default(), target.clone()).unwrap_or_else(|e| {
        log::error!("Invalid extraction config: {}", e);
        process::exit(1);
    })
}

fn build_scraper(no_delay: bool) -> WebScraper {
    let config = if no_delay {
        FetchConfig::default().without_delay()
    } else {
        FetchConfig::default()
    };
    WebScraper::new(config).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    })
}

fn build_mailer() -> Option<Box<dyn Mailer>> {
    let config = MailConfig::from_env()?;
    match SmtpMailer::new(&config) {
        Ok(mailer) => Some(Box::new(mailer) as Box<dyn Mailer>),
        Err(e) => {
            log::error!("Invalid mail configuration: {}", e);
            None
        }
    }
}

fn load_snapshot(path: PathBuf) -> Vec<EventRecord> {
    let store = JsonSnapshotStore::new(path);
    store.load().unwrap_or_else(|e| {
        log::error!("Error loading snapshot: {}", e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        log::debug!("No .env loaded: {}", e);
    }

    let target = Target::default();

    match cli.command {
        Commands::Run {
            snapshot,
            notify_mode,
            dry_run,
        } => {
            log::info!("Watching {} (notify mode: {})", target.listing_url, notify_mode);

            let runner = Runner::new(
                Box::new(JsonSnapshotStore::new(snapshot)),
                Box::new(build_scraper(cli.no_delay)),
                build_extractor(&target),
                StrategyChain::standard(&target),
            )
            .with_mailer(build_mailer())
            .with_notify_mode(notify_mode)
            .with_dry_run(dry_run);

            let report = runner.run().await;
            if dry_run && let Some(message) = &report.message {
                println!("Subject: {}\n\n{}", message.subject, message.text);
            }
            print!("{}", report);
        }

        Commands::Fetch { format } => {
            let scraper = build_scraper(cli.no_delay);
            let extractor = build_extractor(&target);
            let ctx = AcquireContext {
                fetcher: &scraper,
                extractor: &extractor,
            };

            match StrategyChain::standard(&target).acquire(&ctx).await {
                ChainOutcome::Found { source, events } => {
                    log::info!("Events obtained via {}", source);
                    print_events(&events, format);
                }
                ChainOutcome::Exhausted => {
                    log::warn!("No events found - possibly blocked or page changed");
                    print_events(&[], format);
                }
            }
        }

        Commands::Extract {
            file,
            source,
            format,
        } => {
            let body = fs::read_to_string(&file).unwrap_or_else(|e| {
                log::error!("Error reading {}: {}", file.display(), e);
                process::exit(1);
            });
            let extractor = build_extractor(&target);
            let events = extractor.extract(&Payload::sniff(&body), &source);
            print_events(&events, format);
        }

        Commands::Snapshot { snapshot, format } => {
            let events = load_snapshot(snapshot);
            print_events(&events, format);
        }

        Commands::Preview { snapshot, html } => {
            let events = load_snapshot(snapshot);
            if events.is_empty() {
                println!("Snapshot is empty, nothing to preview.");
                return;
            }
            let message = Renderer::new(&target).render(
                &events,
                NotifyMode::AlwaysAll,
                Local::now().naive_local(),
            );
            println!("Subject: {}\n", message.subject);
            if html {
                println!("{}", message.html);
            } else {
                println!("{}", message.text);
            }
        }
    }
}
