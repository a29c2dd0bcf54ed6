use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use facesecure_core::attendance::domain::attendance_event::AttendanceEvent;
use facesecure_core::attendance::domain::attendance_ledger::AttendanceLedger;
use facesecure_core::attendance::infrastructure::csv_ledger_file::CsvLedgerFile;
use facesecure_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facesecure_core::detection::infrastructure::histogram_classifier::HistogramClassifier;
use facesecure_core::detection::infrastructure::replay_face_locator::ReplayFaceLocator;
use facesecure_core::identity::domain::identity_store::{IdentityStore, LoadOutcome};
use facesecure_core::identity::infrastructure::json_model_file::JsonModelFile;
use facesecure_core::notification::domain::notifier::Notifier;
use facesecure_core::notification::infrastructure::log_notifier::LogNotifier;
use facesecure_core::notification::infrastructure::speech_notifier::SpeechNotifier;
use facesecure_core::pipeline::recognition_orchestrator::{RecognitionOrchestrator, TickOutcome};
use facesecure_core::pipeline::stats_sink::LogStatsSink;
use facesecure_core::shared::clock::{Clock, SystemClock};
use facesecure_core::shared::config::AppConfig;

/// Face recognition attendance tracking.
#[derive(Parser)]
#[command(name = "facesecure")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the ledger and the trained model.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll a new person from a directory of frames.
    Enroll {
        /// Display name of the person.
        name: String,

        #[command(flatten)]
        feed: Feed,

        /// Samples to collect (overrides the config).
        #[arg(long)]
        samples: Option<usize>,

        /// Minimum pause between accepted samples in milliseconds.
        #[arg(long)]
        sample_interval_ms: Option<u64>,
    },
    /// Recognize faces in a directory of frames and record attendance.
    Recognize {
        #[command(flatten)]
        feed: Feed,

        /// Log greetings instead of speaking them.
        #[arg(long)]
        no_voice: bool,
    },
    /// Print attendance records.
    List {
        /// Only names containing this text (case-insensitive).
        #[arg(long)]
        search: Option<String>,

        /// Only records from this day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,
    },
    /// Write all attendance records to a CSV file.
    Export {
        /// Destination file.
        output: PathBuf,
    },
    /// Delete every attendance record.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Print enrolled identities.
    Identities,
}

#[derive(clap::Args)]
struct Feed {
    /// Directory of image frames, read in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// JSON file with face boxes per frame index.
    #[arg(long)]
    faces: PathBuf,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Command::Enroll {
            name,
            feed,
            samples,
            sample_interval_ms,
        } => {
            if let Some(samples) = samples {
                config.samples_per_enrollment = samples;
            }
            if let Some(ms) = sample_interval_ms {
                config.sample_interval_ms = ms;
            }
            config.validate()?;
            run_enroll(&config, &name, &feed)
        }
        Command::Recognize { feed, no_voice } => {
            if no_voice {
                config.voice.enabled = false;
            }
            run_recognize(&config, &feed)
        }
        Command::List { search, date } => run_list(&config, search.as_deref(), date.as_deref()),
        Command::Export { output } => run_export(&config, &output),
        Command::Clear { yes } => run_clear(&config, yes),
        Command::Identities => run_identities(&config),
    }
}

fn run_enroll(config: &AppConfig, name: &str, feed: &Feed) -> Result<(), Box<dyn std::error::Error>> {
    // enrollment never greets anyone
    let mut orchestrator = build_orchestrator(config, feed, Box::new(LogNotifier))?;
    orchestrator.load_model();
    orchestrator.register(name)?;

    loop {
        match orchestrator.tick() {
            TickOutcome::Enrolled {
                name,
                label,
                persisted,
            } => {
                if !persisted {
                    return Err(format!("{name} enrolled but the model could not be saved").into());
                }
                log::info!(
                    "Enrolled {name} as label {label}, model saved to {}",
                    config.model_path().display()
                );
                return Ok(());
            }
            TickOutcome::EnrollmentFailed { name, reason } => {
                return Err(format!("Enrollment of {name} failed: {reason}").into());
            }
            TickOutcome::NoFrame => {
                let (captured, target) = orchestrator.enrollment_progress().unwrap_or((0, 0));
                orchestrator.cancel_enrollment();
                return Err(format!(
                    "Ran out of frames after {captured}/{target} samples; \
                     provide more frames with exactly one face"
                )
                .into());
            }
            _ => std::thread::sleep(config.tick_interval()),
        }
    }
}

fn run_recognize(config: &AppConfig, feed: &Feed) -> Result<(), Box<dyn std::error::Error>> {
    let notifier: Box<dyn Notifier> = if config.voice.enabled {
        Box::new(SpeechNotifier::new(config.voice.clone()))
    } else {
        Box::new(LogNotifier)
    };
    let mut orchestrator = build_orchestrator(config, feed, notifier)?;

    if orchestrator.load_model() == LoadOutcome::NotFound {
        log::warn!("No enrolled identities; every face will be Unknown");
    }
    orchestrator.start()?;

    let (frames, unreadable) = drain_feed(&mut orchestrator, config.tick_interval());

    let stats = orchestrator.stats();
    orchestrator.stop();
    if unreadable > 0 {
        log::warn!("Skipped {unreadable} unreadable frames");
    }
    log::info!("Processed {frames} frames");
    log::info!(
        "Recognitions: {}, detections: {}, success rate: {:.1}%",
        stats.successful_recognitions,
        stats.total_detections,
        stats.success_rate()
    );
    Ok(())
}

/// Ticks until the feed runs out. Returns processed and unreadable frame counts.
fn drain_feed(orchestrator: &mut RecognitionOrchestrator, interval: Duration) -> (usize, usize) {
    let (mut frames, mut unreadable) = (0, 0);
    loop {
        match orchestrator.tick() {
            TickOutcome::NoFrame | TickOutcome::Idle => break,
            TickOutcome::FrameError => unreadable += 1,
            _ => frames += 1,
        }
        std::thread::sleep(interval);
    }
    (frames, unreadable)
}

fn run_list(
    config: &AppConfig,
    search: Option<&str>,
    date: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = open_ledger(config)?;
    let events = match (search, date) {
        (Some(term), Some(date)) => {
            let mut found = ledger.search(term);
            found.retain(|e| e.date == date);
            found
        }
        (Some(term), None) => ledger.search(term),
        (None, Some(date)) => ledger.on_date(date),
        (None, None) => ledger.snapshot(),
    };

    print_events(&events);
    log::info!("{} of {} records", events.len(), ledger.len());
    Ok(())
}

fn run_export(config: &AppConfig, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = open_ledger(config)?;
    ledger.export_file(output)?;
    log::info!("Exported {} records to {}", ledger.len(), output.display());
    Ok(())
}

fn run_clear(config: &AppConfig, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("Refusing to delete all records without --yes".into());
    }
    let ledger = open_ledger(config)?;
    let removed = ledger.len();
    ledger.clear()?;
    log::info!("Removed {removed} records");
    Ok(())
}

fn run_identities(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = IdentityStore::new(Box::new(HistogramClassifier::new()));
    if store.load(&JsonModelFile::new(config.model_path())) == LoadOutcome::NotFound {
        log::info!("No model at {}", config.model_path().display());
        return Ok(());
    }
    for identity in store.identities() {
        println!("{:>4}  {}", identity.label, identity.display_name);
    }
    Ok(())
}

fn build_orchestrator(
    config: &AppConfig,
    feed: &Feed,
    notifier: Box<dyn Notifier>,
) -> Result<RecognitionOrchestrator, Box<dyn std::error::Error>> {
    if !feed.frames.is_dir() {
        return Err(format!("Frame directory not found: {}", feed.frames.display()).into());
    }
    let locator = ReplayFaceLocator::from_json_file(&feed.faces)?;
    log::info!("Loaded face boxes for {} frames", locator.frames_with_faces());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = Arc::new(AttendanceLedger::open(
        Box::new(CsvLedgerFile::new(config.ledger_path())),
        clock.clone(),
    )?);

    let orchestrator = RecognitionOrchestrator::new(
        Box::new(ImageSequenceSource::new(&feed.frames)),
        Box::new(locator),
        IdentityStore::new(Box::new(HistogramClassifier::new())),
        Box::new(JsonModelFile::new(config.model_path())),
        ledger,
        notifier,
        Box::new(LogStatsSink::default()),
        clock,
    )
    .with_enrollment_settings(config.samples_per_enrollment, config.sample_interval());
    Ok(orchestrator)
}

fn open_ledger(config: &AppConfig) -> Result<AttendanceLedger, Box<dyn std::error::Error>> {
    let ledger = AttendanceLedger::open(
        Box::new(CsvLedgerFile::new(config.ledger_path())),
        Arc::new(SystemClock),
    )?;
    Ok(ledger)
}

fn print_events(events: &[AttendanceEvent]) {
    let width = events
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    println!("{:width$}  {:10}  {:8}", "Name", "Date", "Time");
    for event in events {
        println!("{:width$}  {:10}  {:8}", event.name, event.date, event.time);
    }
}
