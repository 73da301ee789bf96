//! `quorum` CLI: heat maps and best meeting windows from availability rows.
//!
//! ## Usage
//!
//! ```sh
//! # Best window(s) for an event's rows (stdin → stdout)
//! cat rows.json | quorum best
//!
//! # Require three people, read limits from a config file
//! quorum best -i rows.json -c quorum.toml --min-participants 3
//!
//! # Every candidate window, best first
//! quorum rank -i rows.json
//!
//! # Heat map projected into a viewer's zone, zero-filled over a window
//! quorum heatmap -i rows.json --tz Europe/Berlin \
//!   --window-start 2026-03-16T00:00:00Z --window-end 2026-03-17T00:00:00Z
//!
//! # Run-length encode a participant's selected slots into rows
//! quorum encode --participant ana --event offsite -i slots.json
//!
//! # Convert a local slot to its canonical instant, and back
//! quorum slot --tz Asia/Tokyo --day 2026-06-02 --minutes 480
//! quorum slot --tz Asia/Tokyo --instant 2026-06-01T23:00:00Z
//! ```

mod config;

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use quorum_engine::availability::{encode_blocks, AvailabilityBlock, AvailabilitySet};
use quorum_engine::heatmap::aggregate_blocks;
use quorum_engine::{
    EventBlock, EventId, EventWindow, ParticipantId, Scheduler, SlotCodec, SlotInstant,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CliConfig, SchedulerOverrides};

#[derive(Parser)]
#[command(
    name = "quorum",
    version,
    about = "Availability heat maps and best common meeting windows"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file with [scheduler] and [display] sections
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the highest-scoring meeting window(s)
    Best(ScheduleArgs),
    /// Print every candidate meeting window, best first
    Rank(ScheduleArgs),
    /// Print per-slot availability counts
    Heatmap {
        #[command(flatten)]
        io: IoArgs,
        /// IANA zone for the local day/minutes columns (overrides [display] timezone)
        #[arg(long)]
        tz: Option<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Run-length encode a JSON array of slot instants into availability rows
    Encode {
        #[command(flatten)]
        io: IoArgs,
        #[arg(long)]
        participant: String,
        #[arg(long)]
        event: String,
    },
    /// Convert between a local (day, minutes) slot and its canonical instant
    Slot {
        /// IANA zone (overrides [display] timezone)
        #[arg(long)]
        tz: Option<String>,
        /// Local calendar day, YYYY-MM-DD
        #[arg(long, requires = "minutes", conflicts_with = "instant")]
        day: Option<NaiveDate>,
        /// Minutes from local midnight, a multiple of 30
        #[arg(long, requires = "day")]
        minutes: Option<u32>,
        /// Canonical RFC 3339 instant to project into the zone
        #[arg(long)]
        instant: Option<String>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct WindowArgs {
    /// Start of the event window (RFC 3339)
    #[arg(long, requires = "window_end")]
    window_start: Option<String>,
    /// End of the event window (RFC 3339)
    #[arg(long, requires = "window_start")]
    window_end: Option<String>,
}

#[derive(Args)]
struct ScheduleArgs {
    #[command(flatten)]
    io: IoArgs,
    #[command(flatten)]
    window: WindowArgs,
    /// Minimum participants per window
    #[arg(long)]
    min_participants: Option<usize>,
    /// Minimum window length in half-hour slots
    #[arg(long)]
    min_slots: Option<usize>,
    /// Windows grow to at most min-slots × this many slots
    #[arg(long)]
    max_multiplier: Option<usize>,
}

#[derive(Serialize)]
struct ScoredBlock<'a> {
    #[serde(flatten)]
    block: &'a EventBlock,
    score: usize,
}

#[derive(Serialize)]
struct HeatMapOutput {
    total_participants: usize,
    timezone: String,
    cells: Vec<HeatCellOutput>,
}

#[derive(Serialize)]
struct HeatCellOutput {
    slot: SlotInstant,
    local_day: NaiveDate,
    local_minutes: u32,
    available_count: usize,
    total_participants: usize,
}

#[derive(Serialize)]
struct SlotOutput {
    instant: SlotInstant,
    timezone: String,
    day: NaiveDate,
    minutes: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Best(args) => run_schedule(&config, &args, false),
        Commands::Rank(args) => run_schedule(&config, &args, true),
        Commands::Heatmap { io, tz, window } => {
            let rows = read_rows(io.input.as_deref())?;
            let window = parse_window(&window)?;
            let zone = tz.unwrap_or_else(|| config.display.timezone.clone());
            let codec = SlotCodec::from_iana(&zone).context("Failed to load display timezone")?;

            let map = aggregate_blocks(&rows, window.as_ref());
            let cells = match &window {
                Some(window) => map.grid(window),
                None => map.cells().copied().collect(),
            };
            info!(
                participants = map.total_participants(),
                cells = cells.len(),
                "computed heat map"
            );

            let output = HeatMapOutput {
                total_participants: map.total_participants(),
                timezone: zone,
                cells: cells
                    .into_iter()
                    .map(|cell| {
                        let local = codec.from_instant(cell.slot);
                        HeatCellOutput {
                            slot: cell.slot,
                            local_day: local.day,
                            local_minutes: local.minutes,
                            available_count: cell.available_count,
                            total_participants: cell.total_participants,
                        }
                    })
                    .collect(),
            };
            write_json(io.output.as_deref(), &output)
        }
        Commands::Encode {
            io,
            participant,
            event,
        } => {
            let raw = read_input(io.input.as_deref())?;
            let instants: Vec<DateTime<Utc>> =
                serde_json::from_str(&raw).context("Failed to parse slot instants JSON")?;
            let set: AvailabilitySet = instants
                .into_iter()
                .filter_map(|instant| match SlotInstant::new(instant) {
                    Ok(slot) => Some(slot),
                    Err(err) => {
                        warn!(error = %err, "skipping slot");
                        None
                    }
                })
                .collect();

            let blocks = encode_blocks(
                &ParticipantId::new(participant),
                &EventId::new(event),
                &set,
            );
            debug!(slots = set.len(), blocks = blocks.len(), "encoded availability");
            write_json(io.output.as_deref(), &blocks)
        }
        Commands::Slot {
            tz,
            day,
            minutes,
            instant,
        } => {
            let zone = tz.unwrap_or_else(|| config.display.timezone.clone());
            let codec = SlotCodec::from_iana(&zone).context("Failed to load timezone")?;
            let slot = match (day, minutes, instant) {
                (Some(day), Some(minutes), None) => codec
                    .to_instant(day, minutes)
                    .context("Failed to convert local slot")?,
                (None, None, Some(instant)) => {
                    SlotInstant::new(parse_instant(&instant)?).context("Invalid slot instant")?
                }
                _ => bail!("Provide either --day and --minutes, or --instant"),
            };
            let local = codec.from_instant(slot);
            let output = SlotOutput {
                instant: slot,
                timezone: zone,
                day: local.day,
                minutes: local.minutes,
            };
            write_json(None, &output)
        }
    }
}

fn run_schedule(config: &CliConfig, args: &ScheduleArgs, all: bool) -> Result<()> {
    let scheduler_config = config.scheduler_config(SchedulerOverrides {
        min_participants: args.min_participants,
        min_block_slots: args.min_slots,
        max_block_multiplier: args.max_multiplier,
    })?;
    let scheduler = Scheduler::new(scheduler_config)?;
    let rows = read_rows(args.io.input.as_deref())?;
    let window = parse_window(&args.window)?;

    let windows = match (&window, all) {
        (Some(window), false) => scheduler.find_best_windows_within(&rows, window),
        (None, false) => scheduler.find_best_windows(&rows),
        (Some(window), true) => scheduler.ranked_windows_within(&rows, window),
        (None, true) => scheduler.ranked_windows(&rows),
    };

    info!(
        rows = rows.len(),
        windows = windows.len(),
        best_score = windows.first().map(EventBlock::score).unwrap_or(0),
        "scheduled"
    );
    if windows.is_empty() {
        info!("not enough overlap for a suggestion yet");
    }

    let scored: Vec<ScoredBlock<'_>> = windows
        .iter()
        .map(|block| ScoredBlock {
            block,
            score: block.score(),
        })
        .collect();
    write_json(args.io.output.as_deref(), &scored)
}

fn init_logger(verbose: bool) {
    let default = if verbose {
        "quorum=debug,quorum_engine=debug"
    } else {
        "quorum=info,quorum_engine=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 instant: {}", raw))
}

fn parse_window(args: &WindowArgs) -> Result<Option<EventWindow>> {
    match (&args.window_start, &args.window_end) {
        (Some(start), Some(end)) => {
            let window = EventWindow::new(parse_instant(start)?, parse_instant(end)?)
                .context("Invalid event window")?;
            Ok(Some(window))
        }
        _ => Ok(None),
    }
}

fn read_rows(path: Option<&str>) -> Result<Vec<AvailabilityBlock>> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Failed to parse availability rows JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: Option<&str>, value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match path {
        Some(path) => {
            std::fs::write(path, pretty + "\n")
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", pretty);
        }
    }
    Ok(())
}
