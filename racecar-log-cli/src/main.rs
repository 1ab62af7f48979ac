//! Racecar Log CLI Application
//!
//! Command-line front end for the racecar-log-decoder library:
//! - Decodes one or more CSV CAN logs in parallel
//! - Prints a per-log channel summary
//! - Exports a decoded log as JSON

use anyhow::{bail, Context, Result};
use clap::Parser;
use racecar_log_decoder::{DecodedLog, Decoder, MaterializedDataset};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::AppConfig;
use report::ChannelSelection;

/// Racecar Log Reader - Decode racecar CAN logs into time series
#[derive(Parser, Debug)]
#[command(name = "racecar-log-cli")]
#[command(about = "Decode racecar CAN logs (CSV) into engineering-unit channels", long_about = None)]
#[command(version)]
struct Args {
    /// Path to CSV log file to decode (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    log: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the decoded channels as JSON (single log only)
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Only summarize these channels or groups (can be repeated)
    #[arg(long, value_name = "NAME")]
    channel: Vec<String>,

    /// Maximum number of frames to decode per log
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,

    /// Debounce interval for gyro messages in milliseconds
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Treat the first line of each log as data instead of a header
    #[arg(long)]
    no_header: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

/// Shape of the JSON export
#[derive(Serialize)]
struct JsonExport<'a> {
    source: &'a Path,
    stats: &'a racecar_log_decoder::DecodeStats,
    channels: &'a MaterializedDataset,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Racecar Log CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", racecar_log_decoder::VERSION);

    if args.log.is_empty() {
        println!("Racecar Log Reader - No input specified");
        println!("\nQuick Start:");
        println!("  racecar-log-cli --log endurance.csv");
        println!("  racecar-log-cli --log run1.csv --log run2.csv --channel Speed");
        println!("  racecar-log-cli --log endurance.csv --json endurance.json");
        println!("\nUse --help for more options");
        return Ok(());
    }

    let app_config = resolve_config(&args)?;
    let json_path = args.json.clone().or(app_config.output.json.clone());
    if json_path.is_some() && args.log.len() > 1 {
        bail!("--json can only be used with a single --log");
    }

    let decoder = Decoder::with_config(app_config.decoder.clone())
        .context("Invalid decoder configuration")?;
    let selection = ChannelSelection::from_names(if args.channel.is_empty() {
        &app_config.output.channels
    } else {
        &args.channel
    });

    // Each log is independent, so decode them side by side
    let results: Vec<(PathBuf, Result<DecodedLog>)> = args
        .log
        .par_iter()
        .map(|path| {
            let decoded = decoder
                .decode_file(path)
                .with_context(|| format!("Failed to decode {:?}", path));
            (path.clone(), decoded)
        })
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for (path, result) in results {
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                log::error!("{:#}", e);
                failures += 1;
                continue;
            }
        };

        let stats = decoded.stats;
        let data = decoded.dataset.materialize();
        if !args.quiet {
            report::write_summary(&mut out, &path, &stats, &data, &selection)?;
            writeln!(out)?;
        }

        if let Some(json_path) = &json_path {
            export_json(json_path, &path, &stats, &data)?;
            log::info!("Wrote JSON export to {:?}", json_path);
        }
    }

    if failures > 0 {
        bail!("{} of {} logs failed to decode", failures, args.log.len());
    }

    Ok(())
}

/// Merge the optional config file with command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(max_frames) = args.max_frames {
        app_config.decoder.max_frames = Some(max_frames);
    }
    if let Some(debounce_ms) = args.debounce_ms {
        app_config.decoder.debounce_ms = debounce_ms;
    }
    if args.no_header {
        app_config.decoder.skip_header = false;
    }

    log::debug!("Decoder settings: {:?}", app_config.decoder);
    Ok(app_config)
}

fn export_json(
    json_path: &Path,
    source: &Path,
    stats: &racecar_log_decoder::DecodeStats,
    data: &MaterializedDataset,
) -> Result<()> {
    let file = File::create(json_path)
        .with_context(|| format!("Failed to create JSON output: {:?}", json_path))?;
    let mut writer = BufWriter::new(file);
    let export = JsonExport {
        source,
        stats,
        channels: data,
    };
    serde_json::to_writer_pretty(&mut writer, &export)
        .with_context(|| format!("Failed to write JSON output: {:?}", json_path))?;
    writer.flush()?;
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
