//! blipreco command-line interface.
//!
//! Reconstructs blips from JSON-lines event files.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use blipreco_algorithms::BlipReco;
use blipreco_core::{
    CalibrationConstants, DetectorGeometry, Event, ReconstructionStatistics, RunningSummary,
    UniformFieldDistortion, WirePlaneGeometry,
};
use blipreco_io::{BlipFileWriter, DetectorDescription, EventReader, EventRecord, OutputFormat};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

type Session = BlipReco<WirePlaneGeometry, CalibrationConstants, Option<UniformFieldDistortion>>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    BlipIo(#[from] blipreco_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] blipreco_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Output file format selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// One row per blip
    Csv,
    /// One JSON record per event
    Jsonl,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Blip reconstruction for liquid-argon TPC events.
#[derive(Parser)]
#[command(name = "blipreco")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct blips from JSON-lines event files
    Process {
        /// Input event file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Detector description (JSON); the reference detector if omitted
        #[arg(short, long)]
        detector: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Write run statistics as JSON to this path
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,

        /// Events handed to the workers at a time
        #[arg(long, default_value = "256")]
        batch_size: usize,
    },

    /// Show information about an event file
    Info {
        /// Input event file
        input: PathBuf,
    },

    /// Print the reconstruction configuration
    Config {
        /// Detector description (JSON); the reference detector if omitted
        #[arg(short, long)]
        detector: Option<PathBuf>,

        /// Write the full description as JSON to this path
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Process {
            input,
            output,
            detector,
            format,
            stats,
            threads,
            batch_size,
        } => {
            let description = load_detector(detector.as_deref())?;
            let session: Session = BlipReco::new(
                description.reco,
                description.geometry,
                description.calibration,
                description.field_distortion,
            )?;
            let plane_count = session.geometry().plane_count();
            debug!("{}", session.config());

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            info!(
                "Processing {} file(s) on {} thread(s)",
                input.len(),
                pool.current_num_threads()
            );

            let start = Instant::now();
            let mut writer = BlipFileWriter::create(&output, format.into(), plane_count)?;
            let mut totals = ReconstructionStatistics::new(plane_count);
            let batch_size = batch_size.max(1);

            for path in &input {
                debug!("Reading: {}", path.display());
                let mut reader = EventReader::open(path)?;
                let mut file_blips = 0usize;

                loop {
                    let batch = reader
                        .by_ref()
                        .take(batch_size)
                        .collect::<blipreco_io::Result<Vec<Event>>>()?;
                    if batch.is_empty() {
                        break;
                    }

                    let results = pool.install(|| reconstruct_batch(&session, &batch))?;
                    for (record, statistics) in &results {
                        file_blips += record.blips.len();
                        writer.write_event(record)?;
                        totals.merge(statistics);
                    }
                }

                debug!(
                    "  {} lines read, {} blips reconstructed",
                    reader.line(),
                    file_blips
                );
            }
            writer.flush()?;

            if let Some(path) = &stats {
                blipreco_io::write_statistics(path, &totals)?;
                info!("Statistics written to {}", path.display());
            }

            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                start.elapsed().as_secs_f64()
            );
            print_summary(&totals);
        }

        Commands::Info { input } => {
            let mut events = 0usize;
            let mut simulated = 0usize;
            let mut hits = RunningSummary::default();
            let mut tracks = 0usize;
            let mut true_blips = 0usize;
            let mut planes: Vec<usize> = Vec::new();

            for event in EventReader::open(&input)? {
                let event = event?;
                events += 1;
                if event.is_simulated() {
                    simulated += 1;
                }
                hits.fill(event.hits.len() as f64);
                tracks += event.tracks.len();
                true_blips += event.true_blips.len();
                for hit in &event.hits {
                    let plane = hit.wire.plane;
                    if plane >= planes.len() {
                        planes.resize(plane + 1, 0);
                    }
                    planes[plane] += 1;
                }
            }

            println!("File: {}", input.display());
            println!("Events: {} ({} simulated)", events, simulated);
            if let Some(mean) = hits.mean() {
                println!(
                    "Hits per event: {:.1} (min {}, max {})",
                    mean, hits.min, hits.max
                );
            }
            for (plane, count) in planes.iter().enumerate() {
                println!("  Plane {}: {} hits", plane, count);
            }
            println!("Tracks: {}", tracks);
            println!("True depositions: {}", true_blips);
        }

        Commands::Config { detector, dump } => {
            let description = load_detector(detector.as_deref())?;
            println!("{}", description.reco);
            println!(
                "Detector: {} plane(s), {} segment(s)",
                description.geometry.plane_count(),
                description.geometry.segment_count()
            );
            if let Some(path) = &dump {
                description.to_file(path)?;
                println!("Description written to {}", path.display());
            }
        }
    }

    Ok(())
}

fn load_detector(path: Option<&Path>) -> Result<DetectorDescription> {
    match path {
        Some(path) => {
            debug!("Loading detector description: {}", path.display());
            Ok(DetectorDescription::from_file(path)?)
        }
        None => Ok(DetectorDescription::default()),
    }
}

/// Reconstructs `events` in parallel, one session clone per worker.
///
/// Results come back in input order.
fn reconstruct_batch(
    session: &Session,
    events: &[Event],
) -> Result<Vec<(EventRecord, ReconstructionStatistics)>> {
    events
        .par_iter()
        .map_init(
            || session.clone(),
            |session, event| {
                session.run(event)?;
                let record = EventRecord {
                    run: event.run,
                    event: event.event,
                    blips: session.take_blips(),
                };
                Ok::<_, CliError>((record, session.statistics().clone()))
            },
        )
        .collect()
}

fn print_summary(stats: &ReconstructionStatistics) {
    let per_event = |count: usize| {
        if stats.events == 0 {
            0.0
        } else {
            count as f64 / stats.events as f64
        }
    };

    println!("Events:                 {}", stats.events);
    println!("Hits processed:         {}", stats.hits_processed);
    println!("  on long tracks:       {}", stats.hits_rejected_track);
    println!("  failing quality cuts: {}", stats.hits_rejected_quality);
    println!(
        "Clusters:               {} ({} rejected by size)",
        stats.clusters_formed, stats.clusters_rejected_size
    );
    println!("Cross-plane groups:     {}", stats.groups_formed);
    println!("  invalid geometry:     {}", stats.groups_invalid_geometry);
    println!("  rejected (picky):     {}", stats.groups_rejected_picky);
    println!("  track cylinder veto:  {}", stats.blips_vetoed_cylinder);
    println!("  calibration failures: {}", stats.calibration_failures);
    println!(
        "Blips:                  {} ({:.2} per event)",
        stats.blips_reconstructed,
        per_event(stats.blips_reconstructed)
    );
    println!("  picky:                {}", stats.picky_blips);
    println!("  with truth:           {}", stats.blips_with_truth);

    for (plane, summary) in stats.planes.iter().enumerate() {
        if let (Some(overlap), Some(score)) =
            (summary.best_overlap.mean(), summary.best_score.mean())
        {
            println!(
                "Plane {}: mean best overlap {:.3}, mean best score {:.3}",
                plane, overlap, score
            );
        }
    }
}
