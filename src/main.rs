//! Marble Race headless runner
//!
//! Runs one race to completion at a simulated host frame rate and prints
//! the standings.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use marble_race::consts::*;
use marble_race::sim::{Race, RaceEvent, RaceMode, RacePhase};
use marble_race::{LogFeedback, Placement, QualityPreset, RaceSettings};

#[derive(Parser, Debug)]
#[command(name = "marble-race")]
#[command(about = "Drop named marbles through a random course and see who wins")]
struct Cli {
    /// Participant names (at least two)
    #[arg(required = true)]
    names: Vec<String>,
    /// Stop at the first finisher or rank everyone
    #[arg(long, value_enum)]
    mode: Option<CliMode>,
    /// Start in the mixer drum or on a staggered grid
    #[arg(long, value_enum)]
    placement: Option<CliPlacement>,
    /// Spark particle budget
    #[arg(long, value_enum)]
    quality: Option<CliQuality>,
    /// Seed for a reproducible race
    #[arg(long)]
    seed: Option<u64>,
    /// Settings JSON file; command-line flags override it
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Simulated host frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f32,
    /// Give up after this many host frames
    #[arg(long, default_value_t = 36_000)]
    max_frames: u32,
    /// Print the result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliMode {
    First,
    Ranked,
}

impl From<CliMode> for RaceMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::First => RaceMode::First,
            CliMode::Ranked => RaceMode::Ranked,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliPlacement {
    Mixer,
    Staggered,
}

impl From<CliPlacement> for Placement {
    fn from(value: CliPlacement) -> Self {
        match value {
            CliPlacement::Mixer => Placement::Mixer,
            CliPlacement::Staggered => Placement::Staggered,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliQuality {
    Low,
    Medium,
    High,
}

impl From<CliQuality> for QualityPreset {
    fn from(value: CliQuality) -> Self {
        match value {
            CliQuality::Low => QualityPreset::Low,
            CliQuality::Medium => QualityPreset::Medium,
            CliQuality::High => QualityPreset::High,
        }
    }
}

#[derive(Debug, Serialize)]
struct Standing {
    label: String,
    rank: Option<u32>,
    y: f32,
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: RaceMode,
    seed: Option<u64>,
    completed: bool,
    clock_ms: f32,
    ticks: u64,
    rescues: usize,
    teleports: usize,
    standings: Vec<Standing>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(anyhow!("--fps must be a positive number, got {}", cli.fps));
    }

    let mut settings = match &cli.settings {
        Some(path) => RaceSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RaceSettings::default(),
    };
    if let Some(mode) = cli.mode {
        settings.mode = mode.into();
    }
    if let Some(placement) = cli.placement {
        settings.placement = placement.into();
    }
    if let Some(quality) = cli.quality {
        settings.quality = quality.into();
    }

    let mut race = match cli.seed {
        Some(seed) => Race::with_seed(settings, seed),
        None => Race::new(settings),
    };
    race.set_feedback(Box::new(LogFeedback));
    race.start_race(&cli.names).context("starting race")?;

    let frame_dt = 1000.0 / cli.fps;
    let mut accumulator = 0.0_f32;
    let mut ticks = 0_u64;
    let mut rescues = 0;
    let mut teleports = 0;

    'frames: for _ in 0..cli.max_frames {
        // Host frame; drop time we cannot catch up on
        accumulator += frame_dt;
        let mut steps = 0;
        while accumulator >= FRAME_MS && steps < MAX_FRAMES_PER_UPDATE {
            let result = race.tick(FRAME_MS);
            accumulator -= FRAME_MS;
            steps += 1;
            ticks += 1;

            for event in &result.events {
                match event {
                    RaceEvent::Rescued { .. } => rescues += 1,
                    RaceEvent::Teleported { .. } => teleports += 1,
                    _ => {}
                }
            }
            if race.phase() == RacePhase::Finished {
                break 'frames;
            }
        }
        if steps == MAX_FRAMES_PER_UPDATE {
            accumulator = accumulator.min(FRAME_MS);
        }
    }

    let completed = race.phase() == RacePhase::Finished;
    if !completed {
        log::warn!("Race did not finish within {} frames", cli.max_frames);
    }

    let summary = Summary {
        mode: race.mode(),
        seed: cli.seed,
        completed,
        clock_ms: race.clock_ms(),
        ticks,
        rescues,
        teleports,
        standings: race
            .standings()
            .into_iter()
            .map(|b| Standing {
                label: b.label.clone(),
                rank: b.rank(),
                y: b.pos.y,
            })
            .collect(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!(
        "{} race, {:.1}s ({} ticks, {} rescues, {} teleports)",
        summary.mode.as_str(),
        summary.clock_ms / 1000.0,
        summary.ticks,
        summary.rescues,
        summary.teleports
    );
    for standing in &summary.standings {
        match standing.rank {
            Some(rank) => println!("{rank:>4}. {}", standing.label),
            None => println!("   -  {} (y={:.0})", standing.label, standing.y),
        }
    }
    if !summary.completed {
        println!("(race incomplete)");
    }
}
