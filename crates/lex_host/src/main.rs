mod demo;
mod logger;
mod stats;
mod stress;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lex_common::mmio::MemoryMap;
use lex_io::{loader, parser};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(about = "Host tools for the Lexington HAL")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Memory-map description to run against instead of the reference chip.
    #[arg(long, global = true)]
    memory_map: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a GPIO stimulus through the mirror demo.
    Mirror {
        #[arg(short, long)]
        stimulus: String,
        #[arg(short, long, default_value_t = 16)]
        pins: usize,
    },
    /// Run the blink demo on the simulator.
    Blink {
        #[arg(long, default_value_t = 10)]
        period: u32,
        #[arg(long, default_value_t = 8)]
        toggles: u32,
        #[arg(long, default_value_t = 1)]
        latency: u64,
    },
    /// Run the millisecond tick scenario.
    Ticks {
        #[arg(long, default_value_t = 100)]
        ms: u32,
        /// Counter ticks per bus access.
        #[arg(long, default_value_t = 1)]
        latency: u64,
        /// Counter ticks between taking a trap and entering the handler.
        #[arg(long, default_value_t = 0)]
        entry_latency: u64,
    },
    /// Randomized torn-access checks over many seeds.
    Stress {
        #[arg(long, default_value_t = 64)]
        seeds: u64,
        #[arg(long, default_value_t = 50)]
        latency_max: u64,
    },
    /// Parse a memory-map description and print the resulting layout.
    Map { file: String },
    /// Generate a random GPIO stimulus file.
    Gen {
        #[arg(long, default_value = "stimulus.b8")]
        out: String,
        #[arg(long, default_value_t = 1_000)]
        frames: usize,
        #[arg(long, default_value_t = 16)]
        pins: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn generate_stimulus(out: &str, frames: usize, pins: usize, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let words: Vec<u32> = (0..frames).map(|_| rng.r#gen()).collect();
    loader::save_b8_file(out, &words, pins)?;
    println!("Wrote {frames} frames of {pins} pins to {out}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;

    let map = match &cli.memory_map {
        Some(path) => parser::load_map_file(path)?,
        None => MemoryMap::LEXINGTON,
    };
    log::info!("memory map: {map:x?}");

    match cli.command {
        Commands::Mirror { stimulus, pins } => {
            demo::run_mirror(&stimulus, pins, map)
                .with_context(|| format!("mirror demo on {stimulus}"))?;
        }
        Commands::Blink {
            period,
            toggles,
            latency,
        } => {
            demo::run_blink(period, toggles, latency, map)?;
        }
        Commands::Ticks {
            ms,
            latency,
            entry_latency,
        } => {
            demo::run_ticks(ms, latency, entry_latency, map)?;
        }
        Commands::Stress { seeds, latency_max } => {
            stress::run_stress(seeds, latency_max)?;
        }
        Commands::Map { file } => {
            let parsed = parser::load_map_file(&file)?;
            print!("{}", parser::render_map(&parsed));
        }
        Commands::Gen {
            out,
            frames,
            pins,
            seed,
        } => {
            generate_stimulus(&out, frames, pins, seed)?;
        }
    }
    Ok(())
}
