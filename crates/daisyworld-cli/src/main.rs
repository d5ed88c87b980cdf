use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daisyworld_core::sweep::{sweep_luminosity, DEFAULT_LUMINOSITIES};
use daisyworld_core::{AgentType, World, WorldConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::Level;

const WARMUP_STEPS: usize = 10;

#[derive(Parser)]
#[command(name = "daisyworld")]
#[command(about = "Daisyworld feedback simulation CLI")]
struct Cli {
    /// Log every step at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 200)]
        steps: usize,

        /// Sample metrics every N steps
        #[arg(long, default_value_t = 1)]
        sample_every: usize,

        /// Write the run summary JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run one world per solar luminosity in parallel
    Sweep {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Luminosity to simulate; repeat for several (default: 0.6 0.8 1.0 1.4)
        #[arg(long = "luminosity")]
        luminosities: Vec<f64>,

        #[arg(long, default_value_t = 200)]
        steps: usize,
    },
    /// Measure average step time on the default world
    Benchmark {
        #[arg(long, default_value_t = 200)]
        steps: usize,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: Option<&Path>) -> Result<WorldConfig> {
    let Some(path) = path else {
        return Ok(WorldConfig::default());
    };
    let file = File::open(path).context("failed to open config file")?;
    let config: WorldConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn status_line(world: &World) -> String {
    format!(
        "White Daisy: {}, Black Daisy: {}, World Temperature: {:.2}",
        world.type_count(AgentType::WhiteDaisy),
        world.type_count(AgentType::BlackDaisy),
        world.mean_temperature()
    )
}

fn run_benchmark(steps: usize) -> Result<()> {
    let config = WorldConfig::default();
    let cells = config.cell_count();
    let mut world = World::try_new(config).context("failed to initialize world")?;
    world.run(WARMUP_STEPS)?;

    let mut total_activation = 0u64;
    let mut total_aggregate = 0u64;
    let mut total_time = 0u64;
    for _ in 0..steps {
        let timings = world.step()?;
        total_activation += timings.activation_us;
        total_aggregate += timings.aggregate_us;
        total_time += timings.total_us;
    }

    let denom = steps.max(1) as f64;
    let avg_step_us = total_time as f64 / denom;
    println!("--- {cells} cells, {steps} steps ---");
    println!(
        "  Avg step:      {avg_step_us:.0} us ({:.1} steps/sec)",
        1_000_000.0 / avg_step_us.max(1.0)
    );
    println!(
        "  Breakdown:     activation={:.0} us, aggregate={:.0} us",
        total_activation as f64 / denom,
        total_aggregate as f64 / denom,
    );
    println!("  Final:         {}", status_line(&world));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::DumpDefaultConfig => {
            println!("{}", WorldConfig::default().to_json_pretty()?);
        }
        Commands::Benchmark { steps } => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p daisyworld-cli --release -- benchmark");
                eprintln!();
            }
            run_benchmark(steps)?;
        }
        Commands::Run {
            config,
            steps,
            sample_every,
            out,
        } => {
            let config = load_config(config.as_deref())?;
            let mut world = World::try_new(config).context("failed to initialize world")?;
            println!("Initial:  {}", status_line(&world));
            println!("Simulating for {steps} steps...");

            let summary = world
                .try_run_experiment(steps, sample_every)
                .context("simulation failed")?;
            println!("Final:    {}", status_line(&world));

            if let Some(out) = out {
                let file = File::create(&out).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Summary saved to {}", out.display());
            }
        }
        Commands::Sweep {
            config,
            luminosities,
            steps,
        } => {
            let base = load_config(config.as_deref())?;
            let luminosities = if luminosities.is_empty() {
                DEFAULT_LUMINOSITIES.to_vec()
            } else {
                luminosities
            };
            let points = sweep_luminosity(&base, &luminosities, steps).context("sweep failed")?;
            println!("luminosity  white  black  settled_temp");
            for p in &points {
                println!(
                    "{:>10.2}  {:>5}  {:>5}  {:>12.2}",
                    p.solar_luminosity,
                    p.final_metrics.white_daisies,
                    p.final_metrics.black_daisies,
                    p.settled_temperature
                );
            }
        }
    }
    Ok(())
}
