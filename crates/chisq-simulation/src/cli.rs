// Purpose: Provides a command-line interface for the chi-square simulation.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::io::BufReader;
use tracing::info;

use crate::config::SimulationConfig;
use crate::controller::RunController;
use crate::engine::SimulationEngine;
use crate::runner::{run_interactive, run_to_completion, TokioTickScheduler};
use crate::scheduler::ManualScheduler;
use crate::visualization::ChartRenderer;

/// Chi-square goodness-of-fit simulation
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML config file; built-in defaults are used when absent
    #[clap(long, env = "CHISQ_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the random source (replays a run)
    #[clap(long)]
    seed: Option<u64>,

    /// Override the trial budget
    #[clap(long)]
    trials: Option<u64>,

    /// Override the number of draws per trial
    #[clap(long)]
    sample_size: Option<u64>,

    /// Override the delay between continuous-mode ticks, in milliseconds
    #[clap(long)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run continuously until the trial budget is spent
    Run(RunArgs),

    /// Run a fixed number of single steps and print the chart
    Step(StepArgs),

    /// Drive the simulation from stdin commands
    Interactive,

    /// Print the effective configuration
    ShowConfig(FormatArgs),

    /// Run to completion without delays and print the final engine state
    Summary(FormatArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Only print the final chart
    #[clap(long, short = 'q')]
    quiet: bool,
}

#[derive(Args, Debug)]
struct StepArgs {
    /// Number of steps
    #[clap(long, short = 'n', default_value = "1")]
    count: u64,
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Pretty,
    /// Compact JSON
    Compact,
    /// YAML format
    Yaml,
}

/// Serialize `value` in the requested format.
pub fn format_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(text)
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(trials) = self.trials {
            config = config.with_num_trials(trials);
        }
        if let Some(sample_size) = self.sample_size {
            config = config.with_sample_size(sample_size);
        }
        if let Some(tick_ms) = self.tick_ms {
            config = config.with_tick_delay_ms(tick_ms);
        }
        config.validate_histogram()?;
        Ok(config)
    }
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    execute(cli, &mut stdout.lock()).await
}

/// Execute a parsed command line, writing user-facing output to `out`.
pub async fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = cli.load_config()?;
    let renderer = ChartRenderer::new(config.histogram.clone());

    match cli.command {
        Command::ShowConfig(args) => {
            writeln!(out, "{}", format_output(&config, args.format)?)?;
        }
        Command::Run(args) => {
            let mut engine = build_engine(&config)?;
            let mut controller = RunController::with_tick_delay(
                &mut engine,
                TokioTickScheduler::new(),
                config.tick_delay(),
            );
            run_to_completion(&mut controller, &renderer, args.quiet, out).await?;
        }
        Command::Step(args) => {
            let mut engine = build_engine(&config)?;
            let mut controller = RunController::new(&mut engine, ManualScheduler::default());
            for _ in 0..args.count {
                if controller.is_finished() {
                    break;
                }
                controller.step();
            }
            write!(out, "{}", renderer.render(controller.engine()))?;
        }
        Command::Interactive => {
            let mut engine = build_engine(&config)?;
            let mut controller = RunController::with_tick_delay(
                &mut engine,
                TokioTickScheduler::new(),
                config.tick_delay(),
            );
            let stdin = BufReader::new(tokio::io::stdin());
            run_interactive(&mut controller, &renderer, stdin, out).await?;
        }
        Command::Summary(args) => {
            let mut engine = build_engine(&config)?;
            let mut controller = RunController::new(&mut engine, ManualScheduler::default());
            while !controller.is_finished() {
                controller.step();
            }
            writeln!(
                out,
                "{}",
                format_output(&controller.engine().snapshot(), args.format)?
            )?;
        }
    }

    out.flush()?;
    Ok(())
}

fn build_engine(config: &SimulationConfig) -> Result<SimulationEngine> {
    let engine = SimulationEngine::new(config).context("Invalid simulation configuration")?;
    info!(seed = engine.seed(), "Simulation ready");
    Ok(engine)
}
