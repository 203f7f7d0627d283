//! FlowLab CLI — score bar files, generate synthetic data, compare presets.
//!
//! Commands:
//! - `run` — score a CSV of bars with a preset or TOML config, JSON lines out
//! - `synth` — write a deterministic synthetic bar CSV
//! - `compare` — run every preset over the same bars in parallel
//! - `presets` — list presets or print one as TOML

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowlab_core::domain::{Bar, Direction};
use flowlab_core::engine::{Engine, EvaluationResult};
use flowlab_core::presets::Preset;
use flowlab_core::synthetic::synthetic_bars;
use flowlab_core::EngineConfig;

#[derive(Parser)]
#[command(
    name = "flowlab",
    about = "FlowLab CLI — streaming multi-factor signal scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a CSV of bars and write one JSON result per line.
    Run {
        /// CSV with columns date,open,high,low,close,volume (date may be empty).
        #[arg(long)]
        input: PathBuf,

        /// Named preset. Defaults to balanced.
        #[arg(long)]
        preset: Option<String>,

        /// Path to a TOML engine config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Only write bars on which a signal fired.
        #[arg(long, default_value_t = false)]
        signals_only: bool,
    },
    /// Generate deterministic synthetic bars as CSV.
    Synth {
        /// Number of bars.
        #[arg(long, default_value_t = 1_000)]
        bars: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "SYN")]
        symbol: String,

        #[arg(long)]
        output: PathBuf,
    },
    /// Run every preset over the same bars and print a summary table.
    Compare {
        #[arg(long)]
        input: PathBuf,
    },
    /// List presets, or print one as TOML.
    Presets {
        /// Preset to print.
        #[arg(long)]
        show: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowlab=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            preset,
            config,
            output,
            signals_only,
        } => run_cmd(&input, preset, config, output, signals_only),
        Commands::Synth {
            bars,
            seed,
            symbol,
            output,
        } => synth_cmd(bars, seed, &symbol, &output),
        Commands::Compare { input } => compare_cmd(&input),
        Commands::Presets { show } => presets_cmd(show.as_deref()),
    }
}

// ─── Input ──────────────────────────────────────────────────────────

struct LoadedBars {
    bars: Vec<Bar>,
    /// CSV rows that could not be parsed.
    skipped: usize,
}

fn read_bars(reader: impl Read) -> LoadedBars {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    let mut skipped = 0;
    for (row, record) in rdr.deserialize::<Bar>().enumerate() {
        match record {
            Ok(bar) => bars.push(bar),
            Err(err) => {
                warn!(row = row + 1, %err, "skipping unreadable row");
                skipped += 1;
            }
        }
    }
    LoadedBars { bars, skipped }
}

fn load_bars(path: &Path) -> Result<LoadedBars> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let loaded = read_bars(file);
    if loaded.bars.is_empty() {
        bail!("no readable bars in {}", path.display());
    }
    Ok(loaded)
}

fn parse_preset(name: &str) -> Result<Preset> {
    match Preset::from_name(name) {
        Some(preset) => Ok(preset),
        None => {
            let valid: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
            bail!("unknown preset '{name}'. Valid: {}", valid.join(", "))
        }
    }
}

// ─── Summary ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
struct RunSummary {
    bars: usize,
    rejected: usize,
    buys: usize,
    sells: usize,
    abs_score_sum: f64,
}

impl RunSummary {
    fn record(&mut self, result: &EvaluationResult) {
        self.bars += 1;
        self.abs_score_sum += result.composite.value.abs();
        match result.signal.direction {
            Direction::Buy => self.buys += 1,
            Direction::Sell => self.sells += 1,
            Direction::None => {}
        }
    }

    fn mean_abs_score(&self) -> f64 {
        if self.bars == 0 {
            0.0
        } else {
            self.abs_score_sum / self.bars as f64
        }
    }
}

/// Drive one engine over `bars`, passing each accepted result to `sink`.
fn score_bars(
    engine: &mut Engine,
    bars: &[Bar],
    mut sink: impl FnMut(&EvaluationResult) -> Result<()>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for bar in bars {
        match engine.process(*bar) {
            Ok(result) => {
                summary.record(&result);
                sink(&result)?;
            }
            Err(_) => summary.rejected += 1,
        }
    }
    Ok(summary)
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_cmd(
    input: &Path,
    preset_name: Option<String>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    signals_only: bool,
) -> Result<()> {
    if config_path.is_some() && preset_name.is_some() {
        bail!("--config and --preset are mutually exclusive");
    }
    let (label, config) = match (config_path, preset_name) {
        (Some(path), _) => {
            let config = EngineConfig::from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            (path.display().to_string(), config)
        }
        (None, name) => {
            let preset = parse_preset(name.as_deref().unwrap_or("balanced"))?;
            (preset.name().to_string(), preset.config())
        }
    };
    let fingerprint = config.fingerprint()?;
    let mut engine = Engine::new(config)?;
    let loaded = load_bars(input)?;
    info!(config = %label, fingerprint = &fingerprint[..12], bars = loaded.bars.len(), "scoring");

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let summary = score_bars(&mut engine, &loaded.bars, |result| {
        if !signals_only || !result.signal.is_none() {
            serde_json::to_writer(&mut out, result)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    })?;
    out.flush()?;

    eprintln!("Config:        {label} ({})", &fingerprint[..12]);
    eprintln!("Bars scored:   {}", summary.bars);
    eprintln!("Rejected:      {}", summary.rejected);
    eprintln!("Unreadable:    {}", loaded.skipped);
    eprintln!("Buy signals:   {}", summary.buys);
    eprintln!("Sell signals:  {}", summary.sells);
    eprintln!("Mean |score|:  {:.2}", summary.mean_abs_score());
    Ok(())
}

fn synth_cmd(count: usize, seed: u64, symbol: &str, output: &Path) -> Result<()> {
    let bars = synthetic_bars(symbol, count, seed);
    let mut wtr =
        csv::Writer::from_path(output).with_context(|| format!("creating {}", output.display()))?;
    for bar in &bars {
        wtr.serialize(bar)?;
    }
    wtr.flush()?;
    info!(symbol, seed, bars = bars.len(), path = %output.display(), "wrote synthetic bars");
    Ok(())
}

fn compare_cmd(input: &Path) -> Result<()> {
    let loaded = load_bars(input)?;
    let rows: Vec<(Preset, RunSummary)> = Preset::ALL
        .par_iter()
        .map(|&preset| -> Result<(Preset, RunSummary)> {
            let mut engine = Engine::from_preset(preset)?;
            let summary = score_bars(&mut engine, &loaded.bars, |_| Ok(()))?;
            Ok((preset, summary))
        })
        .collect::<Result<_>>()?;

    println!("Bars: {} ({} unreadable rows)", loaded.bars.len(), loaded.skipped);
    println!();
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>12}",
        "Preset", "Buys", "Sells", "Rejected", "Mean |score|"
    );
    println!("{}", "-".repeat(60));
    for (preset, s) in &rows {
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>12.2}",
            preset.name(),
            s.buys,
            s.sells,
            s.rejected,
            s.mean_abs_score()
        );
    }
    Ok(())
}

fn presets_cmd(show: Option<&str>) -> Result<()> {
    if let Some(name) = show {
        let preset = parse_preset(name)?;
        print!("{}", preset.config().to_toml_string()?);
        return Ok(());
    }
    println!("{:<20} {:<14} Factors", "Preset", "Fingerprint");
    println!("{}", "-".repeat(72));
    for preset in Preset::ALL {
        let config = preset.config();
        let factors: Vec<String> = config.weights.keys().map(|f| f.to_string()).collect();
        println!(
            "{:<20} {:<14} {}",
            preset.name(),
            &config.fingerprint()?[..12],
            factors.join(", ")
        );
    }
    Ok(())
}
