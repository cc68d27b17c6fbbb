use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tau_dressing::{
    config::Config,
    io::{self, Format},
    run,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    /// YAML configuration, flags below take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconstruct dressed taus and fill the analysis histograms
    Reconstruct {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
        #[arg(long)]
        photon_radius: Option<f64>,
        #[arg(long)]
        window_low: Option<f64>, // GeV
        #[arg(long)]
        window_high: Option<f64>, // GeV
        /// Worker threads, all cores when absent
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Pack a text event dump into the binary format
    Convert { input: PathBuf, output: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Reconstruct {
            input,
            format,
            output,
            photon_radius,
            window_low,
            window_high,
            threads,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            let reco = &mut config.reconstruction;
            if let Some(r) = photon_radius {
                reco.photon_radius = r;
            }
            if let Some(low) = window_low {
                reco.d0_window.low = low;
            }
            if let Some(high) = window_high {
                reco.d0_window.high = high;
            }
            if reco.d0_window.low >= reco.d0_window.high {
                anyhow::bail!(
                    "the D0 window low edge {} must be below its high edge {}",
                    reco.d0_window.low,
                    reco.d0_window.high
                );
            }
            if let Some(n) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build_global()
                    .context("configuring the worker pool")?;
            }
            info!(
                "photon radius {}, D0 window ({}, {}) GeV",
                reco.photon_radius, reco.d0_window.low, reco.d0_window.high
            );

            let out = run::process_file(&input, format, &config)
                .with_context(|| format!("processing {}", input.display()))?;
            out.save(&output)?;
        }
        Command::Convert { input, output } => {
            let events = io::load_events(&input, Format::Text)?;
            io::save_binary(&output, &events)?;
        }
    }
    Ok(())
}
