use lppl_fit::io::{CsvFormat, load_observations_from_path};
use lppl_fit::plot::{PlotOptions, render_fit};
use lppl_fit::{BfgsMinimizer, LpplFit, MinimizerAlgorithm, NelderMeadMinimizer};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fit the log-periodic power law model to a price series
#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Semicolon-delimited CSV in the CoinMarketCap historical data format
    #[clap(value_parser, required_unless_present = "print_schema")]
    input: Option<PathBuf>,

    /// PNG file to render the observed prices and the fitted model to
    #[clap(short, long, value_parser, default_value = "lppl_fit.png")]
    output: PathBuf,

    /// JSON file with the fit configuration, see --print-schema
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Minimization algorithm, overrides the configuration
    #[clap(short, long, value_enum)]
    algorithm: Option<Algorithm>,

    /// Maximum number of optimizer iterations, overrides the configuration
    #[clap(long, value_parser)]
    max_iterations: Option<u32>,

    /// Print JSON schema of the fit configuration and exit
    #[clap(long)]
    print_schema: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    NelderMead,
    Bfgs,
}

impl From<Algorithm> for MinimizerAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::NelderMead => NelderMeadMinimizer::default().into(),
            Algorithm::Bfgs => BfgsMinimizer::default().into(),
        }
    }
}

fn fit_config(args: &Args) -> Result<LpplFit> {
    let mut fit = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open configuration {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("invalid configuration {}", path.display()))?
        }
        None => LpplFit::default(),
    };
    if let Some(algorithm) = args.algorithm {
        fit = fit.with_algorithm(algorithm);
    }
    if let Some(max_iterations) = args.max_iterations {
        let mut algorithm = fit.algorithm().clone();
        algorithm.set_max_iterations(max_iterations);
        fit = fit.with_algorithm(algorithm);
    }
    Ok(fit)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.print_schema {
        let schema = schemars::schema_for!(LpplFit);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let fit = fit_config(&args)?;
    let input = args
        .input
        .as_ref()
        .context("input file is required")?;

    let loaded = load_observations_from_path(input, &CsvFormat::default())
        .with_context(|| format!("cannot load {}", input.display()))?;
    for row in loaded.skipped.iter() {
        warn!(line = row.line, reason = %row.reason, "skipping row");
    }
    let mut series = loaded.series()?;
    info!(
        observations = series.lenu(),
        first = %series.first().timestamp,
        last = %series.last().timestamp,
        "loaded price series"
    );

    let result = fit.fit(&mut series)?;
    for line in result.to_string().lines() {
        info!("{line}");
    }
    if !result.is_converged() {
        warn!(status = %result.status, "fit did not converge, reporting the best parameters found");
    }

    render_fit(
        &args.output,
        &loaded.observations,
        &result.params,
        &PlotOptions::default(),
    )
    .with_context(|| format!("cannot render {}", args.output.display()))?;
    info!(path = %args.output.display(), "plot saved");

    Ok(())
}
