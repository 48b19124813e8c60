//! kktfolio CLI binary.
//!
//! Reads a JSON request file and prints optimized weights or the estimated
//! return statistics. Set `RUST_LOG=kktfolio=debug` to trace the solver.

mod request;

use clap::{Parser, Subcommand, ValueEnum};
use kktfolio::output::{ExportFormat, Exporter};
use kktfolio::risk::estimate_statistics;
use kktfolio::{ProblemType, SolverMethod, optimize_with_labels};
use ndarray::{Array1, Array2};
use request::{OptimizeRequest, Overrides};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "kktfolio")]
#[command(
    about = "kktfolio: constrained portfolio optimization via KKT systems",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Optimize weights for the prices in a request file
    Optimize {
        /// Request file (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write the result to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// KKT factorization (lu, cholesky, qr, svd)
        #[arg(long)]
        method: Option<SolverMethod>,

        /// Problem type (portfolio, svm, lqr, resource)
        #[arg(long = "type")]
        problem: Option<ProblemType>,

        /// Feasibility tolerance
        #[arg(long)]
        tolerance: Option<f64>,

        /// Maximum number of KKT solves
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Print the mean returns and covariance estimated from a request file
    Stats {
        /// Request file (JSON)
        #[arg(long, short)]
        input: PathBuf,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    PrettyJson,
    Csv,
}

impl OutputFormat {
    const fn export_format(self) -> Option<ExportFormat> {
        match self {
            Self::Text => None,
            Self::Json => Some(ExportFormat::Json),
            Self::PrettyJson => Some(ExportFormat::PrettyJson),
            Self::Csv => Some(ExportFormat::Csv),
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            format,
            output,
            method,
            problem,
            tolerance,
            max_iterations,
        } => {
            let overrides = Overrides {
                method,
                problem,
                tolerance,
                max_iterations,
            };
            run_optimize(&input, format, output, overrides)?;
        }
        Commands::Stats { input, format } => {
            run_stats(&input, format)?;
        }
    }

    Ok(())
}

fn run_optimize(
    input: &Path,
    format: OutputFormat,
    output: Option<PathBuf>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = OptimizeRequest::load(input)?;
    let prices = request.price_matrix()?;
    let options = overrides.apply(request.advanced_options);
    let labels = request
        .labels
        .unwrap_or_else(|| kktfolio::output::default_labels(prices.ncols()));

    info!(
        periods = prices.nrows(),
        assets = prices.ncols(),
        target = request.target_return,
        "optimizing"
    );
    let result = optimize_with_labels(&prices, &labels, request.target_return, &options)?;

    match format.export_format() {
        None => print!("{}", result.to_ascii_table()),
        Some(export) => println!("{}", result.export_to_string(export)?),
    }

    if let Some(path) = output {
        let export = format.export_format().unwrap_or(ExportFormat::PrettyJson);
        result.export_to_file(&path, export)?;
        info!(path = %path.display(), "result written");
    }

    Ok(())
}

fn run_stats(input: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let request = OptimizeRequest::load(input)?;
    let stats = estimate_statistics(&request.price_matrix()?)?;
    let labels = request
        .labels
        .unwrap_or_else(|| kktfolio::output::default_labels(stats.n_assets()));

    match format {
        OutputFormat::Text => {
            print_stats_text(&labels, &stats.mean, &stats.covariance, stats.n_periods());
        }
        _ => {
            let covariance: Vec<Vec<f64>> = stats
                .covariance
                .rows()
                .into_iter()
                .map(|r| r.to_vec())
                .collect();
            let output = json!({
                "assets": labels,
                "periods": stats.n_periods(),
                "mean": stats.mean.to_vec(),
                "covariance": covariance,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// First `width` characters of a label
fn truncate(label: &str, width: usize) -> String {
    label.chars().take(width).collect()
}

fn print_stats_text(
    labels: &[String],
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    periods: usize,
) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "RETURN STATISTICS");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Return periods: {}\n", periods);

    println!("Mean Returns:");
    println!("─────────────────────────────────────────────────────────────");
    for (label, m) in labels.iter().zip(mean) {
        println!("  {:<15} {:>12.6}", label, m);
    }

    println!("\nCovariance Matrix:");
    println!("─────────────────────────────────────────────────────────────");
    print!("{:<12}", "");
    for label in labels {
        print!("{:>12}", truncate(label, 10));
    }
    println!();
    for (label, row) in labels.iter().zip(covariance.rows()) {
        print!("{:<12}", truncate(label, 11));
        for v in row {
            print!("{:>12.2e}", v);
        }
        println!();
    }
    println!();
}
