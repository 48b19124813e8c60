//! Demonstration of kktfolio-risk return and covariance estimation
//!
//! Builds a deterministic price history for three assets, one of which never
//! moves, and prints the resulting return statistics.

use kktfolio_risk::covariance::{is_symmetric, zero_variance_assets};
use kktfolio_risk::estimate_statistics;
use ndarray::Array2;

fn main() {
    println!("==========================================================");
    println!("          kktfolio-risk - Return Statistics Demo");
    println!("==========================================================\n");

    let n_times = 60;
    let n_assets = 3;
    let mut data = Vec::with_capacity(n_times * n_assets);

    for t in 0..n_times {
        let t_f = t as f64;
        // Asset 1: steady drift with a slow cycle
        data.push(100.0 * (1.0 + 0.002 * t_f) + 2.0 * (t_f * 0.3).sin());
        // Asset 2: faster, noisier cycle
        data.push(50.0 + 3.0 * (t_f * 0.7).cos() + 0.05 * t_f);
        // Asset 3: cash-like, constant price
        data.push(1.0);
    }

    let prices = match Array2::from_shape_vec((n_times, n_assets), data) {
        Ok(prices) => prices,
        Err(e) => {
            eprintln!("Failed to shape price matrix: {}", e);
            return;
        }
    };

    let stats = match estimate_statistics(&prices) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Estimation failed: {}", e);
            return;
        }
    };

    println!(
        "Periods: {}, assets: {}",
        stats.n_periods(),
        stats.n_assets()
    );
    println!("\nMean returns:");
    for (i, mu) in stats.mean.iter().enumerate() {
        println!("  Asset {}: {:>10.6}", i + 1, mu);
    }

    println!("\nCovariance matrix:");
    for row in stats.covariance.rows() {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>12.8}", v)).collect();
        println!("  {}", cells.join(" "));
    }

    println!(
        "\nSymmetric: {}",
        is_symmetric(&stats.covariance, 1e-15)
    );
    println!(
        "Zero-variance assets: {:?}",
        zero_variance_assets(&stats.covariance, 0.0)
    );
}
