//! Demonstration of the export functionality in kktfolio-output.

use kktfolio_output::{
    Allocation, Diagnostics, ExportFormat, Exporter, compute_metrics, default_labels,
};
use kktfolio_solver::{SolverMethod, TerminationStatus};
use ndarray::array;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== kktfolio Export Demo ===\n");

    let weights = array![0.55, 0.30, 0.15];
    let mean = array![0.0008, 0.0012, 0.0003];
    let covariance = array![
        [0.00040, 0.00010, 0.00002],
        [0.00010, 0.00090, 0.00001],
        [0.00002, 0.00001, 0.00005]
    ];

    let metrics = compute_metrics(&weights, &mean, &covariance)?;
    let allocation = Allocation::new(
        &default_labels(weights.len()),
        weights.as_slice().unwrap_or_default(),
        metrics,
        true,
        Diagnostics {
            iterations: 1,
            status: TerminationStatus::Converged,
            active_constraints: vec![],
            method_used: SolverMethod::Cholesky,
        },
    );

    println!("1. ASCII table");
    println!("{}", allocation.to_ascii_table());

    println!("2. CSV");
    println!("{}", allocation.export_to_string(ExportFormat::Csv)?);

    println!("3. Pretty JSON");
    println!("{}", allocation.export_to_string(ExportFormat::PrettyJson)?);

    println!("\n4. Markdown");
    println!("{}", allocation.to_markdown());

    let path = std::env::temp_dir().join(format!(
        "kktfolio_allocation.{}",
        ExportFormat::Json.extension()
    ));
    allocation.export_to_file(&path, ExportFormat::Json)?;
    println!("Written to {}", path.display());

    Ok(())
}
