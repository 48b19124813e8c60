//! Runs every problem type and solver method over one small price history.

use kktfolio::{AdvancedOptions, ConstraintOptions, ProblemType, SolverMethod, optimize_with_labels};
use ndarray::array;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== kktfolio Optimization Demo ===\n");

    let labels: Vec<String> = ["Bonds", "Equities", "Gold", "Cash"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let prices = array![
        [100.0, 200.0, 50.0, 10.00],
        [100.4, 203.0, 49.6, 10.01],
        [100.3, 199.5, 50.3, 10.02],
        [100.9, 204.0, 50.1, 10.03],
        [101.1, 206.5, 49.4, 10.04],
        [101.0, 204.8, 50.6, 10.05],
        [101.6, 209.0, 50.9, 10.06],
        [101.8, 207.2, 51.2, 10.07],
    ];
    let target = 0.004;

    println!("1. Minimum variance at target {target}");
    let result = optimize_with_labels(&prices, &labels, target, &AdvancedOptions::default())?;
    println!("{}", result.to_ascii_table());

    println!("2. Solver methods");
    for method in SolverMethod::ALL {
        let options = AdvancedOptions {
            solver_method: method,
            ..Default::default()
        };
        let result = optimize_with_labels(&prices, &labels, target, &options)?;
        println!(
            "   {:<9} used={:<9} iterations={:<3} weights={:?}",
            method.to_string(),
            result.diagnostics().method_used.to_string(),
            result.diagnostics().iterations,
            result
                .weight_values()
                .iter()
                .map(|w| format!("{w:.4}"))
                .collect::<Vec<_>>()
        );
    }

    println!("\n3. Problem types");
    for problem in ProblemType::all() {
        let options = AdvancedOptions {
            optimization_type: problem,
            ..Default::default()
        };
        match optimize_with_labels(&prices, &labels, target, &options) {
            Ok(result) => println!(
                "   {:<9} return={:.5} volatility={:.5} met={}",
                problem.name(),
                result.metrics().expected_return,
                result.metrics().volatility,
                result.constraints_met()
            ),
            Err(e) => println!("   {:<9} failed: {e}", problem.name()),
        }
    }

    println!("\n4. Position cap of 30%");
    let options = AdvancedOptions {
        constraints: ConstraintOptions {
            custom_constraints: true,
            max_position: 0.3,
            ..Default::default()
        },
        ..Default::default()
    };
    let result = optimize_with_labels(&prices, &labels, target, &options)?;
    println!("{}", result.to_ascii_table());

    println!("5. Unreachable target");
    match optimize_with_labels(&prices, &labels, 0.5, &AdvancedOptions::default()) {
        Ok(_) => println!("   unexpectedly solved"),
        Err(e) => println!("   {e}"),
    }

    Ok(())
}
