use super::solvers::traits::OptimizationCallback;
use crate::core::PARAM_NAMES;
use tracing::info;

/// Iteration result for tracking optimization progress
#[derive(Debug, Clone)]
pub struct IterationResult {
    pub params: Vec<f64>,
    pub cost: f64,
}

/// Records every iterate and reports the apogee height as the search goes
pub struct ProgressCallback {
    verbose: bool,
    history: Vec<IterationResult>,
    param_names: Vec<String>,
}

impl ProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            history: Vec::new(),
            param_names: PARAM_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Get iteration history
    pub fn history(&self) -> &[IterationResult] {
        &self.history
    }

    /// Print optimization summary
    pub fn print_summary(&self, success: bool, stop_reason: &str) {
        println!("\n{}", "=".repeat(60));
        println!("OPTIMIZATION SUMMARY");
        println!("{}", "=".repeat(60));

        println!(
            "\nStatus: {}",
            if success { "✓ SUCCESS" } else { "✗ FAILED" }
        );
        println!("Stop Reason: {}", stop_reason);
        println!("Total Iterations: {}", self.history.len().saturating_sub(1));

        if let Some(final_result) = self.history.last() {
            println!("\nFinal Height: {:.6e} m", -final_result.cost);
            println!("\nParameters:");
            for (name, &value) in self.param_names.iter().zip(final_result.params.iter()) {
                println!("  {:<10} = {:.6e}", name, value);
            }
        }

        println!("\nIteration History:");
        println!("{:<8} {:<20}", "Iter", "Height (m)");
        println!("{}", "-".repeat(30));
        for (i, result) in self.history.iter().enumerate() {
            println!("{:<8} {:<20.6e}", i, -result.cost);
        }

        println!("\n{}\n", "=".repeat(60));
    }
}

impl OptimizationCallback for ProgressCallback {
    fn on_iteration(&mut self, iteration: u32, params: &[f64], cost: f64) -> Result<(), String> {
        if params.len() != self.param_names.len() {
            return Err(format!(
                "Expected {} parameters, got {}",
                self.param_names.len(),
                params.len()
            ));
        }

        self.history.push(IterationResult {
            params: params.to_vec(),
            cost,
        });

        if self.verbose {
            info!(iteration, height = -cost, "Iteration");
        }

        Ok(())
    }
}
