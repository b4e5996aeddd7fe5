//! Parallel analysis of many input files.
//!
//! Analyses share no state, so every input file is processed independently
//! on the rayon thread pool. A failing input does not stop the others.

use crate::config::Config;
use crate::workflow::{run_input_file, AnalysisReport};
use log::{error, info};
use rayon::prelude::*;
use std::path::PathBuf;

/// Outcome of one input file in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Input file
    pub input: PathBuf,
    /// Report, or the error message
    pub result: Result<AnalysisReport, String>,
}

impl BatchOutcome {
    /// True when the analysis completed
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs every input file in parallel; outcomes keep the input order.
pub fn run_batch(inputs: &[PathBuf], defaults: &Config) -> Vec<BatchOutcome> {
    info!(
        "Batch of {} inputs on {} threads",
        inputs.len(),
        rayon::current_num_threads()
    );
    inputs
        .par_iter()
        .map(|input| {
            let result = run_input_file(input, defaults, 0).map_err(|e| {
                error!("{}: {}", input.display(), e);
                e.to_string()
            });
            BatchOutcome {
                input: input.clone(),
                result,
            }
        })
        .collect()
}

/// Fixed-width table of descriptors, one line per input.
pub fn summary_table(outcomes: &[BatchOutcome]) -> String {
    let mut out = format!(
        "{:<28} {:>12} {:>10} {:>10} {:>12}  {}\n",
        "system", "pitch", "asym", "tilt", "theta_s/deg", "character"
    );
    for outcome in outcomes {
        let name = outcome
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?");
        match &outcome.result {
            Ok(report) => {
                let d = &report.analysis.descriptors;
                out.push_str(&format!(
                    "{:<28} {:>12.6} {:>10.6} {:>10.6} {:>12.3}  {}, {}\n",
                    name,
                    d.pitch,
                    d.asymmetry,
                    d.tilt,
                    d.tilt_heading_degrees(),
                    d.character(),
                    d.path_character()
                ));
            }
            Err(msg) => {
                out.push_str(&format!("{:<28} FAILED: {}\n", name, msg));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_case(dir: &TempDir, name: &str, grad_b_x: f64) -> PathBuf {
        let base = dir.path();
        fs::write(base.join(format!("{}_a.out", name)), "g\n1.0 0.0 0.0\n").unwrap();
        fs::write(
            base.join(format!("{}_b.out", name)),
            format!("g\n{} 0.0 0.0\n", grad_b_x),
        )
        .unwrap();
        fs::write(base.join(format!("{}_h.out", name)), "h\n0.0 1.0 0.0\n").unwrap();
        let input = base.join(format!("{}.inp", name));
        fs::write(
            &input,
            format!(
                "gradient_a = {0}_a.out\ngradient_b = {0}_b.out\nnac = {0}_h.out\nsave_image = false\nwrite_vectors = false\n",
                name
            ),
        )
        .unwrap();
        input
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = write_case(&dir, "good", -1.0);
        let degenerate = write_case(&dir, "flat", 1.0);
        let missing = dir.path().join("missing.inp");

        let outcomes = run_batch(&[good.clone(), degenerate, missing], &Config::default());
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].input, good);
        assert!(outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert!(!outcomes[2].is_ok());
        assert!(dir.path().join("good_ci_parameters.txt").exists());

        let table = summary_table(&outcomes);
        assert!(table.contains("good"));
        assert!(table.contains("FAILED"));
    }
}
