//! Parallel soak sweeps: generate scenarios across a seed range and run
//! them concurrently, collecting one summary row per seed.

use crate::generator::{generate, GeneratorConfig};
use crate::harness::{Harness, ScenarioReport};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub seed: u64,
    pub steps: usize,
    pub passed: bool,
    pub mismatches: usize,
    pub violations: usize,
}

impl SweepSummary {
    fn from_report(seed: u64, report: &ScenarioReport) -> Self {
        Self {
            seed,
            steps: report.steps_executed,
            passed: report.passed(),
            mismatches: report.mismatches.len(),
            violations: report.violations.len(),
        }
    }
}

/// Run generated scenarios for every seed in `[first_seed, first_seed + count)`.
///
/// Each seed gets its own vault and bank, so runs are independent and the
/// sweep parallelizes trivially.
pub fn run_sweep(base: &GeneratorConfig, first_seed: u64, count: u64) -> Vec<SweepSummary> {
    info!(first_seed, count, steps = base.steps, "starting sweep");
    let mut summaries: Vec<SweepSummary> = (first_seed..first_seed + count)
        .into_par_iter()
        .map(|seed| {
            let config = GeneratorConfig {
                seed,
                ..base.clone()
            };
            let scenario = generate(&config);
            let report = Harness::run(&scenario)
                .unwrap_or_else(|e| panic!("seed {seed}: harness setup failed: {e}"));
            SweepSummary::from_report(seed, &report)
        })
        .collect();
    summaries.sort_by_key(|s| s.seed);
    let failed = summaries.iter().filter(|s| !s.passed).count();
    info!(total = summaries.len(), failed, "sweep finished");
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_covers_every_seed_in_order() {
        let base = GeneratorConfig {
            steps: 15,
            max_amount: 10_000,
            ..Default::default()
        };
        let summaries = run_sweep(&base, 100, 4);
        assert_eq!(summaries.len(), 4);
        assert_eq!(
            summaries.iter().map(|s| s.seed).collect::<Vec<_>>(),
            vec![100, 101, 102, 103]
        );
    }

    #[test]
    fn generated_scenarios_pass_clean() {
        let base = GeneratorConfig {
            steps: 30,
            max_amount: 100_000,
            ..Default::default()
        };
        for summary in run_sweep(&base, 0, 6) {
            assert!(
                summary.passed,
                "seed {} had {} mismatches, {} violations",
                summary.seed, summary.mismatches, summary.violations
            );
        }
    }
}
