//! Artifact export: event logs as JSONL, sweep summaries as CSV, scenario
//! reports as JSON.

use crate::harness::ScenarioReport;
use crate::sweep::SweepSummary;
use anyhow::{Context, Result};
use liquivault_core::events::VaultEvent;
use std::path::Path;

/// One JSON object per line, in emission order.
pub fn export_events_jsonl(events: &[VaultEvent]) -> Result<String> {
    let mut out = String::new();
    for event in events {
        let line = serde_json::to_string(event).context("failed to serialize event")?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub fn write_events_jsonl(path: &Path, events: &[VaultEvent]) -> Result<()> {
    let data = export_events_jsonl(events)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

pub fn export_report_json(report: &ScenarioReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize scenario report")
}

pub fn write_report_json(path: &Path, report: &ScenarioReport) -> Result<()> {
    let data = export_report_json(report)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}

/// Columns: seed, steps, passed, mismatches, violations.
pub fn export_sweep_csv(summaries: &[SweepSummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["seed", "steps", "passed", "mismatches", "violations"])?;
    for s in summaries {
        wtr.write_record([
            s.seed.to_string(),
            s.steps.to_string(),
            s.passed.to_string(),
            s.mismatches.to_string(),
            s.violations.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_sweep_csv(path: &Path, summaries: &[SweepSummary]) -> Result<()> {
    let data = export_sweep_csv(summaries)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))
}
