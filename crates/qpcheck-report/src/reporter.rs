use std::io::{self, Write};

use qpcheck_types::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Keys printed first, in this order, when present in the inputs
const INPUT_KEYS: [&str; 6] = ["P", "q", "A", "b", "A_eq", "b_eq"];

/// Outcome of one trial as shown to the reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed(String),
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Report data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub inputs: Value,
    pub outputs: Value,
}

/// Trial report with an input hash, so a failing instance can be matched across runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    pub trial: usize,
    pub cost_scale: f64,
    /// Hex SHA-256 of the JSON-serialized inputs
    pub input_hash: String,
    pub verdict: Verdict,
    pub report_data: ReportData,
}

impl TrialReport {
    pub fn new(
        trial: usize,
        cost_scale: f64,
        inputs: Value,
        outputs: Value,
        verdict: Verdict,
    ) -> Result<Self> {
        let input_hash = input_digest(&inputs)?;
        Ok(TrialReport {
            trial,
            cost_scale,
            input_hash,
            verdict,
            report_data: ReportData { inputs, outputs },
        })
    }
}

pub(crate) fn input_digest(inputs: &Value) -> Result<String> {
    let json = serde_json::to_vec(inputs)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Reporter trait
pub trait Reporter {
    fn publish(&mut self, report: &TrialReport) -> Result<()>;

    /// Called once after the last trial
    fn finish(&mut self, _total_trials: usize, _failed_trials: usize) -> Result<()> {
        Ok(())
    }
}

/// Human-readable per-trial diagnostics.
///
/// With `verbose` off only failing trials are printed.
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), verbose)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, verbose: bool) -> Self {
        ConsoleReporter { out, verbose }
    }

    fn write_report(&mut self, report: &TrialReport) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(
            out,
            "[trial {} | cost scale {} | input {}]",
            report.trial,
            report.cost_scale,
            &report.input_hash[..report.input_hash.len().min(12)]
        )?;

        writeln!(out, "[Test input matrices]")?;
        write_fields(out, &report.report_data.inputs, &INPUT_KEYS)?;

        writeln!(out)?;
        writeln!(out, "[Solutions]")?;
        write_fields(out, &report.report_data.outputs, &[])?;

        match &report.verdict {
            Verdict::Passed => writeln!(out, "\n[trial passed]")?,
            Verdict::Failed(reason) => writeln!(out, "\n[trial FAILED: {}]", reason)?,
        }
        writeln!(out, "=============================================================")?;
        out.flush()
    }
}

impl Reporter for ConsoleReporter {
    fn publish(&mut self, report: &TrialReport) -> Result<()> {
        if self.verbose || !report.verdict.is_passed() {
            self.write_report(report)?;
        }
        Ok(())
    }

    fn finish(&mut self, total_trials: usize, failed_trials: usize) -> Result<()> {
        writeln!(self.out, "failed trials: {} of {}", failed_trials, total_trials)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Simple in-memory reporter
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Vec<TrialReport>,
    totals: Option<(usize, usize)>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> &[TrialReport] {
        &self.reports
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrialReport> {
        self.reports.iter().filter(|r| !r.verdict.is_passed())
    }

    /// `(total, failed)` as passed to `finish`
    pub fn totals(&self) -> Option<(usize, usize)> {
        self.totals
    }
}

impl Reporter for MemoryReporter {
    fn publish(&mut self, report: &TrialReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn finish(&mut self, total_trials: usize, failed_trials: usize) -> Result<()> {
        self.totals = Some((total_trials, failed_trials));
        Ok(())
    }
}

fn write_fields(out: &mut dyn Write, value: &Value, preferred: &[&str]) -> io::Result<()> {
    let Some(map) = value.as_object() else {
        return writeln!(out, "{}", value);
    };

    let ordered = preferred
        .iter()
        .filter_map(|key| map.get(*key).map(|field| (*key, field)))
        .chain(
            map.iter()
                .filter(|(key, _)| !preferred.contains(&key.as_str()))
                .map(|(key, field)| (key.as_str(), field)),
        );

    for (key, field) in ordered {
        writeln!(out, "{} =", key)?;
        writeln!(out, "{}", format_value(field))?;
    }
    Ok(())
}

/// Matrices (arrays of arrays) print one row per line
fn format_value(value: &Value) -> String {
    match value.as_array() {
        Some(rows) if !rows.is_empty() && rows.iter().all(Value::is_array) => rows
            .iter()
            .map(|row| format!("  {}", row))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => format!("  {}", value),
    }
}
