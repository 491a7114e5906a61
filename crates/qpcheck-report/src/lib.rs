mod reporter;

pub use reporter::{ConsoleReporter, MemoryReporter, ReportData, Reporter, TrialReport, Verdict};

#[cfg(test)]
mod tests;
