//! Console rendering: per-case progress lines, detail blocks, the pass/fail
//! summary, and the post-run timing report. Everything renders to strings so
//! the binary owns all printing.

use serde::Serialize;

use crate::error::FvResult;
use crate::model::TestResult;

/// `count/total - parser filename run_time`, the one-line heartbeat printed
/// as each case completes.
#[must_use]
pub fn progress_line(count: usize, total: usize, result: &TestResult) -> String {
    match result.run_time {
        Some(run_time) => format!(
            "{count}/{total} - {} {} {run_time:.4}s",
            result.parser, result.filename
        ),
        None => format!("{count}/{total} - {} {}", result.parser, result.filename),
    }
}

/// Multi-line block describing one verdict, including every field diff.
#[must_use]
pub fn detail_block(result: &TestResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("parser:   {}\n", result.parser));
    out.push_str(&format!("input:    {}\n", result.filename));
    out.push_str(&format!("status:   {}\n", result.status));
    if let Some(run_time) = result.run_time {
        out.push_str(&format!("run_time: {run_time:.4}s\n"));
    }
    if !result.differences.is_empty() {
        out.push_str("differences:\n");
        for diff in &result.differences {
            out.push_str(&format!("  {diff}\n"));
        }
    }
    out
}

/// Final `passed/total` line.
#[must_use]
pub fn summary_line(passed: usize, total: usize) -> String {
    format!("{passed}/{total} tests passed")
}

/// The whole verdict array as pretty JSON, for machine consumers.
pub fn render_json(results: &[TestResult]) -> FvResult<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

// ---------------------------------------------------------------------------
// Timing statistics
// ---------------------------------------------------------------------------

const TOP_CASES: usize = 10;

/// One timed case in the extremes tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCase {
    pub parser: String,
    pub filename: String,
    pub run_time: f64,
}

/// Aggregate running-time report over every verdict that carries a run time.
#[derive(Debug, Clone, Serialize)]
pub struct TimingStats {
    /// Up to ten cases, slowest first.
    pub slowest: Vec<TimedCase>,
    /// Up to ten cases, fastest first.
    pub fastest: Vec<TimedCase>,
    pub mean: f64,
    pub median: f64,
    pub cumulative: f64,
    pub timed_cases: usize,
}

impl TimingStats {
    /// `None` when no verdict was actually executed, so the caller can skip
    /// the report entirely.
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Option<Self> {
        let mut timed: Vec<TimedCase> = results
            .iter()
            .filter_map(|r| {
                r.run_time.map(|run_time| TimedCase {
                    parser: r.parser.clone(),
                    filename: r.filename.clone(),
                    run_time,
                })
            })
            .collect();
        if timed.is_empty() {
            return None;
        }

        timed.sort_by(|a, b| a.run_time.total_cmp(&b.run_time));
        let times: Vec<f64> = timed.iter().map(|c| c.run_time).collect();
        let cumulative: f64 = times.iter().sum();
        let mean = cumulative / times.len() as f64;
        let median = if times.len() % 2 == 1 {
            times[times.len() / 2]
        } else {
            let upper = times.len() / 2;
            (times[upper - 1] + times[upper]) / 2.0
        };

        let fastest: Vec<TimedCase> = timed.iter().take(TOP_CASES).cloned().collect();
        let slowest: Vec<TimedCase> = timed.iter().rev().take(TOP_CASES).cloned().collect();

        Some(Self {
            slowest,
            fastest,
            mean,
            median,
            cumulative,
            timed_cases: times.len(),
        })
    }

    /// Plain-text report in the shape printed after a run.
    #[must_use]
    pub fn render(&self) -> String {
        fn table(title: &str, cases: &[TimedCase]) -> String {
            let mut out = format!("{title}:\n");
            for (index, case) in cases.iter().enumerate() {
                out.push_str(&format!(
                    "  {}. {} {} {:.4}s\n",
                    index + 1,
                    case.parser,
                    case.filename,
                    case.run_time
                ));
            }
            out
        }

        let mut out = String::from("----- Statistics -----\n");
        out.push_str(&table("Top 10 slowest test cases", &self.slowest));
        out.push_str(&table("Top 10 fastest test cases", &self.fastest));
        out.push_str(&format!("Mean running time:       {:.4}s\n", self.mean));
        out.push_str(&format!("Median running time:     {:.4}s\n", self.median));
        out.push_str(&format!("Cumulative running time: {:.4}s\n", self.cumulative));
        out
    }
}
