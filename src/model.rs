use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semi-structured parser output: field name to scalar / sequence / mapping,
/// arbitrary depth. Key order is sorted by `serde_json`'s map, which keeps
/// every serialization of the same record byte-stable.
pub type MetadataRecord = serde_json::Map<String, Value>;

/// Synthetic diff field used when a case errored instead of comparing.
pub const ERROR_FIELD: &str = "<error>";

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Warning,
    Error,
}

impl DiagnosticSeverity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One diagnostic emitted by a parser invocation alongside its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
        }
    }
}

/// Complete output of one parser invocation: the metadata record plus any
/// diagnostics raised while producing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub metadata: MetadataRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

// ---------------------------------------------------------------------------
// Test cases and verdicts
// ---------------------------------------------------------------------------

/// One unit of work: run `parser` against `filename` and compare with
/// `expected`. `expected` is `None` only for brand-new case generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub parser: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<MetadataRecord>,
}

/// Terminal state of an executed case. `Errored` (the parser raised or never
/// produced output) is distinct from `Failed` (the parser ran, output differs
/// from the stored expectation); both count as failing in aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Errored,
}

impl CaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field that differed under the active policy. A side that is `None`
/// was absent from that record, which is not the same as a present JSON
/// null: absent sides are omitted from serialization entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

fn render_side(value: Option<&Value>) -> String {
    match value {
        None => "(absent)".to_owned(),
        Some(v) => v.to_string(),
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, got {}",
            self.field,
            render_side(self.expected.as_ref()),
            render_side(self.actual.as_ref())
        )
    }
}

/// Verdict for one executed (or attempted) test case.
///
/// `run_time` is seconds of parser execution; `None` means the case never
/// actually ran, and such verdicts are skipped by timing statistics while
/// still counting toward pass/fail totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub parser: String,
    pub filename: String,
    pub status: CaseStatus,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<FieldDiff>,
}

impl TestResult {
    #[must_use]
    pub fn passed(parser: &str, filename: &str, run_time: Option<f64>) -> Self {
        Self {
            parser: parser.to_owned(),
            filename: filename.to_owned(),
            status: CaseStatus::Passed,
            passed: true,
            run_time,
            differences: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(
        parser: &str,
        filename: &str,
        run_time: Option<f64>,
        differences: Vec<FieldDiff>,
    ) -> Self {
        Self {
            parser: parser.to_owned(),
            filename: filename.to_owned(),
            status: CaseStatus::Failed,
            passed: false,
            run_time,
            differences,
        }
    }

    /// Build the verdict for a case whose invocation raised instead of
    /// producing output. The error message lands in a synthetic diff so
    /// every failing verdict carries at least one difference to report.
    #[must_use]
    pub fn errored(
        parser: &str,
        filename: &str,
        run_time: Option<f64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parser: parser.to_owned(),
            filename: filename.to_owned(),
            status: CaseStatus::Errored,
            passed: false,
            run_time,
            differences: vec![FieldDiff {
                field: ERROR_FIELD.to_owned(),
                expected: None,
                actual: Some(Value::String(message.into())),
            }],
        }
    }
}
