use std::path::PathBuf;

use thiserror::Error;

pub type FvResult<T> = Result<T, FvError>;

#[derive(Debug, Error)]
pub enum FvError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("json failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no stored test results for parser `{parser}` at `{path}`")]
    StoreMissing { parser: String, path: PathBuf },

    #[error("parser not found: `{0}`")]
    ParserNotFound(String),

    #[error("parser name `{name}` is ambiguous (candidates: {candidates})")]
    ParserAmbiguous { name: String, candidates: String },

    #[error("parser `{parser}` failed on `{input}`: {message}")]
    Execution {
        parser: String,
        input: String,
        message: String,
    },

    #[error("parser `{parser}` emitted {count} error diagnostic(s) on `{input}`")]
    DiagnosticsEmitted {
        parser: String,
        input: String,
        count: usize,
    },

    #[error("missing command `{command}` on PATH")]
    CommandMissing { command: String },

    #[error("command failed: `{command}` (status: {status}){stderr_suffix}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr_suffix: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("run cancelled: {0}")]
    Cancelled(String),
}

impl FvError {
    #[must_use]
    pub fn from_command_failure(command: String, status: i32, stderr: String) -> Self {
        let trimmed = stderr.trim();
        let stderr_suffix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("; stderr: {trimmed}")
        };
        Self::CommandFailed {
            command,
            status,
            stderr_suffix,
        }
    }

    #[must_use]
    pub fn ambiguous_parser(name: &str, candidates: &[String]) -> Self {
        Self::ParserAmbiguous {
            name: name.to_owned(),
            candidates: candidates.join(", "),
        }
    }

    #[must_use]
    pub fn execution(parser: &str, input: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            parser: parser.to_owned(),
            input: input.to_owned(),
            message: message.into(),
        }
    }

    /// Stable, unique, machine-readable error code for every variant.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "FV-IO",
            Self::Json(_) => "FV-JSON",
            Self::StoreMissing { .. } => "FV-STORE-MISSING",
            Self::ParserNotFound(_) => "FV-PARSER-NOT-FOUND",
            Self::ParserAmbiguous { .. } => "FV-PARSER-AMBIGUOUS",
            Self::Execution { .. } => "FV-EXEC",
            Self::DiagnosticsEmitted { .. } => "FV-DIAGNOSTICS",
            Self::CommandMissing { .. } => "FV-CMD-MISSING",
            Self::CommandFailed { .. } => "FV-CMD-FAILED",
            Self::InvalidRequest(_) => "FV-INVALID-REQUEST",
            Self::Storage(_) => "FV-STORAGE",
            Self::Cancelled(_) => "FV-CANCELLED",
        }
    }
}
