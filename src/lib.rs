#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod compare;
pub mod error;
pub mod logging;
pub mod model;
pub mod parser;
pub mod pool;
pub mod process;
pub mod report;
pub mod storage;
pub mod tester;

pub use compare::{FieldPolicy, compare};
pub use error::{FvError, FvResult};
pub use model::{
    CaseStatus, Diagnostic, Extraction, FieldDiff, MetadataRecord, TestCase, TestResult,
};
pub use parser::{Parser, ParserRegistry};
pub use pool::VerdictStream;
pub use report::TimingStats;
pub use storage::ResultStore;
pub use tester::{Tester, TesterConfig};
