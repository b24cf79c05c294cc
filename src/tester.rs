//! Orchestrates one harness invocation: builds the catalog, drives the
//! executor pool through the comparator for run mode, and hosts the
//! single-threaded store-mutation paths used by add/update/delete.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::Catalog;
use crate::compare::{FieldPolicy, compare};
use crate::error::{FvError, FvResult};
use crate::model::{Extraction, TestCase, TestResult};
use crate::parser::ParserRegistry;
use crate::pool::{CaseRunner, ExecutorPool, VerdictStream, default_worker_count};
use crate::storage::ResultStore;

/// Per-invocation knobs. Everything is threaded through explicitly; there is
/// no ambient global configuration.
#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// Overrides the per-parser default store location when set.
    pub store_root: Option<PathBuf>,
    /// Restrict the catalog to one parser (`name` or `source:name`).
    pub parser_filter: Option<String>,
    pub workers: usize,
    pub policy: FieldPolicy,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            store_root: None,
            parser_filter: None,
            workers: default_worker_count(),
            policy: FieldPolicy::with_default_exclusions(),
        }
    }
}

/// Central coordination object, constructed once per invocation.
///
/// The catalog is enumerated eagerly so `total` is known before any
/// execution; mutation paths never touch the catalog and run strictly in the
/// caller's thread.
pub struct Tester {
    registry: Arc<ParserRegistry>,
    store: ResultStore,
    policy: FieldPolicy,
    workers: usize,
    catalog: Catalog,
}

impl Tester {
    pub fn new(registry: ParserRegistry, config: TesterConfig) -> FvResult<Self> {
        let store = ResultStore::new(config.store_root);
        let catalog = Catalog::build(&registry, &store, config.parser_filter.as_deref())?;
        Ok(Self {
            registry: Arc::new(registry),
            store,
            policy: config.policy,
            workers: config.workers,
            catalog,
        })
    }

    /// Catalog size, fixed at construction.
    #[must_use]
    pub fn total(&self) -> usize {
        self.catalog.total()
    }

    // -----------------------------------------------------------------------
    // Execution mode
    // -----------------------------------------------------------------------

    /// Execute every cataloged case and stream verdicts in completion order.
    ///
    /// Consuming the tester makes the single-pass contract explicit: one
    /// orchestration run, one stream. Execution never writes to the store.
    pub fn run(self) -> VerdictStream {
        let registry = Arc::clone(&self.registry);
        let policy = self.policy.clone();
        let runner: CaseRunner = Arc::new(move |case: &TestCase| {
            run_one(&registry, &policy, case)
        });
        ExecutorPool::new(self.workers).execute(self.catalog.into_cases(), runner)
    }

    // -----------------------------------------------------------------------
    // Generation and mutation paths, single-threaded by construction
    // -----------------------------------------------------------------------

    /// Direct, non-pooled invocation for create/update flows. Parser failures
    /// propagate to the caller instead of becoming verdicts.
    pub fn gen_results(&self, parser_identity: &str, input: &Path) -> FvResult<Extraction> {
        let parser = self.registry.resolve(parser_identity)?;
        parser.parse(input)
    }

    /// Regenerate and persist the entry for `input`.
    ///
    /// Refused when the parser fails, emits error diagnostics, or produces an
    /// empty record: a failed generation must never overwrite a previously
    /// good snapshot. Returns false when `replace` is unset and an entry for
    /// the filename already exists.
    pub fn update_test_results(
        &self,
        parser_identity: &str,
        input: &Path,
        replace: bool,
    ) -> FvResult<bool> {
        let parser = self.registry.resolve(parser_identity)?;
        let filename = input.display().to_string();
        let extraction = parser.parse(input)?;

        if extraction.has_errors() {
            return Err(FvError::DiagnosticsEmitted {
                parser: parser.name().to_owned(),
                input: filename,
                count: extraction.error_count(),
            });
        }
        let mut metadata = extraction.metadata;
        metadata.remove("filename");
        if metadata.is_empty() {
            return Err(FvError::execution(
                parser.name(),
                &filename,
                "parser produced no metadata",
            ));
        }

        let path = self.store.results_filepath(parser.name(), parser.origin_dir());
        self.store
            .update_test_results(&path, &filename, metadata, replace)
    }

    /// Remove entries by filename; returns which were actually present.
    pub fn remove_test_results(
        &self,
        parser_identity: &str,
        filenames: &[String],
    ) -> FvResult<Vec<String>> {
        let parser = self.registry.resolve(parser_identity)?;
        let path = self.store.results_filepath(parser.name(), parser.origin_dir());
        self.store.remove_test_results(&path, filenames)
    }

    /// Filenames currently recorded for a parser, in storage order.
    pub fn list_test_files(&self, parser_identity: &str) -> FvResult<Vec<String>> {
        let parser = self.registry.resolve(parser_identity)?;
        let path = self.store.results_filepath(parser.name(), parser.origin_dir());
        self.store.list_test_files(parser.name(), &path)
    }

    /// Where a parser's results file lives under the configured root.
    pub fn results_filepath(&self, parser_identity: &str) -> FvResult<PathBuf> {
        let parser = self.registry.resolve(parser_identity)?;
        Ok(self.store.results_filepath(parser.name(), parser.origin_dir()))
    }
}

/// Run one case to a verdict: resolve, execute, strip the reserved filename
/// key, compare. Failures become `Errored` verdicts; a resolution failure
/// keeps an absent run time because execution never started.
fn run_one(registry: &ParserRegistry, policy: &FieldPolicy, case: &TestCase) -> TestResult {
    let parser = match registry.resolve(&case.parser) {
        Ok(parser) => parser,
        Err(error) => {
            return TestResult::errored(&case.parser, &case.filename, None, error.to_string());
        }
    };

    let started = Instant::now();
    match parser.parse(Path::new(&case.filename)) {
        Ok(extraction) => {
            let run_time = started.elapsed().as_secs_f64();
            let mut actual = extraction.metadata;
            actual.remove("filename");
            let expected = case.expected.clone().unwrap_or_default();
            let differences = compare(&expected, &actual, policy);
            if differences.is_empty() {
                TestResult::passed(&case.parser, &case.filename, Some(run_time))
            } else {
                TestResult::failed(&case.parser, &case.filename, Some(run_time), differences)
            }
        }
        Err(error) => {
            let run_time = started.elapsed().as_secs_f64();
            tracing::debug!(
                parser = %case.parser,
                filename = %case.filename,
                error = %error,
                "parser execution failed"
            );
            TestResult::errored(&case.parser, &case.filename, Some(run_time), error.to_string())
        }
    }
}
