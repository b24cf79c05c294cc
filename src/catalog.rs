//! Eager enumeration of test cases. The catalog is built fully before any
//! execution so the total is known up front for progress reporting.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::FvResult;
use crate::model::TestCase;
use crate::parser::{ParserRegistry, qualified_name};
use crate::storage::ResultStore;

/// The complete batch of cases one orchestration run will execute.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cases: Vec<TestCase>,
}

impl Catalog {
    /// Enumerate cases for `parser_filter`, or for every registered parser
    /// with a stored results file when the filter is unset.
    ///
    /// Resolution failures propagate; a resolved parser without a stored
    /// results file contributes zero cases, so freshly-added parsers can be
    /// cataloged before anything was recorded for them. Emitted cases carry
    /// qualified parser names so later resolution can never be ambiguous.
    pub fn build(
        registry: &ParserRegistry,
        store: &ResultStore,
        parser_filter: Option<&str>,
    ) -> FvResult<Self> {
        let mut cases = Vec::new();

        match parser_filter {
            Some(identity) => {
                let parser = registry.resolve(identity)?;
                let path = store.results_filepath(parser.name(), parser.origin_dir());
                if path.exists() {
                    let entries = store.read(parser.name(), &path)?;
                    let identity = qualified_name(parser.as_ref());
                    for entry in entries {
                        cases.push(TestCase {
                            parser: identity.clone(),
                            filename: entry.filename,
                            expected: Some(entry.fields),
                        });
                    }
                } else {
                    tracing::warn!(
                        parser = %qualified_name(parser.as_ref()),
                        path = %path.display(),
                        "no stored results for parser"
                    );
                }
            }
            None => {
                // Same-named parsers from different sources share a results
                // file; visit each file once.
                let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
                for parser in registry.iter() {
                    let path = store.results_filepath(parser.name(), parser.origin_dir());
                    if !seen.insert(path.clone()) {
                        continue;
                    }
                    if !path.exists() {
                        tracing::debug!(
                            parser = %qualified_name(parser.as_ref()),
                            path = %path.display(),
                            "no stored results, skipping"
                        );
                        continue;
                    }
                    let entries = store.read(parser.name(), &path)?;
                    let identity = qualified_name(parser.as_ref());
                    for entry in entries {
                        cases.push(TestCase {
                            parser: identity.clone(),
                            filename: entry.filename,
                            expected: Some(entry.fields),
                        });
                    }
                }
            }
        }

        tracing::debug!(total = cases.len(), "catalog built");
        Ok(Self { cases })
    }

    /// Case count, fixed at build time.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    #[must_use]
    pub fn into_cases(self) -> Vec<TestCase> {
        self.cases
    }
}
