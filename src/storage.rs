//! Persistence for expected-result snapshots.
//!
//! One JSON file per parser: an array of records, each `{"filename": ...,
//! <metadata fields>}`. Files are written with sorted keys, two-space
//! indentation, and a trailing newline, so an update that touches one entry
//! leaves every other entry byte-identical and version-control diffs show
//! only genuine output changes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FvError, FvResult};
use crate::model::MetadataRecord;

/// Subdirectory next to a parser's origin that holds its results file.
pub const RESULTS_DIR_NAME: &str = "parsertests";

/// One persisted expectation: the sample's filename plus its metadata fields,
/// flattened so the on-disk record reads as a single object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCase {
    pub filename: String,
    #[serde(flatten)]
    pub fields: MetadataRecord,
}

/// Directory-of-JSON-files store. `root` overrides the per-parser default
/// location; when unset, each parser's file lives in a `parsertests`
/// directory colocated with the parser's origin.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    root: Option<PathBuf>,
}

impl ResultStore {
    #[must_use]
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Deterministic location of a parser's results file, independent of the
    /// current working directory as long as `origin_dir` is absolute.
    #[must_use]
    pub fn results_filepath(&self, parser_name: &str, origin_dir: &Path) -> PathBuf {
        let file_name = format!("{parser_name}.json");
        match &self.root {
            Some(root) => root.join(file_name),
            None => origin_dir.join(RESULTS_DIR_NAME).join(file_name),
        }
    }

    /// All stored entries for a parser, in storage order.
    ///
    /// A missing file is `StoreMissing`, which callers treat differently
    /// from an empty store (`[]` reads back as an empty vec).
    pub fn read(&self, parser_name: &str, path: &Path) -> FvResult<Vec<StoredCase>> {
        if !path.exists() {
            return Err(FvError::StoreMissing {
                parser: parser_name.to_owned(),
                path: path.to_path_buf(),
            });
        }
        let entries = load_entries(path)?;
        let mut seen = BTreeSet::new();
        for case in &entries {
            if !seen.insert(case.filename.as_str()) {
                return Err(FvError::Storage(format!(
                    "duplicate filename `{}` in `{}`",
                    case.filename,
                    path.display()
                )));
            }
        }
        Ok(entries)
    }

    /// Filenames currently recorded for a parser, in storage order.
    pub fn list_test_files(&self, parser_name: &str, path: &Path) -> FvResult<Vec<String>> {
        Ok(self
            .read(parser_name, path)?
            .into_iter()
            .map(|case| case.filename)
            .collect())
    }

    /// Upsert one entry. With `replace` unset an existing entry is left
    /// alone (merge-skip); the return value says whether the store changed.
    /// A `filename` key inside `metadata` is stripped: the entry key owns
    /// that name and a flattened duplicate would corrupt the record.
    pub fn update_test_results(
        &self,
        path: &Path,
        filename: &str,
        mut metadata: MetadataRecord,
        replace: bool,
    ) -> FvResult<bool> {
        metadata.remove("filename");

        let mut entries = if path.exists() {
            load_entries(path)?
        } else {
            Vec::new()
        };

        match entries.iter_mut().find(|case| case.filename == filename) {
            Some(existing) => {
                if !replace {
                    tracing::debug!(filename, path = %path.display(), "entry exists, skipping");
                    return Ok(false);
                }
                existing.fields = metadata;
            }
            None => entries.push(StoredCase {
                filename: filename.to_owned(),
                fields: metadata,
            }),
        }

        write_entries(path, &entries)?;
        tracing::debug!(filename, path = %path.display(), "stored test results");
        Ok(true)
    }

    /// Remove entries by filename, returning the filenames actually removed.
    /// Absent filenames are skipped silently; a store that was never created
    /// removes nothing. The file is rewritten only when something changed.
    pub fn remove_test_results(
        &self,
        path: &Path,
        filenames: &[String],
    ) -> FvResult<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let entries = load_entries(path)?;

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(entries.len());
        for case in entries {
            if filenames.contains(&case.filename) {
                removed.push(case.filename);
            } else {
                kept.push(case);
            }
        }

        if !removed.is_empty() {
            write_entries(path, &kept)?;
            tracing::debug!(
                path = %path.display(),
                removed = removed.len(),
                "removed test results"
            );
        }
        Ok(removed)
    }
}

fn load_entries(path: &Path) -> FvResult<Vec<StoredCase>> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| {
        FvError::Storage(format!(
            "invalid results file `{}`: {error}",
            path.display()
        ))
    })
}

fn write_entries(path: &Path, entries: &[StoredCase]) -> FvResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut rendered = serde_json::to_string_pretty(entries)?;
    rendered.push('\n');
    fs::write(path, rendered)?;
    Ok(())
}
