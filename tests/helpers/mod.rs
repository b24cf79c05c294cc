#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use franken_verdict::error::{FvError, FvResult};
use franken_verdict::model::{Diagnostic, Extraction, MetadataRecord};
use franken_verdict::parser::{Parser, ParserRegistry};
use franken_verdict::storage::RESULTS_DIR_NAME;
use serde_json::Value;

/// Coerce a `json!` object literal into a metadata record.
pub fn record(value: Value) -> MetadataRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be a json object, got {other}"),
    }
}

/// Parser that emits the same extraction for every input, with optional
/// diagnostics and an optional artificial delay for timing-order tests.
pub struct FixedParser {
    name: String,
    source: String,
    origin: PathBuf,
    fields: MetadataRecord,
    diagnostics: Vec<Diagnostic>,
    delay: Option<Duration>,
}

impl FixedParser {
    pub fn new(name: &str, origin: &Path, fields: Value) -> Self {
        Self {
            name: name.to_owned(),
            source: "test".to_owned(),
            origin: origin.to_path_buf(),
            fields: record(fields),
            diagnostics: Vec::new(),
            delay: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_owned();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Parser for FixedParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn origin_dir(&self) -> &Path {
        &self.origin
    }

    fn parse(&self, _input: &Path) -> FvResult<Extraction> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(Extraction {
            metadata: self.fields.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }
}

/// Parser whose every invocation fails.
pub struct FailingParser {
    name: String,
    origin: PathBuf,
    message: String,
}

impl FailingParser {
    pub fn new(name: &str, origin: &Path, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            origin: origin.to_path_buf(),
            message: message.to_owned(),
        }
    }
}

impl Parser for FailingParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        "test"
    }

    fn origin_dir(&self) -> &Path {
        &self.origin
    }

    fn parse(&self, input: &Path) -> FvResult<Extraction> {
        Err(FvError::execution(
            &self.name,
            &input.display().to_string(),
            self.message.clone(),
        ))
    }
}

/// Parser that fails for inputs whose path contains a marker and emits fixed
/// fields otherwise, for batch continue-on-error tests.
pub struct InputSensitiveParser {
    name: String,
    origin: PathBuf,
    fields: MetadataRecord,
    poison_marker: String,
}

impl InputSensitiveParser {
    pub fn new(name: &str, origin: &Path, fields: Value, poison_marker: &str) -> Self {
        Self {
            name: name.to_owned(),
            origin: origin.to_path_buf(),
            fields: record(fields),
            poison_marker: poison_marker.to_owned(),
        }
    }
}

impl Parser for InputSensitiveParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        "test"
    }

    fn origin_dir(&self) -> &Path {
        &self.origin
    }

    fn parse(&self, input: &Path) -> FvResult<Extraction> {
        let rendered = input.display().to_string();
        if rendered.contains(&self.poison_marker) {
            return Err(FvError::execution(&self.name, &rendered, "refused input"));
        }
        Ok(Extraction {
            metadata: self.fields.clone(),
            diagnostics: Vec::new(),
        })
    }
}

pub fn registry_of(parsers: Vec<Arc<dyn Parser>>) -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    for parser in parsers {
        registry.register(parser);
    }
    registry
}

/// Default on-disk location of a parser's results file.
pub fn store_path(origin: &Path, parser_name: &str) -> PathBuf {
    origin
        .join(RESULTS_DIR_NAME)
        .join(format!("{parser_name}.json"))
}

/// Seed a results file with the given entries, in the store's own format.
pub fn seed_store(origin: &Path, parser_name: &str, entries: &Value) -> PathBuf {
    let path = store_path(origin, parser_name);
    fs::create_dir_all(path.parent().expect("store dir")).expect("create store dir");
    let rendered = serde_json::to_string_pretty(entries).expect("render entries");
    fs::write(&path, rendered + "\n").expect("seed store");
    path
}
