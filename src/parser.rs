//! Parser plugins: the execution contract, the registry that resolves parser
//! identities, and the manifest-discovered command adapter.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FvError, FvResult};
use crate::model::{Diagnostic, Extraction, MetadataRecord};
use crate::process;

/// Contract for a metadata-extraction parser.
///
/// Implementations must be callable from multiple worker threads at once;
/// anything stateful belongs inside `parse` invocations.
pub trait Parser: Send + Sync {
    /// Unqualified parser name.
    fn name(&self) -> &str;

    /// Registration source, used to qualify same-named parsers
    /// (`source:name`).
    fn source(&self) -> &str;

    /// Directory whose `parsertests/` subdirectory holds this parser's
    /// results file by default.
    fn origin_dir(&self) -> &Path;

    /// Extract metadata from one input artifact. Errors signal unrecoverable
    /// failure; recoverable problems belong in the extraction's diagnostics.
    fn parse(&self, input: &Path) -> FvResult<Extraction>;
}

/// `source:name`, the unambiguous form of a parser identity.
#[must_use]
pub fn qualified_name(parser: &dyn Parser) -> String {
    format!("{}:{}", parser.source(), parser.name())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds every registered parser and resolves identities to exactly one.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn Parser>>,
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.len())
            .finish_non_exhaustive()
    }
}

impl ParserRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Arc<dyn Parser>) {
        tracing::debug!(
            parser = %qualified_name(parser.as_ref()),
            "registered parser"
        );
        self.parsers.push(parser);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Parser>> {
        self.parsers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Resolve `name` or `source:name` to exactly one registered parser.
    ///
    /// Zero matches is `ParserNotFound`; more than one is `ParserAmbiguous`
    /// listing every qualified candidate, so the caller can requalify.
    pub fn resolve(&self, identity: &str) -> FvResult<&Arc<dyn Parser>> {
        let (want_source, want_name) = match identity.split_once(':') {
            Some((source, name)) => (Some(source), name),
            None => (None, identity),
        };

        let matches: Vec<&Arc<dyn Parser>> = self
            .parsers
            .iter()
            .filter(|p| {
                p.name() == want_name
                    && want_source.is_none_or(|source| p.source() == source)
            })
            .collect();

        match matches.len() {
            0 => Err(FvError::ParserNotFound(identity.to_owned())),
            1 => Ok(matches[0]),
            _ => {
                let candidates: Vec<String> = matches
                    .iter()
                    .map(|p| qualified_name(p.as_ref()))
                    .collect();
                Err(FvError::ambiguous_parser(identity, &candidates))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest discovery
// ---------------------------------------------------------------------------

/// File a parser directory must contain to be discoverable.
pub const MANIFEST_FILE: &str = "parsers.json";

/// One manifest record describing a command-backed parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    /// Defaults to the manifest directory's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Program plus leading arguments; the input path is appended.
    pub command: Vec<String>,
}

/// Load `parsers.json` from `dir` into a fresh registry.
pub fn discover_parsers(dir: &Path) -> FvResult<ParserRegistry> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(FvError::InvalidRequest(format!(
            "no {MANIFEST_FILE} in `{}`",
            dir.display()
        )));
    }

    let raw = fs::read_to_string(&manifest_path)?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&raw).map_err(|error| {
        FvError::InvalidRequest(format!(
            "invalid manifest `{}`: {error}",
            manifest_path.display()
        ))
    })?;

    // Absolute origin keeps default store locations independent of the
    // working directory.
    let origin_dir = fs::canonicalize(dir)?;
    let default_source = dir
        .file_name()
        .map_or_else(|| "local".to_owned(), |n| n.to_string_lossy().into_owned());

    let mut registry = ParserRegistry::new();
    let mut seen = std::collections::BTreeSet::new();
    for entry in entries {
        let source = entry.source.unwrap_or_else(|| default_source.clone());
        if !seen.insert((source.clone(), entry.name.clone())) {
            return Err(FvError::InvalidRequest(format!(
                "duplicate parser `{source}:{}` in `{}`",
                entry.name,
                manifest_path.display()
            )));
        }
        let parser = CommandParser::new(entry.name, source, origin_dir.clone(), entry.command)?;
        registry.register(Arc::new(parser));
    }

    tracing::info!(
        count = registry.len(),
        dir = %origin_dir.display(),
        "discovered parsers"
    );
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Command-backed parser
// ---------------------------------------------------------------------------

/// Runs an external command against the input and reads one JSON object of
/// metadata from its stdout. Stderr lines become diagnostics: lines starting
/// with `warning` keep warning severity, everything else is an error.
#[derive(Debug)]
pub struct CommandParser {
    name: String,
    source: String,
    origin_dir: PathBuf,
    command: Vec<String>,
}

impl CommandParser {
    pub fn new(
        name: String,
        source: String,
        origin_dir: PathBuf,
        command: Vec<String>,
    ) -> FvResult<Self> {
        if command.is_empty() {
            return Err(FvError::InvalidRequest(format!(
                "parser `{source}:{name}` has an empty command"
            )));
        }
        Ok(Self {
            name,
            source,
            origin_dir,
            command,
        })
    }
}

impl Parser for CommandParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn origin_dir(&self) -> &Path {
        &self.origin_dir
    }

    fn parse(&self, input: &Path) -> FvResult<Extraction> {
        let program = &self.command[0];
        let mut args: Vec<String> = self.command[1..].to_vec();
        args.push(input.display().to_string());

        let output = process::run_command(program, &args, None)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        let metadata: MetadataRecord = if trimmed.is_empty() {
            MetadataRecord::new()
        } else {
            serde_json::from_str(trimmed).map_err(|error| {
                FvError::execution(
                    &self.name,
                    &input.display().to_string(),
                    format!("stdout is not a json object: {error}"),
                )
            })?
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics: Vec<Diagnostic> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if line.to_ascii_lowercase().starts_with("warning") {
                    Diagnostic::warning(line)
                } else {
                    Diagnostic::error(line)
                }
            })
            .collect();

        Ok(Extraction {
            metadata,
            diagnostics,
        })
    }
}
