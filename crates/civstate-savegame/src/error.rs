//! Error types and the warning collector for savegame loading and saving.
//!
//! Two severities exist. Fatal problems are returned as [`LoadError`] and
//! abort the load. Problems with a clear fallback are recorded in
//! [`Diagnostics`] and loading continues.

use crate::secfile::SectionFileError;
use std::fmt;

/// Fatal load failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("section file error: {0}")]
    SectionFile(#[from] SectionFileError),
    #[error("savefile has no valid version number")]
    MissingVersion,
    #[error("savefile version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: i64, supported: i64 },
    #[error("savefile capabilities '{found}' do not provide required '{required}'")]
    Capability { required: String, found: String },
    #[error("unknown terrain identifier '{identifier}' at ({x}, {y})")]
    UnknownTerrain { identifier: char, x: u32, y: u32 },
    #[error("migration to version {version} failed: {message}")]
    Migration { version: u32, message: String },
    #[error("corrupt savefile: {0}")]
    Corrupt(String),
    #[error("savefile does not match the ruleset: {0}")]
    Ruleset(String),
    #[error("{phase}: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<LoadError>,
    },
}

impl LoadError {
    /// The underlying error, without phase wrapping.
    pub fn root(&self) -> &LoadError {
        match self {
            LoadError::Phase { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Save failures.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("section file error: {0}")]
    SectionFile(#[from] SectionFileError),
    #[error("game state cannot be saved: {0}")]
    InvalidState(String),
}

/// A non-fatal problem found and repaired while loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Load phase that produced the warning.
    pub phase: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)
    }
}

/// Collects warnings. Every warning is also logged.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    phase: &'static str,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent warnings to a phase.
    pub fn set_phase(&mut self, phase: &'static str) {
        self.phase = phase;
    }

    /// Record and log a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(phase = self.phase, "{}", message);
        self.items.push(Diagnostic {
            phase: self.phase,
            message,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any warning message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.items.iter().any(|d| d.message.contains(needle))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_phases() {
        let err = LoadError::Phase {
            phase: "LoadMap",
            source: Box::new(LoadError::MissingVersion),
        };
        assert!(matches!(err.root(), LoadError::MissingVersion));
        assert_eq!(
            err.to_string(),
            "LoadMap: savefile has no valid version number"
        );
    }

    #[test]
    fn test_diagnostics_record_phase() {
        let mut diag = Diagnostics::new();
        diag.set_phase("LoadMap");
        diag.warn("row 3 is short");
        diag.set_phase("LoadPlayersFull");
        diag.warn("dangling home city");

        assert_eq!(diag.len(), 2);
        let phases: Vec<_> = diag.iter().map(|d| d.phase).collect();
        assert_eq!(phases, vec!["LoadMap", "LoadPlayersFull"]);
        assert!(diag.mentions("dangling"));
        assert_eq!(
            diag.iter().next().unwrap().to_string(),
            "[LoadMap] row 3 is short"
        );
    }
}
