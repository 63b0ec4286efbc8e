use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MutationError;
use crate::rules::MutationRule;

/// One source file and the text it held when processing started.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    path: PathBuf,
    name: String,
    original: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            original: original.into(),
        }
    }

    /// Capture the current contents of `path`.
    pub fn load(path: &Path, name: impl Into<String>) -> Result<Self, MutationError> {
        let original = std::fs::read_to_string(path).map_err(|source| MutationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, name, original))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name, relative to the scanned source directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original(&self) -> &str {
        &self.original
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCandidate {
    /// 1-based position in generation order, used as the `@m<id>` ref.
    pub id: usize,
    /// 0-based line index.
    pub line_index: usize,
    pub original_line: String,
    pub mutated_line: String,
    pub rule: MutationRule,
}

impl MutationCandidate {
    /// 1-based line number for display.
    pub fn line_number(&self) -> usize {
        self.line_index + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// At least one test failed under the mutant.
    Killed,
    /// Every test still passed under the mutant.
    Survived,
    /// No test summary could be read: timeout, crash, compile error.
    Unknown,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Killed => "KILLED",
            Verdict::Survived => "SURVIVED",
            Verdict::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutantOutcome {
    pub candidate: MutationCandidate,
    pub verdict: Verdict,
    pub duration_ms: u64,
    /// Why the verdict is `Unknown`, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub diff: String,
}
