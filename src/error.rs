use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while discovering, swapping, or reporting on source files.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("failed to walk {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write mutant to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write backup {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The original text could not be put back. The file on disk may still hold a mutant.
    #[error("FAILED TO RESTORE {}: {source}", path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create report directory {}: {source}", path.display())]
    ReportDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load rules from {}: {message}", path.display())]
    Rules { path: PathBuf, message: String },
    #[error("invalid rule `{original}` -> `{mutant}`: {reason}")]
    InvalidRule {
        original: String,
        mutant: String,
        reason: &'static str,
    },
    #[error("failed to copy project tree into {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl MutationError {
    /// True when the error leaves a source file possibly holding mutated content.
    pub fn is_restore_failure(&self) -> bool {
        matches!(self, MutationError::Restore { .. })
    }
}

/// Errors raised while launching or waiting on the external verifier.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier `{0}` not found. Install it or pass --test-cmd.")]
    Missing(String),
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while waiting on `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
