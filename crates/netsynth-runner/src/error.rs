//! Runner error types.
//!
//! Only failures of the orchestration itself are errors here. A tool that
//! runs and exits nonzero, times out, or writes no netlist is a regular
//! [`SynthesisOutcome`](crate::SynthesisOutcome), not an error.

use std::path::PathBuf;

/// Failures creating or tearing down a scratch directory.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The scratch directory could not be created.
    #[error("failed to create workspace under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written into the workspace.
    #[error("failed to stage {file}: {source}")]
    Stage {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Recursive removal failed. Only ever logged.
    #[error("failed to remove workspace {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the synthesis pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A caller-supplied option failed validation.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The tool binary could not be started (missing, not executable, ...).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
