//! Error types shared by the attachment pipeline.

use std::path::PathBuf;

use thiserror::Error;

use super::{attach::Hook, config::ConfigError, config::ProbeKind};

/// Failure of a single directive. Those never stop the run: they are
/// recorded and the next directive is processed.
#[derive(Error, Debug)]
pub(crate) enum DirectiveError {
    #[error("Failed to find program with name or section: {name}")]
    ProgramNotFound { name: String, available: Vec<String> },

    #[error("Invalid {kind} target '{target}': {reason}")]
    InvalidTarget {
        kind: ProbeKind,
        target: String,
        reason: &'static str,
    },

    #[error("Failed to attach to {hook}: {source}")]
    Attach { hook: Hook, source: anyhow::Error },

    #[error("Failed to pin link at {}: {source}", path.display())]
    PinFailed { path: PathBuf, source: anyhow::Error },
}

/// Errors aborting the whole run.
#[derive(Error, Debug)]
pub(crate) enum LoaderError {
    #[error("{}: {source:#}", path.display())]
    ModuleLoad { path: PathBuf, source: anyhow::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No probes were successfully attached (0/{total})")]
    NoAttachment { total: usize },
}
