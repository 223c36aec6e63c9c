//! # Cli
//!
//! Command line interface of the loader: the BPF object to load, the
//! configuration source and a few options controlling the run.

#[allow(clippy::module_inception)]
pub(crate) mod cli;

// Re-export cli.rs
pub(crate) use cli::*;
