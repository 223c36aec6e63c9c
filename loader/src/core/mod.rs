//! # Core
//!
//! Core module: configuration parsing and the attach/pin pipeline built on
//! top of the `Module` interface.

pub(crate) mod attach;
pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod libbpf;
pub(crate) mod loader;
pub(crate) mod module;
pub(crate) mod pin;
pub(crate) mod preflight;
pub(crate) mod report;
pub(crate) mod resolver;

pub(crate) use loader::Loader;
