//! # Module
//!
//! Interface to a loaded BPF object ("module") and the links created from its
//! programs. The attachment logic only talks to the kernel through these
//! traits; `core::libbpf` provides the real implementation.

use std::{fmt, path::Path};

use anyhow::Result;

/// Reference to a program of a loaded module, by its canonical name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct ProgramRef(String);

impl ProgramRef {
    pub(crate) fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub(crate) fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A kernel link that can outlive the process once pinned.
pub(crate) trait PinnableLink {
    /// Pin the link at `path`.
    fn pin(&mut self, path: &Path) -> Result<()>;
    /// Stop managing the link: dropping it afterwards must leave the kernel
    /// object in place. Only meaningful once pinned.
    fn disconnect(&mut self);
}

/// A loaded module. Its programs are looked up and attached, but the module
/// itself is never reloaded.
pub(crate) trait Module {
    type Link: PinnableLink;

    /// Open and load the module at `path`.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Find a program by its exact name.
    fn find_program(&self, name: &str) -> Option<ProgramRef>;

    /// Find a program by its section title (e.g. "kprobe/__kmalloc"), as
    /// older objects only exposed programs this way.
    fn find_program_by_title(&self, title: &str) -> Option<ProgramRef>;

    /// Names of all programs in the module.
    fn program_names(&self) -> Vec<String>;

    fn attach_tracepoint(
        &mut self,
        prog: &ProgramRef,
        group: &str,
        name: &str,
    ) -> Result<Self::Link>;

    fn attach_kprobe(
        &mut self,
        prog: &ProgramRef,
        symbol: &str,
        retprobe: bool,
    ) -> Result<Self::Link>;

    /// Hand the module over to the kernel. Pinned links keep its programs
    /// alive, so it must not be closed from our side.
    fn release_ownership(self);
}
