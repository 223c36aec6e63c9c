//! # Libbpf
//!
//! Module implementation on top of libbpf-rs. Objects are opened from a
//! file, loaded once, and their programs attached on demand.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use libbpf_rs::{Object, ObjectBuilder, PrintLevel, TracepointCategory};

use super::module::*;
use crate::helpers::logger::LIBBPF_TARGET;

/// Forward libbpf's own messages to our logger. Its informational output is
/// quite verbose and only shown in debug mode.
pub(crate) fn forward_libbpf_logs() {
    libbpf_rs::set_print(Some((PrintLevel::Debug, print_libbpf)));
}

fn print_libbpf(level: PrintLevel, msg: String) {
    match level {
        PrintLevel::Warn => log::warn!(target: LIBBPF_TARGET, "{msg}"),
        PrintLevel::Info => log::debug!(target: LIBBPF_TARGET, "{msg}"),
        PrintLevel::Debug => log::trace!(target: LIBBPF_TARGET, "{msg}"),
    }
}

pub(crate) struct LibbpfModule {
    object: Object,
}

pub(crate) struct LibbpfLink(libbpf_rs::Link);

impl PinnableLink for LibbpfLink {
    fn pin(&mut self, path: &Path) -> Result<()> {
        Ok(self.0.pin(path)?)
    }

    fn disconnect(&mut self) {
        self.0.disconnect();
    }
}

impl LibbpfModule {
    fn program(&mut self, prog: &ProgramRef) -> Result<libbpf_rs::ProgramMut<'_>> {
        self.object
            .progs_mut()
            .find(|p| p.name() == prog.name())
            .ok_or_else(|| anyhow!("Couldn't get program {prog}"))
    }
}

impl Module for LibbpfModule {
    type Link = LibbpfLink;

    fn load(path: &Path) -> Result<Self> {
        let open_obj = ObjectBuilder::default()
            .open_file(path)
            .context("Failed to open BPF object")?;
        let object = open_obj.load().context("Failed to load BPF object")?;

        Ok(Self { object })
    }

    fn find_program(&self, name: &str) -> Option<ProgramRef> {
        self.object
            .progs()
            .find(|p| p.name() == name)
            .map(|p| ProgramRef::new(p.name().to_string_lossy()))
    }

    fn find_program_by_title(&self, title: &str) -> Option<ProgramRef> {
        self.object
            .progs()
            .find(|p| p.section() == title)
            .map(|p| ProgramRef::new(p.name().to_string_lossy()))
    }

    fn program_names(&self) -> Vec<String> {
        self.object
            .progs()
            .map(|p| p.name().to_string_lossy().into_owned())
            .collect()
    }

    fn attach_tracepoint(
        &mut self,
        prog: &ProgramRef,
        group: &str,
        name: &str,
    ) -> Result<LibbpfLink> {
        let link = self
            .program(prog)?
            .attach_tracepoint(TracepointCategory::Custom(group.to_string()), name)?;
        Ok(LibbpfLink(link))
    }

    fn attach_kprobe(
        &mut self,
        prog: &ProgramRef,
        symbol: &str,
        retprobe: bool,
    ) -> Result<LibbpfLink> {
        let link = self.program(prog)?.attach_kprobe(retprobe, symbol)?;
        Ok(LibbpfLink(link))
    }

    fn release_ownership(self) {
        // Closing the object is not needed for pinned links to work, but
        // their programs now belong to the kernel: keep our references.
        std::mem::forget(self.object);
    }
}
