//! # Preflight
//!
//! Early checks explaining why attaching or pinning will likely fail. Those
//! only warn: the run is best effort and some directives could still succeed.

use std::{collections::BTreeSet, path::Path};

use anyhow::Result;
use caps::{CapSet, Capability};
use log::warn;
use nix::sys::statfs::{statfs, BPF_FS_MAGIC};

use super::config::Directive;

pub(crate) fn check(directives: &[Directive]) {
    match check_capabilities() {
        Ok(warnings) => warnings.iter().for_each(|w| warn!("{w}")),
        Err(e) => warn!("Could not check capabilities: {e}"),
    }
    check_pin_dirs(directives)
        .iter()
        .for_each(|w| warn!("{w}"));
}

fn check_capabilities() -> Result<Vec<String>> {
    let has = |cap| caps::has_cap(None, CapSet::Effective, cap);
    let mut warnings = Vec::new();

    // CAP_SYS_ADMIN covers everything on kernels predating CAP_BPF.
    if has(Capability::CAP_SYS_ADMIN)? {
        return Ok(warnings);
    }
    if !has(Capability::CAP_BPF)? {
        warnings.push(
            "Missing CAP_BPF (or CAP_SYS_ADMIN): the object will likely fail to load.".to_string(),
        );
    }
    if !has(Capability::CAP_PERFMON)? {
        warnings.push(
            "Missing CAP_PERFMON (or CAP_SYS_ADMIN): probes will likely fail to attach."
                .to_string(),
        );
    }
    Ok(warnings)
}

/// Links can only be pinned on a BPF filesystem.
fn check_pin_dirs(directives: &[Directive]) -> Vec<String> {
    let dirs: BTreeSet<&Path> = directives
        .iter()
        .filter_map(|d| d.pin_path.parent())
        .map(|p| match p.as_os_str().is_empty() {
            true => Path::new("."),
            false => p,
        })
        .collect();

    dirs.into_iter()
        .filter_map(|dir| match statfs(dir) {
            Ok(fs) if fs.filesystem_type() == BPF_FS_MAGIC => None,
            Ok(_) => Some(format!(
                "{} is not on a BPF filesystem (e.g. /sys/fs/bpf): pinning there will fail.",
                dir.display()
            )),
            Err(e) => Some(format!("Cannot use {} for pinning: {e}", dir.display())),
        })
        .collect()
}
