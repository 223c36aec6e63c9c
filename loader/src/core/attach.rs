//! # Attach
//!
//! Attaches a resolved program to the hook point described by a directive.
//! The hook class is chosen from the directive's probe kind:
//!
//! - tracepoint: the target is "<group>:<name>", split on its first ':'.
//! - kprobe: the target is a kernel symbol, the program runs on entry.
//! - kretprobe: the target is a kernel symbol, the program runs on return.

use std::fmt;

use super::{
    config::{Directive, ProbeKind},
    errors::DirectiveError,
    module::*,
};

/// Hook point a program is attached to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Hook {
    Tracepoint { group: String, name: String },
    Kprobe(String),
    Kretprobe(String),
}

impl Hook {
    /// Build the hook point targeted by a directive. Tracepoint targets
    /// without a group or an event name are rejected.
    pub(crate) fn from_directive(directive: &Directive) -> Result<Hook, DirectiveError> {
        let target = directive.target.as_str();

        Ok(match directive.kind {
            ProbeKind::Tracepoint => {
                let invalid = |reason| DirectiveError::InvalidTarget {
                    kind: directive.kind,
                    target: target.to_string(),
                    reason,
                };

                let (group, name) = target
                    .split_once(':')
                    .ok_or_else(|| invalid("expected 'group:name'"))?;
                if group.is_empty() || name.is_empty() {
                    return Err(invalid("empty tracepoint group or name"));
                }

                Hook::Tracepoint {
                    group: group.to_string(),
                    name: name.to_string(),
                }
            }
            ProbeKind::KProbeEntry => Hook::Kprobe(target.to_string()),
            ProbeKind::KProbeReturn => Hook::Kretprobe(target.to_string()),
        })
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Tracepoint { group, name } => write!(f, "tracepoint: {group}:{name}"),
            Hook::Kprobe(symbol) => write!(f, "kprobe: {symbol}"),
            Hook::Kretprobe(symbol) => write!(f, "kretprobe: {symbol}"),
        }
    }
}

/// Attach `prog` as requested by `directive`. Nothing is attached when the
/// directive's target is invalid.
pub(crate) fn attach<M: Module>(
    module: &mut M,
    prog: &ProgramRef,
    directive: &Directive,
) -> Result<M::Link, DirectiveError> {
    let hook = Hook::from_directive(directive)?;

    let link = match &hook {
        Hook::Tracepoint { group, name } => module.attach_tracepoint(prog, group, name),
        Hook::Kprobe(symbol) => module.attach_kprobe(prog, symbol, false),
        Hook::Kretprobe(symbol) => module.attach_kprobe(prog, symbol, true),
    };

    match link {
        Ok(link) => {
            println!("  ✓ Attached to {hook}");
            Ok(link)
        }
        Err(source) => Err(DirectiveError::Attach { hook, source }),
    }
}
