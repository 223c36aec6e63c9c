//! # Report
//!
//! Bookkeeping of the per-directive outcomes and the final summary. The run
//! is considered successful as soon as one directive succeeded.

use log::{error, warn};

use super::{config::Directive, errors::DirectiveError};

/// Outcome of the whole run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RunStatus {
    /// Every directive succeeded.
    Complete,
    /// Some directives failed, but at least one succeeded.
    Partial,
    /// No directive succeeded.
    Failed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) total: usize,
    pub(crate) succeeded: usize,
}

impl RunSummary {
    pub(crate) fn status(&self) -> RunStatus {
        match self.succeeded {
            0 => RunStatus::Failed,
            s if s < self.total => RunStatus::Partial,
            _ => RunStatus::Complete,
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        self.status() != RunStatus::Failed
    }
}

/// Outcomes of all directives, kept in directive order.
#[derive(Default)]
pub(crate) struct RunReport<'a> {
    outcomes: Vec<(&'a Directive, Result<(), DirectiveError>)>,
}

impl<'a> RunReport<'a> {
    pub(crate) fn record(&mut self, directive: &'a Directive, outcome: Result<(), DirectiveError>) {
        self.outcomes.push((directive, outcome));
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.outcomes.len(),
            succeeded: self.outcomes.iter().filter(|(_, o)| o.is_ok()).count(),
        }
    }

    /// Failed directives and their reason, in directive order.
    pub(crate) fn failures(&self) -> impl Iterator<Item = (&'a Directive, &DirectiveError)> {
        self.outcomes
            .iter()
            .filter_map(|(d, o)| o.as_ref().err().map(|e| (*d, e)))
    }

    pub(crate) fn print(&self) {
        let summary = self.summary();

        println!("Attachment Summary:");
        println!("==================");
        println!(
            "Successfully attached: {}/{} probes",
            summary.succeeded, summary.total
        );

        match summary.status() {
            RunStatus::Complete => (),
            RunStatus::Partial => {
                warn!("Some probes failed to attach. Check kernel symbols and permissions.");
                self.print_failures();
            }
            RunStatus::Failed => {
                error!("No probes were successfully attached");
                self.print_failures();
            }
        }
    }

    fn print_failures(&self) {
        self.failures().for_each(|(d, e)| {
            println!("  ✗ line {}: {}: {e}", d.line, d.program_name);
        });
    }
}
