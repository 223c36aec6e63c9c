//! # Loader
//!
//! Drives a run: load the module, read the directives, then attach and pin
//! each of them in order. A failing directive is recorded and the next one is
//! processed; only a module or configuration failure aborts the run.

use std::path::PathBuf;

use log::error;

use super::{
    attach::attach,
    config::{read_directives, ConfigSource, Directive},
    errors::{DirectiveError, LoaderError},
    module::Module,
    pin::persist,
    preflight,
    report::{RunReport, RunSummary},
    resolver::resolve_program,
};

#[derive(Debug, Default)]
pub(crate) struct Loader {
    /// BPF object to load.
    pub(crate) object: PathBuf,
    /// Where directives are read from.
    pub(crate) config: ConfigSource,
    /// Maximum number of directives to use, if any.
    pub(crate) max_directives: Option<usize>,
    /// Run the preflight checks before attaching.
    pub(crate) preflight: bool,
}

impl Loader {
    pub(crate) fn run<M: Module>(&self) -> Result<RunSummary, LoaderError> {
        println!("eBPF Multi-Probe Loader");
        println!("========================");
        println!("Object file: {}", self.object.display());
        println!("Config file: {}\n", self.config);

        // The module is loaded before the configuration is even opened.
        println!("Loading eBPF object file...");
        let module = M::load(&self.object).map_err(|source| LoaderError::ModuleLoad {
            path: self.object.clone(),
            source,
        })?;
        println!("  ✓ eBPF object loaded successfully\n");

        let directives = self.read_config()?;

        if self.preflight {
            preflight::check(&directives);
        }

        self.attach_all(module, &directives)
    }

    fn read_config(&self) -> Result<Vec<Directive>, LoaderError> {
        println!("Reading configuration from {}...", self.config);
        let directives = read_directives(self.config.open()?, &self.config, self.max_directives)?;

        directives.iter().for_each(|d| println!("  Parsed: {d}"));
        println!("  ✓ Found {} probe configuration(s)\n", directives.len());
        Ok(directives)
    }

    /// Attach and pin all directives. The module is handed over to the
    /// kernel if at least one of them succeeded.
    pub(crate) fn attach_all<M: Module>(
        &self,
        mut module: M,
        directives: &[Directive],
    ) -> Result<RunSummary, LoaderError> {
        println!("Attaching probes...");
        let total = directives.len();
        let report = directives
            .iter()
            .enumerate()
            .fold(RunReport::default(), |mut report, (i, directive)| {
                println!("[{}/{total}] Attaching probe: {directive}", i + 1);

                let outcome = process_directive(&mut module, directive);
                if let Err(e) = &outcome {
                    log_failure(directive, e);
                }
                println!();

                report.record(directive, outcome);
                report
            });

        report.print();
        let summary = report.summary();
        if !summary.is_success() {
            return Err(LoaderError::NoAttachment { total });
        }

        module.release_ownership();
        println!(
            "\neBPF program loaded successfully with {} active probe(s)",
            summary.succeeded
        );
        println!("Probe links have been pinned and will remain active.");
        Ok(summary)
    }
}

fn process_directive<M: Module>(
    module: &mut M,
    directive: &Directive,
) -> Result<(), DirectiveError> {
    let prog = resolve_program(module, &directive.program_name)?;
    let link = attach(module, &prog, directive)?;
    persist(link, &directive.pin_path)
}

fn log_failure(directive: &Directive, err: &DirectiveError) {
    error!("{err}");
    if let DirectiveError::ProgramNotFound { available, .. } = err {
        error!("Available programs:");
        available.iter().for_each(|name| error!("  - {name}"));
    }
    error!(
        "  ✗ Failed to attach probe: {} (line {})",
        directive.program_name, directive.line
    );
}
