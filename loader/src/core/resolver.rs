//! # Resolver
//!
//! Finds the program a directive refers to. Programs are looked up by name
//! first and, for objects built by older toolchains, by section title.

use log::debug;

use super::{errors::DirectiveError, module::*};

pub(crate) fn resolve_program<M: Module>(
    module: &M,
    name: &str,
) -> Result<ProgramRef, DirectiveError> {
    if let Some(prog) = module.find_program(name) {
        return Ok(prog);
    }

    match module.find_program_by_title(name) {
        Some(prog) => {
            debug!("Program '{name}' found by section title (program '{prog}')");
            Ok(prog)
        }
        None => Err(DirectiveError::ProgramNotFound {
            name: name.to_string(),
            available: module.program_names(),
        }),
    }
}
