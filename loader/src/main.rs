use std::process::ExitCode;

use anyhow::Result;
use log::error;

mod cli;
mod core;
mod helpers;

use crate::{
    cli::LoaderCli,
    core::{libbpf, libbpf::LibbpfModule},
    helpers::logger::{parse_level, Logger},
};

fn main() -> ExitCode {
    let cli = LoaderCli::parse_args();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match cli.loader().run::<LibbpfModule>() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &LoaderCli) -> Result<()> {
    Logger::init(parse_level(&cli.log_level)?)?;
    libbpf::forward_libbpf_logs();
    Ok(())
}
