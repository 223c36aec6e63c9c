use std::{env, ffi::OsString, path::PathBuf, process};

use clap::{builder::PossibleValuesParser, error::Error as ClapError, error::ErrorKind, Parser};

use crate::core::{config::DEFAULT_CONFIG, config::ConfigSource, Loader};

const CONFIG_HELP: &str = "\
Config file format (one probe per line):
  pin_path program_name probe_type probe_target

probe_type is one of tracepoint, kprobe or kretprobe. Tracepoint targets are
given as group:name, kprobe and kretprobe targets are kernel symbols.
program_name is the name of a program in the object or, for older objects,
its section title. Lines starting with '#' are comments.

Example config:
  /sys/fs/bpf/vdiff_kmalloc kretprobe/__kmalloc kretprobe __kmalloc
  /sys/fs/bpf/vdiff_cache kretprobe/kmem_cache_alloc kretprobe kmem_cache_alloc
  /sys/fs/bpf/vdiff_write tracepoint/sys_enter_write tracepoint syscalls:sys_enter_write";

/// Attach the programs of a BPF object to kernel hooks and pin the resulting
/// links.
///
/// Each line of the configuration describes one program to attach and where
/// to pin its link. Pinned links stay active once the loader exits. The run
/// succeeds if at least one probe was attached and pinned.
#[derive(Parser, Debug)]
#[command(name = "loader", version, after_help = CONFIG_HELP)]
pub(crate) struct LoaderCli {
    #[arg(
        long,
        value_parser=PossibleValuesParser::new(["error", "warn", "info", "debug", "trace"]),
        default_value = "info",
        help = "Log level",
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        value_name = "N",
        help = "Only use the first N probe configurations, ignoring the rest of the file"
    )]
    pub(crate) max_directives: Option<usize>,
    #[arg(
        long,
        help = "Do not check capabilities and pinning directories before attaching"
    )]
    pub(crate) no_preflight: bool,
    #[arg(help = "Path to the compiled eBPF object file (e.g. /ebpf-vdiff.o)")]
    pub(crate) object: PathBuf,
    #[arg(
        default_value = DEFAULT_CONFIG,
        help = "Path to the configuration file, or '-' to read it from stdin"
    )]
    pub(crate) config: String,
}

impl LoaderCli {
    /// Parse the process arguments. Usage errors exit with status 1, help and
    /// version requests with status 0.
    pub(crate) fn parse_args() -> Self {
        Self::parse_from_args(env::args_os()).unwrap_or_else(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        })
    }

    /// Parse the given list of arguments. This function should be only used
    /// directly by unit tests.
    pub(crate) fn parse_from_args<I, T>(args: I) -> Result<Self, ClapError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    pub(crate) fn loader(&self) -> Loader {
        Loader {
            object: self.object.clone(),
            config: ConfigSource::from(self.config.as_str()),
            max_directives: self.max_directives,
            preflight: !self.no_preflight,
        }
    }
}
