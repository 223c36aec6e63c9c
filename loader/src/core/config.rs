//! # Config
//!
//! Parsing of the attachment directives. Each non-comment line of a
//! configuration source describes one program to attach and where to pin the
//! resulting link:
//!
//! ```text
//! <pin_path> <program_name> <probe_kind> <target>
//! ```
//!
//! Malformed lines are reported and skipped, they never stop the parsing.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    str::FromStr,
};

use log::warn;

/// Default configuration source, used when none is given.
pub(crate) const DEFAULT_CONFIG: &str = "/config.txt";

// Field limits, in bytes.
pub(crate) const PIN_PATH_MAX: usize = 255;
pub(crate) const PROGRAM_NAME_MAX: usize = 63;
pub(crate) const PROBE_KIND_MAX: usize = 15;
pub(crate) const TARGET_MAX: usize = 63;

/// Hook classes a directive can target.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum ProbeKind {
    Tracepoint,
    KProbeEntry,
    KProbeReturn,
}

impl ProbeKind {
    pub(crate) fn to_str(&self) -> &'static str {
        use ProbeKind::*;
        match self {
            Tracepoint => "tracepoint",
            KProbeEntry => "kprobe",
            KProbeReturn => "kretprobe",
        }
    }
}

impl FromStr for ProbeKind {
    type Err = ParseErrorReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ProbeKind::*;
        Ok(match s {
            "tracepoint" => Tracepoint,
            "kprobe" => KProbeEntry,
            "kretprobe" => KProbeReturn,
            x => return Err(ParseErrorReason::UnsupportedKind(x.to_string())),
        })
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// A single attachment request, as read from one configuration line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Directive {
    /// Line the directive was read from, starting at 1.
    pub(crate) line: usize,
    /// Where the link is pinned once attached.
    pub(crate) pin_path: PathBuf,
    /// Program name, or section title for older objects.
    pub(crate) program_name: String,
    pub(crate) kind: ProbeKind,
    /// Kind dependent: "group:name" for tracepoints, a symbol for kprobes.
    pub(crate) target: String,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}:{} (pin: {})",
            self.program_name,
            self.kind,
            self.target,
            self.pin_path.display()
        )
    }
}

/// Why a configuration line was rejected.
#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub(crate) enum ParseErrorReason {
    #[error("expected 4 fields (pin_path program_name probe_kind target), found {0}")]
    TokenCount(usize),
    #[error("{field} is {len} bytes long (max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("unsupported probe type '{0}' (supported types: tracepoint, kprobe, kretprobe)")]
    UnsupportedKind(String),
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
#[error("line {line}: {reason}")]
pub(crate) struct ParseError {
    pub(crate) line: usize,
    pub(crate) reason: ParseErrorReason,
}

/// Fatal errors of the configuration reader.
#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Failed to open config file {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("Failed to read config file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("No valid probe configurations found in {path}")]
    NoDirectives { path: String },
}

/// Where directives are read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ConfigSource {
    File(PathBuf),
    Stdin,
}

impl ConfigSource {
    pub(crate) fn open(&self) -> Result<Box<dyn BufRead>, ConfigError> {
        Ok(match self {
            ConfigSource::Stdin => Box::new(BufReader::new(io::stdin())),
            ConfigSource::File(path) => {
                Box::new(BufReader::new(File::open(path).map_err(|source| {
                    ConfigError::Open {
                        path: self.to_string(),
                        source,
                    }
                })?))
            }
        })
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::File(PathBuf::from(DEFAULT_CONFIG))
    }
}

impl From<&str> for ConfigSource {
    fn from(s: &str) -> Self {
        match s {
            "-" => ConfigSource::Stdin,
            path => ConfigSource::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Stdin => write!(f, "<stdin>"),
        }
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ParseErrorReason> {
    match value.len() {
        len if len > max => Err(ParseErrorReason::FieldTooLong { field, len, max }),
        _ => Ok(()),
    }
}

/// Parse a single configuration line. Comments and blank lines give
/// `Ok(None)`.
pub(crate) fn parse_line(line_number: usize, line: &str) -> Result<Option<Directive>, ParseError> {
    let line = line.trim_end_matches('\n').trim_end_matches('\r');
    if line.starts_with('#') || line.trim().is_empty() {
        return Ok(None);
    }

    parse_fields(line_number, line)
        .map(Some)
        .map_err(|reason| ParseError {
            line: line_number,
            reason,
        })
}

fn parse_fields(line: usize, input: &str) -> Result<Directive, ParseErrorReason> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    let [pin_path, program_name, kind, target] = tokens[..] else {
        return Err(ParseErrorReason::TokenCount(tokens.len()));
    };

    check_len("pin_path", pin_path, PIN_PATH_MAX)?;
    check_len("program_name", program_name, PROGRAM_NAME_MAX)?;
    check_len("probe_kind", kind, PROBE_KIND_MAX)?;
    check_len("target", target, TARGET_MAX)?;

    Ok(Directive {
        line,
        pin_path: PathBuf::from(pin_path),
        program_name: program_name.to_string(),
        kind: kind.parse()?,
        target: target.to_string(),
    })
}

/// Read all directives from `reader`, in order. Rejected lines are logged and
/// skipped. When `max` is set, reading stops once that many directives were
/// accepted.
pub(crate) fn read_directives<R: BufRead>(
    reader: R,
    source: &ConfigSource,
    max: Option<usize>,
) -> Result<Vec<Directive>, ConfigError> {
    let mut directives = Vec::new();

    for (i, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|source_err| ConfigError::Read {
            path: source.to_string(),
            source: source_err,
        })?;

        if max.is_some_and(|max| directives.len() >= max) {
            warn!(
                "Only the first {} probe configuration(s) are used, ignoring the rest of {source}",
                directives.len()
            );
            break;
        }

        let parsed = match String::from_utf8(raw) {
            Ok(line) => parse_line(i + 1, &line),
            Err(_) => Err(ParseError {
                line: i + 1,
                reason: ParseErrorReason::InvalidUtf8,
            }),
        };

        match parsed {
            Ok(Some(directive)) => directives.push(directive),
            Ok(None) => (),
            Err(e) => warn!("Skipping {source} {e}"),
        }
    }

    if directives.is_empty() {
        return Err(ConfigError::NoDirectives {
            path: source.to_string(),
        });
    }

    Ok(directives)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use test_case::test_case;

    use super::*;

    fn read(input: &str, max: Option<usize>) -> Result<Vec<Directive>, ConfigError> {
        read_directives(Cursor::new(input), &ConfigSource::Stdin, max)
    }

    #[test]
    fn parse_kprobe() {
        let d = parse_line(1, "/p/a prog1 kprobe __kmalloc\n").unwrap().unwrap();
        assert_eq!(d.pin_path, PathBuf::from("/p/a"));
        assert_eq!(d.program_name, "prog1");
        assert_eq!(d.kind, ProbeKind::KProbeEntry);
        assert_eq!(d.target, "__kmalloc");
        assert_eq!(d.line, 1);
    }

    #[test]
    fn parse_aligned_columns() {
        let d = parse_line(
            3,
            concat!(
                "/pinned/vdiff_write   tracepoint/sys_enter_write",
                "\ttracepoint syscalls:sys_enter_write\r\n"
            ),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.pin_path, PathBuf::from("/pinned/vdiff_write"));
        assert_eq!(d.program_name, "tracepoint/sys_enter_write");
        assert_eq!(d.kind, ProbeKind::Tracepoint);
        assert_eq!(d.target, "syscalls:sys_enter_write");
    }

    #[test_case("tracepoint", ProbeKind::Tracepoint ; "tracepoint")]
    #[test_case("kprobe", ProbeKind::KProbeEntry ; "kprobe")]
    #[test_case("kretprobe", ProbeKind::KProbeReturn ; "kretprobe")]
    fn parse_kinds(kind: &str, expected: ProbeKind) {
        let d = parse_line(1, &format!("/p x {kind} y")).unwrap().unwrap();
        assert_eq!(d.kind, expected);
        assert_eq!(d.kind.to_str(), kind);
    }

    #[test_case("" ; "empty")]
    #[test_case("\n" ; "newline")]
    #[test_case("   \t" ; "whitespace")]
    #[test_case("# /p/a prog1 kprobe __kmalloc" ; "comment")]
    #[test_case("#" ; "bare hash")]
    fn skipped_lines(line: &str) {
        assert_eq!(parse_line(1, line), Ok(None));
    }

    #[test_case("/p/a prog1 kprobe", 3 ; "too few")]
    #[test_case("/p/a prog1 kprobe __kmalloc extra", 5 ; "too many")]
    #[test_case("  # indented comment", 3 ; "indented comment")]
    fn wrong_token_count(line: &str, count: usize) {
        assert_eq!(
            parse_line(7, line),
            Err(ParseError {
                line: 7,
                reason: ParseErrorReason::TokenCount(count),
            })
        );
    }

    #[test]
    fn unsupported_kind() {
        let err = parse_line(2, "/p/a prog1 uprobe malloc").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(
            err.reason,
            ParseErrorReason::UnsupportedKind("uprobe".to_string())
        );
    }

    #[test]
    fn field_limits() {
        let at_limit = "a".repeat(TARGET_MAX);
        assert!(parse_line(1, &format!("/p prog kprobe {at_limit}")).is_ok());

        let long = "a".repeat(TARGET_MAX + 1);
        assert_eq!(
            parse_line(1, &format!("/p prog kprobe {long}"))
                .unwrap_err()
                .reason,
            ParseErrorReason::FieldTooLong {
                field: "target",
                len: TARGET_MAX + 1,
                max: TARGET_MAX,
            }
        );

        let long = format!("/{}", "p".repeat(PIN_PATH_MAX));
        assert!(matches!(
            parse_line(1, &format!("{long} prog kprobe sym"))
                .unwrap_err()
                .reason,
            ParseErrorReason::FieldTooLong {
                field: "pin_path",
                ..
            }
        ));

        let long = "p".repeat(PROGRAM_NAME_MAX + 1);
        assert!(matches!(
            parse_line(1, &format!("/p {long} kprobe sym"))
                .unwrap_err()
                .reason,
            ParseErrorReason::FieldTooLong {
                field: "program_name",
                ..
            }
        ));
    }

    #[test]
    fn read_in_order() {
        let directives = read(
            "# probes\n\
             /p/a prog1 kprobe __kmalloc\n\
             \n\
             broken line\n\
             /p/b prog2 tracepoint syscalls:sys_enter_write\n\
             /p/c prog3 kretprobe kmem_cache_alloc",
            None,
        )
        .unwrap();

        assert_eq!(directives.len(), 3);
        assert_eq!(directives[0].program_name, "prog1");
        assert_eq!(directives[0].line, 2);
        assert_eq!(directives[1].program_name, "prog2");
        assert_eq!(directives[1].line, 5);
        assert_eq!(directives[2].program_name, "prog3");
        assert_eq!(directives[2].kind, ProbeKind::KProbeReturn);
    }

    #[test]
    fn read_no_directives() {
        assert!(matches!(
            read("# nothing here\n\n#\n", None),
            Err(ConfigError::NoDirectives { .. })
        ));
        assert!(matches!(
            read("", None),
            Err(ConfigError::NoDirectives { .. })
        ));
        assert!(matches!(
            read("only three tokens\n", None),
            Err(ConfigError::NoDirectives { .. })
        ));
    }

    #[test]
    fn read_invalid_utf8() {
        let mut input = b"/p/a prog1 kprobe \xff\xfe\n".to_vec();
        input.extend_from_slice(b"/p/b prog2 kprobe sym\n");

        let directives =
            read_directives(Cursor::new(input), &ConfigSource::Stdin, None).unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].line, 2);
    }

    #[test]
    fn read_max_directives() {
        let input = "/p/a a kprobe a\n/p/b b kprobe b\n/p/c c kprobe c\n";

        assert_eq!(read(input, None).unwrap().len(), 3);
        assert_eq!(read(input, Some(3)).unwrap().len(), 3);

        let directives = read(input, Some(2)).unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[1].program_name, "b");
    }

    #[test]
    fn config_source() {
        assert_eq!(ConfigSource::from("-"), ConfigSource::Stdin);
        assert_eq!(
            ConfigSource::from("/etc/probes.txt"),
            ConfigSource::File(PathBuf::from("/etc/probes.txt"))
        );
        assert_eq!(ConfigSource::default().to_string(), DEFAULT_CONFIG);
        assert!(matches!(
            ConfigSource::from("/does/not/exist").open(),
            Err(ConfigError::Open { .. })
        ));
    }

    #[test]
    fn config_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "/p/a prog1 kprobe __kmalloc").unwrap();

        let source = ConfigSource::File(file.path().to_path_buf());
        let directives = read_directives(source.open().unwrap(), &source, None).unwrap();
        assert_eq!(directives.len(), 1);
    }
}
