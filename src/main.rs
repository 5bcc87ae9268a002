//! Purpose: `navigate` resolver entry point.
//! Role: Binary crate root; parses args, runs one action, prints a target directory on stdout.
//! Invariants: Exit status 0 means stdout holds exactly one directory for the wrapper to `cd` into.
//! Invariants: Targetless successes exit with `NO_TARGET_EXIT` and print nothing on stdout.
//! Invariants: Errors are emitted on stderr (human text on a TTY, JSON otherwise).
//! Invariants: All database mutations go through `Store::update` (lock + atomic rewrite).
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell as CompletionShell;
use serde::Serialize;
use std::error::Error as StdError;

mod command_dispatch;

use navigate::core::error::{Error, ErrorKind, to_exit_code};
use navigate::shell::Shell;

/// Exit status for successful actions that produce no directory (add, mark,
/// ignore, listings). Non-zero keeps the wrapper from treating them as a jump.
const NO_TARGET_EXIT: i32 = 1;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn no_target() -> Self {
        Self {
            exit_code: NO_TARGET_EXIT,
        }
    }
}

fn main() {
    navigate::logging::init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(RunOutcome::ok());
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `navigate --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch(cli).map_err(|err| (add_io_hint(err), color_mode))
}

#[derive(Parser)]
#[command(
    name = "navigate",
    version,
    about = "Efficient directory navigation",
    long_about = r#"Efficient directory navigation.

Prints the directory to jump to on stdout. A shell function (see --init) captures
it and runs `cd` in your shell; a program cannot change its parent's directory."#,
    after_help = r#"EXAMPLES
  $ eval "$(navigate --init bash)"      # install the `nav` function and `n` alias
  $ nav ~/src                           # plain cd
  $ nav f src api                       # most frequent dir matching "src" and "api"
  $ nav r logs                          # most recent dir matching "logs"
  $ nav -m work                         # mark the current directory as "work"
  $ nav -j work                         # jump to the "work" mark
  $ nav                                 # interactive menu

NOTES
  - The database lives in $NAVIGATE_DATA/navigate.json (or --data-dir)
  - Exit status 0 means stdout holds a directory; every other action exits non-zero"#
)]
struct Cli {
    #[arg(
        value_name = "DIRECTORY",
        help = "Directory, or a search: f|r followed by terms that must all match",
        long_help = r#"Change the current working directory.

With one argument the value is printed as-is. With several, the first selects the
search order (f: most frequent first, r: most recent first) and the remaining
arguments are search terms that must all appear in the directory."#
    )]
    directory: Vec<String>,
    #[arg(short = 'a', long, value_name = "DIR", help = "Add the given directory to the database")]
    add: Option<String>,
    #[arg(
        short = 'c',
        long = "current-directory",
        alias = "current_directory",
        value_name = "DIR",
        help = "Override the current directory (keeps symlinked paths as the shell sees them)",
        value_hint = ValueHint::DirPath
    )]
    current_directory: Option<String>,
    #[arg(short = 'm', long, value_name = "NAME", help = "Mark the current directory with NAME")]
    mark: Option<String>,
    #[arg(short = 'd', long, help = "Remove information from the database (with -m or -i)")]
    delete: bool,
    #[arg(short = 'i', long, help = "Ignore the current directory for all purposes")]
    ignore: bool,
    #[arg(short = 'j', long, value_name = "NAME", help = "Jump to the given mark")]
    jump: Option<String>,
    #[arg(
        long,
        env = "NAVIGATE_DATA",
        value_name = "DIR",
        help = "Directory holding navigate.json",
        value_hint = ValueHint::DirPath
    )]
    data_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "NAVIGATE_MAX_AGE_DAYS",
        default_value_t = 30,
        value_name = "DAYS",
        help = "Forget directories not visited for this many days"
    )]
    max_age_days: u64,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize marks and diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        value_enum,
        value_name = "SHELL",
        help = "Print the shell function that wraps navigate",
        help_heading = "Shell integration"
    )]
    init: Option<Shell>,
    #[arg(
        long,
        default_value = "nav",
        value_name = "NAME",
        help = "Function name for --init (alias is its first letter)",
        help_heading = "Shell integration"
    )]
    cmd: String,
    #[arg(
        long,
        conflicts_with = "eval",
        help = "With --init: skip the -c/-a bookkeeping calls",
        help_heading = "Shell integration"
    )]
    no_announce: bool,
    #[arg(
        long,
        help = "With --init: delegate to nav-eval and eval its output",
        help_heading = "Shell integration"
    )]
    eval: bool,
    #[arg(
        long,
        value_name = "SHELL",
        help = "Print a completion script for SHELL",
        help_heading = "Shell integration"
    )]
    completion: Option<CompletionShell>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn completion_command() -> clap::Command {
    Cli::command()
}

fn add_io_hint(err: Error) -> Error {
    let hint = match (err.hint(), err.kind()) {
        (Some(_), _) => return err,
        (None, ErrorKind::Permission) => "Check ownership of $NAVIGATE_DATA and navigate.json.",
        (None, ErrorKind::Busy) => "Another navigate process holds the database lock. Retry.",
        (None, ErrorKind::Io) => "Check that $NAVIGATE_DATA is writable and the disk is not full.",
        (None, _) => return err,
    };
    err.with_hint(hint)
}

/// Flattened view of an `Error`, rendered either as terminal lines or as the
/// `{"error": {...}}` envelope that scripts parse.
#[derive(Debug, Serialize)]
struct ErrorReport {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<String>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a ErrorReport,
}

impl ErrorReport {
    fn new(err: &Error) -> Self {
        let message = err.message().map_or_else(
            || fallback_message(err.kind()).to_string(),
            str::to_string,
        );
        let causes = std::iter::successors(err.source(), |&cause| cause.source())
            .map(|cause| cause.to_string())
            .collect();
        Self {
            kind: format!("{:?}", err.kind()),
            message,
            hint: err.hint().map(str::to_string),
            path: err.path().map(|path| path.display().to_string()),
            causes,
        }
    }

    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&ErrorEnvelope { error: self })
    }

    /// Shows the first cause only; the JSON form carries the whole chain.
    fn to_text(&self, use_color: bool) -> String {
        let label = |text: &str, code: &str| {
            if use_color {
                format!("\u{1b}[{code}m{text}\u{1b}[0m")
            } else {
                text.to_string()
            }
        };
        let mut out = format!("{} {}", label("error:", RED), self.message);
        let details = [
            ("hint:", self.hint.as_deref()),
            ("path:", self.path.as_deref()),
            ("caused by:", self.causes.first().map(String::as_str)),
        ];
        for (name, value) in details {
            if let Some(value) = value {
                out.push('\n');
                out.push_str(&format!("{} {value}", label(name, YELLOW)));
            }
        }
        out
    }
}

const RED: &str = "31";
const YELLOW: &str = "33";

fn fallback_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::NotFound => "not found",
        ErrorKind::Busy => "database is busy",
        ErrorKind::Permission => "permission denied",
        ErrorKind::Corrupt => "corrupt database",
        ErrorKind::Io => "i/o error",
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let report = ErrorReport::new(err);
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", report.to_text(color_mode.use_color(true)));
        return;
    }
    match report.to_json() {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{}", report.to_text(false)),
    }
}

/// First meaningful line of a clap error, without its `error:` prefix.
fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| {
            line.strip_prefix("error:")
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "invalid arguments".to_string())
}
