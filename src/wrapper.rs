//! Purpose: Rust model of the shell wrapper: invoke the resolver, classify, then act.
//! Exports: `classify`, `Resolver`, `CommandResolver`, `ShellState`, `Wrapper`, `logical_join`.
//! Role: Backs `nav-eval` and keeps the wrapper contract testable without a shell.
//! Invariants: Each response is classified exactly once into exactly one `Outcome`.
//! Invariants: Announce runs only after a successful directory change; its result is discarded.
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::error::{Error, ErrorKind};

/// What the resolver produced for one invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: i32,
    pub output: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Non-zero exit. `output` is forwarded verbatim when non-empty.
    ResolverError { status: i32, output: String },
    /// Zero exit and the trimmed output names a directory.
    Navigate { target: PathBuf },
    /// Zero exit but the output is not a directory.
    NotFound { message: String },
}

/// Wrapper function name used in the `--help` hint unless overridden.
pub const DEFAULT_COMMAND: &str = "nav";

/// Classifies a response. `is_dir` answers the directory-existence test for the
/// trimmed output; display text always uses the raw output.
pub fn classify(
    response: &Response,
    command: &str,
    args: &[OsString],
    is_dir: impl Fn(&Path) -> bool,
) -> Outcome {
    if response.status != 0 {
        return Outcome::ResolverError {
            status: response.status,
            output: response.output.clone(),
        };
    }
    let candidate = response.output.trim();
    if !candidate.is_empty() && is_dir(Path::new(candidate)) {
        return Outcome::Navigate {
            target: PathBuf::from(candidate),
        };
    }
    Outcome::NotFound {
        message: not_found_message(command, args, &response.output),
    }
}

/// Same three lines the generated shell functions print.
pub fn not_found_message(command: &str, args: &[OsString], output: &str) -> String {
    let joined = args
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "navigate '{joined}' not found\n{output}\n\
         Use '{command} --help' to see the available options."
    )
}

/// Lexically applies `target` to `cwd` the way a shell's logical `cd` does:
/// `.` and `..` are collapsed without following symlinks.
pub fn logical_join(cwd: &Path, target: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in cwd.join(target).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Boundary to the resolver program: `resolve(cwd, args) -> (status, text)`.
pub trait Resolver {
    fn resolve(&self, cwd: &Path, args: &[OsString]) -> Result<Response, Error>;

    /// Records that the caller entered `dir`. Best-effort; callers ignore failures.
    fn announce(&self, dir: &Path) -> Result<(), Error>;
}

/// Runs the resolver as a child process. stdin and stderr stay attached to the
/// terminal so the interactive menu works; only stdout is captured.
#[derive(Clone, Debug)]
pub struct CommandResolver {
    program: PathBuf,
    pass_cwd: bool,
}

impl CommandResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            pass_cwd: true,
        }
    }

    /// Controls whether `-c <cwd>` is prepended to the forwarded arguments.
    pub fn with_cwd_flag(mut self, pass_cwd: bool) -> Self {
        self.pass_cwd = pass_cwd;
        self
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to execute {}", self.program.display()))
            .with_hint("Check that the navigate binary is installed and on PATH.")
            .with_source(err)
    }
}

impl Resolver for CommandResolver {
    fn resolve(&self, cwd: &Path, args: &[OsString]) -> Result<Response, Error> {
        let mut command = Command::new(&self.program);
        if self.pass_cwd {
            command.arg("-c").arg(cwd);
        }
        let output = command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()
            .map_err(|err| self.spawn_error(err))?;

        // Same as shell command substitution: trailing newlines are dropped.
        let text = String::from_utf8_lossy(&output.stdout);
        let response = Response {
            status: output.status.code().unwrap_or(1),
            output: text.trim_end_matches('\n').to_string(),
        };
        tracing::debug!(status = response.status, "resolver finished");
        Ok(response)
    }

    fn announce(&self, dir: &Path) -> Result<(), Error> {
        let status = Command::new(&self.program)
            .arg("-a")
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| self.spawn_error(err))?;
        tracing::debug!(dir = %dir.display(), code = ?status.code(), "announce finished");
        Ok(())
    }
}

/// The caller's shell as seen by the wrapper.
pub trait ShellState {
    fn current_dir(&self) -> &Path;

    /// Changes directory and returns the new absolute working directory.
    fn change_dir(&mut self, target: &Path) -> Result<PathBuf, Error>;

    /// Prints `text` followed by a newline.
    fn print(&mut self, text: &str);
}

pub struct Wrapper<R> {
    resolver: R,
    announce: bool,
    command: String,
}

impl<R: Resolver> Wrapper<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            announce: true,
            command: DEFAULT_COMMAND.to_string(),
        }
    }

    pub fn with_announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// One synchronous round trip: resolve, classify, act.
    pub fn run<S: ShellState>(&self, shell: &mut S, args: &[OsString]) -> Result<Outcome, Error> {
        let cwd = shell.current_dir().to_path_buf();
        let response = self.resolver.resolve(&cwd, args)?;
        let outcome = classify(&response, &self.command, args, |candidate| {
            logical_join(&cwd, candidate).is_dir()
        });

        match &outcome {
            Outcome::ResolverError { output, .. } => {
                if !output.is_empty() {
                    shell.print(output);
                }
            }
            Outcome::Navigate { target } => {
                let entered = shell.change_dir(target)?;
                if self.announce {
                    if let Err(err) = self.resolver.announce(&entered) {
                        tracing::debug!(error = %err, "announce failed; ignoring");
                    }
                }
            }
            Outcome::NotFound { message } => shell.print(message),
        }
        Ok(outcome)
    }
}
