//! Purpose: `nav-eval`, the wrapper contract as a program whose output the caller `eval`s.
//! Role: Runs the resolver, classifies its answer, and prints shell code for the caller's shell.
//! Invariants: Forwards user args verbatim (everything after `--`).
//! Invariants: stdout carries only shell code; diagnostics go to stderr.
//! Invariants: Prefers a `navigate` binary next to the current executable, else PATH.
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use navigate::core::error::{Error, ErrorKind};
use navigate::shell::{Shell, quote};
use navigate::wrapper::{CommandResolver, DEFAULT_COMMAND, ShellState, Wrapper, logical_join};

#[derive(Parser)]
#[command(
    name = "nav-eval",
    version,
    about = "Resolve a navigate query and print shell code to eval",
    after_help = r#"EXAMPLES
  $ eval "$(nav-eval -- f src api)"
  $ eval (nav-eval --shell fish -- r logs | string collect)"#
)]
struct Cli {
    #[arg(long, value_enum, default_value = "bash", help = "Quoting rules for the emitted code")]
    shell: Shell,
    #[arg(long, help = "Skip the -c/-a bookkeeping calls")]
    no_announce: bool,
    #[arg(
        long,
        default_value = DEFAULT_COMMAND,
        value_name = "NAME",
        help = "Wrapper function name shown in the not-found hint"
    )]
    cmd: String,
    #[arg(long, env = "NAVIGATE_BIN", value_name = "PATH", help = "Resolver program to run")]
    resolver: Option<PathBuf>,
    #[arg(last = true, value_name = "ARGS", help = "Arguments forwarded to the resolver")]
    args: Vec<OsString>,
}

/// Records shell commands instead of mutating a real shell.
struct EvalShell {
    shell: Shell,
    cwd: PathBuf,
    script: Vec<String>,
}

impl ShellState for EvalShell {
    fn current_dir(&self) -> &Path {
        &self.cwd
    }

    /// The caller's `cd` runs only after this process exits, so the chdir is
    /// tried here first; a directory we cannot enter is neither emitted nor announced.
    fn change_dir(&mut self, target: &Path) -> Result<PathBuf, Error> {
        let entered = logical_join(&self.cwd, target);
        env::set_current_dir(&entered).map_err(|err| {
            Error::from_io(err, &entered).with_message("cannot enter directory")
        })?;
        self.script.push(format!(
            "cd -- {}",
            quote(self.shell, &entered.to_string_lossy())
        ));
        self.cwd = entered.clone();
        Ok(entered)
    }

    fn print(&mut self, text: &str) {
        self.script
            .push(format!("printf '%s\\n' {}", quote(self.shell, text)));
    }
}

fn main() -> ExitCode {
    navigate::logging::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(script) => {
            if !script.is_empty() {
                println!("{}", script.join("\n"));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("nav-eval: {err}");
            if let Some(hint) = err.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Vec<String>, Error> {
    let program = cli.resolver.unwrap_or_else(resolve_navigate_binary);
    let resolver = CommandResolver::new(program).with_cwd_flag(!cli.no_announce);
    let mut shell = EvalShell {
        shell: cli.shell,
        cwd: shell_cwd()?,
        script: Vec::new(),
    };

    let outcome = Wrapper::new(resolver)
        .with_announce(!cli.no_announce)
        .with_command(cli.cmd)
        .run(&mut shell, &cli.args)?;
    tracing::debug!(?outcome, "classified resolver response");
    Ok(shell.script)
}

/// `$PWD` keeps the logical path the user sees; fall back to the kernel's view.
fn shell_cwd() -> Result<PathBuf, Error> {
    if let Some(pwd) = env::var_os("PWD").map(PathBuf::from) {
        if pwd.is_absolute() && pwd.is_dir() {
            return Ok(pwd);
        }
    }
    env::current_dir().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read current directory")
            .with_source(err)
    })
}

fn resolve_navigate_binary() -> PathBuf {
    if let Ok(exe) = env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("navigate");
            if candidate.exists() {
                return candidate;
            }
        }
    }
    PathBuf::from("navigate")
}
