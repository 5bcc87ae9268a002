//! Purpose: Run the single action selected by the `navigate` command line.
//! Exports: `dispatch`.
//! Role: Keep `main.rs` focused on parse/bootstrap and error rendering.
//! Invariants: Action precedence is init, completion, mark, ignore, jump, add, menu, query.
//! Invariants: Only directory targets are written to stdout with exit status 0.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use navigate::core::query::{
    MAX_CHOICES, Menu, Selection, list_ignored, list_marks, resolve_mark, resolve_query,
};
use navigate::core::store::{DEFAULT_DISCOUNT, Retention, Store, unix_now};
use navigate::shell::{InitOptions, Style, render_init};

use super::*;

pub(super) fn dispatch(cli: Cli) -> Result<RunOutcome, Error> {
    if let Some(shell) = cli.init {
        let style = if cli.eval {
            Style::Eval
        } else if cli.no_announce {
            Style::Plain
        } else {
            Style::Announce
        };
        let resolver = current_exe()?;
        let options = InitOptions {
            shell,
            style,
            cmd: cli.cmd,
            eval_driver: sibling_binary(&resolver, "nav-eval"),
            resolver,
        };
        print!("{}", render_init(&options));
        return Ok(RunOutcome::ok());
    }
    if let Some(shell) = cli.completion {
        let mut cmd = completion_command();
        clap_complete::aot::generate(shell, &mut cmd, "navigate", &mut io::stdout());
        return Ok(RunOutcome::ok());
    }

    let store = Store::new(data_dir(cli.data_dir)?);
    let retention = Retention {
        max_age: Duration::from_secs(cli.max_age_days.saturating_mul(24 * 3600)),
        discount: DEFAULT_DISCOUNT,
    };
    let explicit_cwd = cli.current_directory;
    let stdout_color = cli.color.use_color(io::stdout().is_terminal());
    let stderr_color = cli.color.use_color(io::stderr().is_terminal());

    if let Some(name) = cli.mark {
        let current_directory = explicit_cwd.map_or_else(current_dir, Ok)?;
        store.update(|db| {
            if !cli.delete {
                db.set_mark(&name, &current_directory);
                tracing::debug!(
                    mark = name.as_str(),
                    dir = current_directory.as_str(),
                    "added mark"
                );
                return;
            }
            match db.remove_mark(&name) {
                Some(dir) => {
                    tracing::debug!(mark = name.as_str(), dir = dir.as_str(), "removed mark")
                }
                None => tracing::warn!("Mark {name} does not exist."),
            }
        })?;
        return Ok(RunOutcome::no_target());
    }

    if cli.ignore {
        let current_directory = explicit_cwd.map_or_else(current_dir, Ok)?;
        store.update(|db| {
            if !cli.delete {
                db.add_ignore(&current_directory);
                tracing::debug!(dir = current_directory.as_str(), "ignoring directory");
            } else if db.remove_ignore(&current_directory) {
                tracing::debug!(dir = current_directory.as_str(), "removed directory from ignore");
            } else {
                tracing::warn!("Directory '{current_directory}' was not being ignored.");
            }
        })?;
        return Ok(RunOutcome::no_target());
    }

    if let Some(name) = cli.jump {
        let db = store.load()?;
        let target = resolve_mark(&db, &name, stderr_color)?;
        emit_target(&target)?;
        return Ok(RunOutcome::ok());
    }

    if let Some(dir) = cli.add {
        let recorded = store.update(|db| db.record_visit(&dir, unix_now(), retention))?;
        if !recorded {
            tracing::debug!(dir = dir.as_str(), "not recording ignored directory");
        }
        return Ok(RunOutcome::no_target());
    }

    if cli.directory.is_empty() {
        return run_menu(&store, stdout_color);
    }

    let db = store.load()?;
    let target = resolve_query(cli.directory.as_slice(), &db)?;
    emit_target(&target)?;
    Ok(RunOutcome::ok())
}

/// The menu goes to stderr because the wrapper captures stdout.
fn run_menu(store: &Store, stdout_color: bool) -> Result<RunOutcome, Error> {
    let db = store.load()?;
    let menu = Menu::build(&db, MAX_CHOICES);
    eprint!("{}", menu.render());

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read selection")
            .with_source(err)
    })?;

    match menu.select(&line) {
        Selection::Directory(dir) => {
            emit_target(&dir)?;
            Ok(RunOutcome::ok())
        }
        Selection::ListIgnored => {
            print!("{}", list_ignored(&db));
            Ok(RunOutcome::no_target())
        }
        Selection::ListMarks => {
            print!("{}", list_marks(&db, stdout_color));
            Ok(RunOutcome::no_target())
        }
        Selection::Invalid(input) => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("Invalid option: {input}"))
            .with_hint("Pick a listed number, i, or m.")),
    }
}

fn emit_target(dir: &str) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    writeln!(out, "{dir}").and_then(|()| out.flush()).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write target")
            .with_source(err)
    })
}

fn data_dir(configured: Option<PathBuf>) -> Result<PathBuf, Error> {
    configured.filter(|dir| !dir.as_os_str().is_empty()).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message("Need to set NAVIGATE_DATA environment variable.")
            .with_hint("export NAVIGATE_DATA=\"$HOME/.local/share/navigate\" or pass --data-dir.")
    })
}

fn current_dir() -> Result<String, Error> {
    std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read current directory")
                .with_hint("Pass -c/--current-directory explicitly.")
                .with_source(err)
        })
}

fn current_exe() -> Result<PathBuf, Error> {
    std::env::current_exe().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to locate the navigate executable")
            .with_source(err)
    })
}

/// Prefers `name` next to `exe`, falling back to a PATH lookup.
fn sibling_binary(exe: &Path, name: &str) -> PathBuf {
    if let Some(parent) = exe.parent() {
        let candidate = parent.join(name);
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(name)
}
