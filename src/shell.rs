//! Purpose: Render the shell functions that turn resolver output into a `cd`.
//! Exports: `Shell`, `Style`, `InitOptions`, `render_init`, quoting helpers.
//! Role: The generated function runs inside the caller's shell; only there can `cd` stick.
//! Invariants: User arguments are forwarded as `"$@"` / `$argv`, never re-split.
//! Invariants: Embedded program paths are quoted for the target shell.
use std::path::{Path, PathBuf};

use clap::ValueEnum;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

/// Which flavour of wrapper to emit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Style {
    /// Pass `-c "$PWD"` and record the new directory with `-a` after each jump.
    Announce,
    /// Forward arguments only; no bookkeeping calls.
    Plain,
    /// Delegate classification to `nav-eval` and `eval` what it prints.
    Eval,
}

#[derive(Clone, Debug)]
pub struct InitOptions {
    pub shell: Shell,
    pub style: Style,
    pub cmd: String,
    pub resolver: PathBuf,
    pub eval_driver: PathBuf,
}

/// Quotes `value` as a single POSIX shell word.
pub fn quote_posix(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quotes `value` as a single fish word.
pub fn quote_fish(value: &str) -> String {
    format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'"))
}

pub fn quote(shell: Shell, value: &str) -> String {
    match shell {
        Shell::Bash | Shell::Zsh => quote_posix(value),
        Shell::Fish => quote_fish(value),
    }
}

const POSIX_ANNOUNCE: &str = r##"__CMD__() {
    local __nav_out __nav_status __nav_dir
    __nav_out="$(command __BIN__ -c "$PWD" "$@")"
    __nav_status=$?
    if [ "$__nav_status" -ne 0 ]; then
        [ -n "$__nav_out" ] && printf '%s\n' "$__nav_out"
        return "$__nav_status"
    fi
    __nav_dir="${__nav_out#"${__nav_out%%[![:space:]]*}"}"
    __nav_dir="${__nav_dir%"${__nav_dir##*[![:space:]]}"}"
    if [ -n "$__nav_dir" ] && [ -d "$__nav_dir" ]; then
        builtin cd -- "$__nav_dir" || return
        command __BIN__ -a "$PWD" >/dev/null 2>&1
        return 0
    fi
    printf "navigate '%s' not found\n" "$*"
    printf '%s\n' "$__nav_out"
    printf "Use '%s --help' to see the available options.\n" __CMD__
    return 1
}
"##;

const POSIX_PLAIN: &str = r##"__CMD__() {
    local __nav_out __nav_status __nav_dir
    __nav_out="$(command __BIN__ "$@")"
    __nav_status=$?
    if [ "$__nav_status" -ne 0 ]; then
        [ -n "$__nav_out" ] && printf '%s\n' "$__nav_out"
        return "$__nav_status"
    fi
    __nav_dir="${__nav_out#"${__nav_out%%[![:space:]]*}"}"
    __nav_dir="${__nav_dir%"${__nav_dir##*[![:space:]]}"}"
    if [ -n "$__nav_dir" ] && [ -d "$__nav_dir" ]; then
        builtin cd -- "$__nav_dir"
        return
    fi
    printf "navigate '%s' not found\n" "$*"
    printf '%s\n' "$__nav_out"
    printf "Use '%s --help' to see the available options.\n" __CMD__
    return 1
}
"##;

const POSIX_EVAL: &str = r##"__CMD__() {
    eval "$(command __EVAL__ --shell __SHELL__ --cmd __CMD__ -- "$@")"
}
"##;

const FISH_ANNOUNCE: &str = r##"function __CMD__
    set -l __nav_out (command __BIN__ -c "$PWD" $argv)
    set -l __nav_status $status
    set __nav_out (string join \n -- $__nav_out | string collect)
    if test $__nav_status -ne 0
        if test -n "$__nav_out"
            printf '%s\n' "$__nav_out"
        end
        return $__nav_status
    end
    set -l __nav_dir (string trim -- "$__nav_out")
    if test -n "$__nav_dir" -a -d "$__nav_dir"
        cd -- "$__nav_dir"; or return
        command __BIN__ -a "$PWD" >/dev/null 2>&1
        return 0
    end
    printf "navigate '%s' not found\n" "$argv"
    printf '%s\n' "$__nav_out"
    printf "Use '%s --help' to see the available options.\n" __CMD__
    return 1
end
"##;

const FISH_PLAIN: &str = r##"function __CMD__
    set -l __nav_out (command __BIN__ $argv)
    set -l __nav_status $status
    set __nav_out (string join \n -- $__nav_out | string collect)
    if test $__nav_status -ne 0
        if test -n "$__nav_out"
            printf '%s\n' "$__nav_out"
        end
        return $__nav_status
    end
    set -l __nav_dir (string trim -- "$__nav_out")
    if test -n "$__nav_dir" -a -d "$__nav_dir"
        cd -- "$__nav_dir"
        return
    end
    printf "navigate '%s' not found\n" "$argv"
    printf '%s\n' "$__nav_out"
    printf "Use '%s --help' to see the available options.\n" __CMD__
    return 1
end
"##;

const FISH_EVAL: &str = r##"function __CMD__
    eval (command __EVAL__ --shell fish --cmd __CMD__ -- $argv | string collect)
end
"##;

/// Renders the wrapper function plus its one-letter alias.
pub fn render_init(options: &InitOptions) -> String {
    let template = match (options.shell, options.style) {
        (Shell::Bash | Shell::Zsh, Style::Announce) => POSIX_ANNOUNCE,
        (Shell::Bash | Shell::Zsh, Style::Plain) => POSIX_PLAIN,
        (Shell::Bash | Shell::Zsh, Style::Eval) => POSIX_EVAL,
        (Shell::Fish, Style::Announce) => FISH_ANNOUNCE,
        (Shell::Fish, Style::Plain) => FISH_PLAIN,
        (Shell::Fish, Style::Eval) => FISH_EVAL,
    };
    let shell_name = match options.shell {
        Shell::Bash => "bash",
        Shell::Zsh => "zsh",
        Shell::Fish => "fish",
    };

    let mut out = format!("# navigate shell integration ({shell_name})\n");
    out.push_str(
        &template
            .replace("__CMD__", &options.cmd)
            .replace("__BIN__", &quote_path(options.shell, &options.resolver))
            .replace("__EVAL__", &quote_path(options.shell, &options.eval_driver))
            .replace("__SHELL__", shell_name),
    );

    if let Some(alias) = alias_for(&options.cmd) {
        match options.shell {
            Shell::Bash | Shell::Zsh => {
                out.push_str(&format!("alias {alias}={}\n", quote_posix(&options.cmd)));
            }
            Shell::Fish => {
                out.push_str(&format!(
                    "function {alias} --wraps {cmd}\n    {cmd} $argv\nend\n",
                    cmd = options.cmd
                ));
            }
        }
    }
    out
}

/// The alias is the first character of the command name, unless that would
/// shadow the command itself.
pub fn alias_for(cmd: &str) -> Option<String> {
    let first = cmd.chars().next()?;
    if !first.is_ascii_alphabetic() || cmd.len() == 1 {
        return None;
    }
    Some(first.to_string())
}

fn quote_path(shell: Shell, path: &Path) -> String {
    quote(shell, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(shell: Shell, style: Style) -> InitOptions {
        InitOptions {
            shell,
            style,
            cmd: "nav".to_string(),
            resolver: PathBuf::from("/opt/nav tools/navigate"),
            eval_driver: PathBuf::from("/opt/bin/nav-eval"),
        }
    }

    #[test]
    fn posix_quoting_escapes_single_quotes() {
        assert_eq!(quote_posix("plain"), "'plain'");
        assert_eq!(quote_posix("it's"), r"'it'\''s'");
    }

    #[test]
    fn fish_quoting_escapes_backslashes_and_quotes() {
        assert_eq!(quote_fish(r"a\b'c"), r"'a\\b\'c'");
    }

    #[test]
    fn announce_variant_passes_cwd_and_records_visit() {
        let script = render_init(&options(Shell::Bash, Style::Announce));
        assert!(script.starts_with("# navigate shell integration (bash)\n"));
        assert!(script.contains("nav() {"));
        assert!(script.contains(r#"command '/opt/nav tools/navigate' -c "$PWD" "$@""#));
        assert!(script.contains(r#"command '/opt/nav tools/navigate' -a "$PWD" >/dev/null 2>&1"#));
        assert!(script.contains("alias n='nav'\n"));
    }

    #[test]
    fn plain_variant_has_no_bookkeeping() {
        let script = render_init(&options(Shell::Zsh, Style::Plain));
        assert!(script.contains(r#"command '/opt/nav tools/navigate' "$@""#));
        assert!(!script.contains(" -a "));
        assert!(!script.contains(" -c "));
    }

    #[test]
    fn fish_variant_uses_argv_and_alias_function() {
        let script = render_init(&options(Shell::Fish, Style::Announce));
        assert!(script.contains("function nav\n"));
        assert!(script.contains(r#"-c "$PWD" $argv)"#));
        assert!(script.contains("set -l __nav_status $status\n"));
        assert!(script.contains("function n --wraps nav\n"));
    }

    #[test]
    fn eval_variant_delegates_to_driver() {
        let script = render_init(&options(Shell::Zsh, Style::Eval));
        assert!(script.contains(
            r#"eval "$(command '/opt/bin/nav-eval' --shell zsh --cmd nav -- "$@")""#
        ));
    }

    #[test]
    fn alias_is_first_letter_when_distinct() {
        assert_eq!(alias_for("nav"), Some("n".to_string()));
        assert_eq!(alias_for("j"), None);
        assert_eq!(alias_for("_go"), None);
    }
}
