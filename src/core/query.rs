//! Purpose: Turn resolver arguments into a target directory using the database.
//! Exports: `resolve_query`, `resolve_mark`, `Menu`, `Selection`, listing helpers.
//! Role: Pure resolution logic; the binary owns locking, stdin, and stdout.
//! Invariants: A single argument is returned verbatim; the wrapper decides if it is a directory.
//! Invariants: Multi-argument searches require every term to be a substring of the match.
use std::fmt::Write as _;

use crate::core::error::{Error, ErrorKind};
use crate::core::store::{Database, Order};

pub const MAX_CHOICES: usize = 10;

const MARK_COLOR: &str = "\u{1b}[38;5;36m";
const RESET: &str = "\u{1b}[0;0m";

pub fn color_mark(mark: &str, enabled: bool) -> String {
    if !enabled {
        return mark.to_string();
    }
    format!("{MARK_COLOR}{mark}{RESET}")
}

pub fn parse_order(selector: &str) -> Result<Order, Error> {
    match selector {
        "f" => Ok(Order::Frequent),
        "r" => Ok(Order::Recent),
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("'{other}' is an invalid search type"))
            .with_hint("Use 'r' for recent and 'f' for frequent.")),
    }
}

pub fn is_directory_match<S: AsRef<str>>(terms: &[S], dir: &str) -> bool {
    terms.iter().all(|term| dir.contains(term.as_ref()))
}

/// Resolves positional arguments.
///
/// One argument is passed through untouched (`nav ..`, `nav ~/src`). With more,
/// the first picks the ranking and the rest are search terms.
pub fn resolve_query<S: AsRef<str>>(args: &[S], db: &Database) -> Result<String, Error> {
    let Some((first, terms)) = args.split_first() else {
        return Err(Error::new(ErrorKind::Usage).with_message("no directory given"));
    };
    if terms.is_empty() {
        return Ok(first.as_ref().to_string());
    }
    let order = parse_order(first.as_ref())?;
    tracing::debug!(?order, terms = terms.len(), "searching database");

    db.ranked(order)
        .into_iter()
        .find(|(dir, _)| is_directory_match(terms, dir))
        .map(|(dir, _)| dir.to_string())
        .ok_or_else(|| {
            let joined = terms
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" ");
            Error::new(ErrorKind::NotFound)
                .with_message(format!("Could not find a directory that matches '{joined}'"))
        })
}

pub fn resolve_mark(db: &Database, name: &str, use_color: bool) -> Result<String, Error> {
    if let Some(dir) = db.mark(name) {
        tracing::debug!(mark = name, dir, "mark resolved");
        return Ok(dir.to_string());
    }
    let mut err =
        Error::new(ErrorKind::NotFound).with_message(format!("Mark {name} does not exist."));
    let similar = db
        .marks_with_prefix(name)
        .map(|(mark, dir)| format!("  {} {dir}", color_mark(mark, use_color)))
        .collect::<Vec<_>>();
    if !similar.is_empty() {
        err = err.with_hint(format!("Did you mean one of these marks?\n{}", similar.join("\n")));
    }
    Err(err)
}

pub fn list_marks(db: &Database, use_color: bool) -> String {
    let mut out = String::from("Marked directories:\n");
    for (name, dir) in &db.mark {
        let _ = writeln!(out, "  {} {dir}", color_mark(name, use_color));
    }
    out
}

pub fn list_ignored(db: &Database) -> String {
    let mut out = String::from("Ignored directories:\n");
    for dir in db.ignore.keys() {
        let _ = writeln!(out, "  {dir}");
    }
    out
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    Directory(String),
    ListIgnored,
    ListMarks,
    Invalid(String),
}

/// Numbered choices shown when the resolver is called without arguments.
#[derive(Clone, Debug, Default)]
pub struct Menu {
    frequent: Vec<String>,
    recent: Vec<String>,
}

impl Menu {
    pub fn build(db: &Database, max_choices: usize) -> Self {
        let take = |order: Order| -> Vec<String> {
            db.ranked(order)
                .into_iter()
                .take(max_choices)
                .map(|(dir, _)| dir.to_string())
                .collect()
        };
        Self {
            frequent: take(Order::Frequent),
            recent: take(Order::Recent),
        }
    }

    fn entries(&self) -> impl Iterator<Item = &String> {
        self.frequent.iter().chain(self.recent.iter())
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Most Frequent Directories:\n");
        for (idx, dir) in self.frequent.iter().enumerate() {
            let _ = writeln!(out, "  ({idx}) {dir}");
        }
        out.push_str("Most Recent Directories:\n");
        for (idx, dir) in self.recent.iter().enumerate() {
            let _ = writeln!(out, "  ({}) {dir}", idx + self.frequent.len());
        }
        out.push_str("Other options:\n");
        out.push_str("  (i) List ignored directories\n");
        out.push_str("  (m) List all marks\n");
        out
    }

    pub fn select(&self, input: &str) -> Selection {
        let input = input.trim();
        match input {
            "i" => Selection::ListIgnored,
            "m" => Selection::ListMarks,
            _ => input
                .parse::<usize>()
                .ok()
                .and_then(|idx| self.entries().nth(idx))
                .map(|dir| Selection::Directory(dir.clone()))
                .unwrap_or_else(|| Selection::Invalid(input.to_string())),
        }
    }
}
