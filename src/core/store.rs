// Directory database: JSON file with visit scores, marks, and the ignore list.
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::OffsetDateTime;

use crate::core::error::{Error, ErrorKind};

pub const DATA_FILE: &str = "navigate.json";
pub const LOCK_FILE: &str = "navigate.lock";

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 3600);
pub const DEFAULT_DISCOUNT: f64 = 0.99;

/// Aging rules applied on every recorded visit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retention {
    pub max_age: Duration,
    pub discount: f64,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            discount: DEFAULT_DISCOUNT,
        }
    }
}

/// Ranking used by searches and the menu.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Order {
    Frequent,
    Recent,
}

/// On-disk layout. Field names match the historical `navigate.json` keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub mark: BTreeMap<String, String>,
    #[serde(default)]
    pub count: BTreeMap<String, f64>,
    #[serde(default)]
    pub ignore: BTreeMap<String, i64>,
    #[serde(default)]
    pub time: BTreeMap<String, f64>,
}

impl Database {
    pub fn is_ignored(&self, dir: &str) -> bool {
        self.ignore.contains_key(dir)
    }

    /// Records a visit to `dir` at `now` (unix seconds), then decays every
    /// score and drops entries whose last visit is older than `max_age`.
    ///
    /// Returns `false` without touching anything when `dir` is ignored.
    pub fn record_visit(&mut self, dir: &str, now: f64, retention: Retention) -> bool {
        if self.is_ignored(dir) {
            tracing::debug!(dir, "skipping visit to ignored directory");
            return false;
        }
        let count = self.count.entry(dir.to_string()).or_insert(0.0);
        *count += 1.0;
        tracing::debug!(dir, count = *count, "increased visit count");
        self.time.insert(dir.to_string(), now);

        for value in self.count.values_mut() {
            *value *= retention.discount;
        }
        self.prune(now, retention.max_age);
        true
    }

    fn prune(&mut self, now: f64, max_age: Duration) {
        let max_age = max_age.as_secs_f64();
        let stale: Vec<String> = self
            .time
            .iter()
            .filter(|(_, last)| now - **last > max_age)
            .map(|(dir, _)| dir.clone())
            .collect();
        for dir in &stale {
            tracing::debug!(dir = dir.as_str(), "pruning stale directory");
            self.time.remove(dir);
            self.count.remove(dir);
        }
    }

    pub fn add_ignore(&mut self, dir: &str) {
        self.ignore.insert(dir.to_string(), 1);
        self.time.remove(dir);
        self.count.remove(dir);
    }

    pub fn remove_ignore(&mut self, dir: &str) -> bool {
        self.ignore.remove(dir).is_some()
    }

    pub fn set_mark(&mut self, name: &str, dir: &str) -> Option<String> {
        self.mark.insert(name.to_string(), dir.to_string())
    }

    pub fn remove_mark(&mut self, name: &str) -> Option<String> {
        self.mark.remove(name)
    }

    pub fn mark(&self, name: &str) -> Option<&str> {
        self.mark.get(name).map(String::as_str)
    }

    pub fn marks_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.mark
            .iter()
            .filter(move |(name, _)| name.starts_with(prefix))
            .map(|(name, dir)| (name.as_str(), dir.as_str()))
    }

    /// Directories ordered best-first. Ties fall back to path order so output
    /// is deterministic.
    pub fn ranked(&self, order: Order) -> Vec<(&str, f64)> {
        let source = match order {
            Order::Frequent => &self.count,
            Order::Recent => &self.time,
        };
        let mut entries: Vec<(&str, f64)> = source
            .iter()
            .map(|(dir, value)| (dir.as_str(), *value))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

pub fn unix_now() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}

/// Handle to the database directory (`$NAVIGATE_DATA`).
#[derive(Clone, Debug)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    /// Reads the database under a shared lock. A missing directory or file
    /// reads as an empty database.
    pub fn load(&self) -> Result<Database, Error> {
        if !self.dir.is_dir() {
            tracing::debug!(dir = %self.dir.display(), "no data directory; empty database");
            return Ok(Database::default());
        }
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock).map_err(|err| Error::from_io(err, self.lock_path()))?;
        self.read_unlocked()
    }

    /// Loads, mutates, and atomically rewrites the database while holding an
    /// exclusive lock, so concurrent resolver processes never lose updates.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut Database) -> T) -> Result<T, Error> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            Error::from_io(err, &self.dir).with_message("failed to create data directory")
        })?;
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock).map_err(|err| Error::from_io(err, self.lock_path()))?;

        let mut db = self.read_unlocked()?;
        let before = db.clone();
        let out = mutate(&mut db);
        if db != before {
            self.write_unlocked(&db)?;
        }
        Ok(out)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn open_lock(&self) -> Result<File, Error> {
        let path = self.lock_path();
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| Error::from_io(err, &path).with_message("failed to open lock file"))
    }

    fn read_unlocked(&self) -> Result<Database, Error> {
        let path = self.data_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "creating new database");
                return Ok(Database::default());
            }
            Err(err) => {
                return Err(Error::from_io(err, &path).with_message("failed to read database"));
            }
        };
        let db = serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("database is not valid json")
                .with_path(&path)
                .with_hint("Fix or remove the file; it is recreated on the next visit.")
                .with_source(err)
        })?;
        tracing::debug!(path = %path.display(), "loaded database");
        Ok(db)
    }

    fn write_unlocked(&self, db: &Database) -> Result<(), Error> {
        let path = self.data_path();
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|err| {
            Error::from_io(err, &self.dir).with_message("failed to create temp file")
        })?;
        serde_json::to_writer(&mut tmp, db).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode database")
                .with_source(err)
        })?;
        tmp.flush()
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| {
                Error::from_io(err, tmp.path()).with_message("failed to flush database")
            })?;
        tmp.persist(&path).map_err(|err| {
            Error::from_io(err.error, &path).with_message("failed to replace database")
        })?;
        tracing::debug!(path = %path.display(), "wrote database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retention() -> Retention {
        Retention::default()
    }

    #[test]
    fn record_visit_increments_and_discounts() {
        let mut db = Database::default();
        assert!(db.record_visit("/a", 1000.0, retention()));
        assert!((db.count["/a"] - 0.99).abs() < 1e-9);

        assert!(db.record_visit("/b", 1001.0, retention()));
        assert!((db.count["/a"] - 0.99 * 0.99).abs() < 1e-9);
        assert!((db.count["/b"] - 0.99).abs() < 1e-9);
        assert_eq!(db.time["/b"], 1001.0);
    }

    #[test]
    fn ignored_directories_are_never_recorded() {
        let mut db = Database::default();
        db.add_ignore("/secret");
        assert!(!db.record_visit("/secret", 10.0, retention()));
        assert!(db.count.is_empty());
        assert!(db.time.is_empty());
    }

    #[test]
    fn ignoring_drops_history() {
        let mut db = Database::default();
        db.record_visit("/a", 10.0, retention());
        db.add_ignore("/a");
        assert!(!db.count.contains_key("/a"));
        assert!(!db.time.contains_key("/a"));
        assert!(db.remove_ignore("/a"));
        assert!(!db.remove_ignore("/a"));
    }

    #[test]
    fn stale_entries_are_pruned_on_visit() {
        let mut db = Database::default();
        let day = 24.0 * 3600.0;
        db.record_visit("/old", 0.0, retention());
        db.record_visit("/new", 31.0 * day, retention());
        assert!(!db.time.contains_key("/old"));
        assert!(!db.count.contains_key("/old"));
        assert!(db.count.contains_key("/new"));
    }

    #[test]
    fn ranked_orders_best_first_with_stable_ties() {
        let mut db = Database::default();
        db.count.insert("/b".into(), 1.0);
        db.count.insert("/a".into(), 1.0);
        db.count.insert("/c".into(), 5.0);
        db.time.insert("/a".into(), 30.0);
        db.time.insert("/b".into(), 20.0);
        db.time.insert("/c".into(), 10.0);

        let frequent: Vec<&str> = db
            .ranked(Order::Frequent)
            .into_iter()
            .map(|e| e.0)
            .collect();
        assert_eq!(frequent, vec!["/c", "/a", "/b"]);
        let recent: Vec<&str> = db
            .ranked(Order::Recent)
            .into_iter()
            .map(|e| e.0)
            .collect();
        assert_eq!(recent, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn marks_with_prefix_filters_names() {
        let mut db = Database::default();
        db.set_mark("proj", "/p");
        db.set_mark("prod", "/q");
        db.set_mark("home", "/h");
        let names: Vec<&str> = db.marks_with_prefix("pro").map(|m| m.0).collect();
        assert_eq!(names, vec!["prod", "proj"]);
        assert_eq!(db.remove_mark("home"), Some("/h".to_string()));
        assert_eq!(db.mark("home"), None);
    }

    #[test]
    fn store_round_trips_through_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = Store::new(temp.path().join("data"));
        assert_eq!(store.load().expect("load"), Database::default());

        store
            .update(|db| {
                db.set_mark("t", "/tmp");
                db.record_visit("/tmp", 5.0, Retention::default());
            })
            .expect("update");

        let db = store.load().expect("reload");
        assert_eq!(db.mark("t"), Some("/tmp"));
        assert!(db.count.contains_key("/tmp"));
        assert!(store.data_path().exists());
    }

    #[test]
    fn reads_historical_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            temp.path().join(DATA_FILE),
            concat!(
                r#"{"mark": {"w": "/work"}, "count": {"/work": 2.5}, "#,
                r#""ignore": {"/tmp": 1}, "time": {"/work": 1700000000.5}}"#,
            ),
        )
        .expect("write");
        let db = Store::new(temp.path()).load().expect("load");
        assert_eq!(db.mark("w"), Some("/work"));
        assert!(db.is_ignored("/tmp"));
        assert_eq!(db.time["/work"], 1700000000.5);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join(DATA_FILE), "{not json").expect("write");
        let err = Store::new(temp.path()).load().expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert!(err.hint().is_some());
    }
}
