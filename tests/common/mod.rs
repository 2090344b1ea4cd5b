#![allow(dead_code)]

use mysqlite::{Cell, Config, QueryHooks, ResultSet, TransactionStep, Translator};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

pub fn translator() -> anyhow::Result<Translator> {
    Ok(Translator::open_in_memory(Config::default())?)
}

/// A translator over a database file that lives as long as the guard.
pub struct FileDb {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl FileDb {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.sqlite");
        Ok(Self { dir, path })
    }

    pub fn open(&self) -> anyhow::Result<Translator> {
        Ok(Translator::open(&self.path, Config::default())?)
    }
}

pub fn rows(t: &mut Translator, sql: &str) -> anyhow::Result<ResultSet> {
    t.query(sql)?
        .into_rows()
        .ok_or_else(|| anyhow::anyhow!("no result set for {sql}"))
}

pub fn scalar(t: &mut Translator, sql: &str) -> anyhow::Result<Cell> {
    let rs = rows(t, sql)?;
    rs.rows
        .first()
        .and_then(|r| r.first())
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("empty result for {sql}"))
}

/// Column `column` of every row, rendered as text.
pub fn column(rs: &ResultSet, column: &str) -> Vec<String> {
    (0..rs.len())
        .filter_map(|i| rs.get(i, column).and_then(Cell::to_display_string))
        .collect()
}

/// Records every hook call so tests can assert on the sequence.
#[derive(Clone, Default)]
pub struct Recorder {
    pub log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl QueryHooks for Recorder {
    fn transaction_step(&mut self, step: TransactionStep, depth: usize, sql: &str) {
        self.log.lock().push(format!("{step:?}@{depth}: {sql}"));
    }

    fn post_query(&mut self, event: &mysqlite::QueryEvent<'_>) {
        let outcome = if event.result.is_ok() { "ok" } else { "err" };
        self.log
            .lock()
            .push(format!("{} {} {}", event.statement_type, event.table.unwrap_or("-"), outcome));
    }
}

/// Runs the command-line binary with `args`, feeding `stdin` to it.
pub fn run_cli(args: &[&str], stdin: &str) -> anyhow::Result<Output> {
    use std::io::Write;

    let mut child = Command::new(env!("CARGO_BIN_EXE_mysqlite"))
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow::anyhow!("failed to open cli stdin"))?
        .write_all(stdin.as_bytes())?;
    Ok(child.wait_with_output()?)
}
