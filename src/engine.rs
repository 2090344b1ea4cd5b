//! The SQLite side: one owned connection, parameter binding, busy retry.

use crate::config::Config;
use crate::error::{Result, TranslateError};
use crate::functions::FunctionRegistry;
use crate::model::{Cell, ResultSet};
use rusqlite::{Connection, ErrorCode};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Bound parameters keyed by placeholder name, colon included (`:param0`).
pub type Params = BTreeMap<String, Cell>;

pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, Cell)>) -> Params {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// What running one statement produced.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Present for statements that return columns.
    pub rows: Option<ResultSet>,
    pub changes: u64,
    pub last_insert_id: i64,
}

pub struct Engine {
    conn: Connection,
    config: Config,
}

impl Engine {
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| TranslateError::engine(path.display().to_string(), e))?;
        Self::from_connection(conn, config)
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| TranslateError::engine(":memory:", e))?;
        Self::from_connection(conn, config)
    }

    pub fn from_connection(conn: Connection, config: Config) -> Result<Self> {
        // busy handling is ours, not SQLite's
        conn.busy_timeout(Duration::ZERO)
            .map_err(|e| TranslateError::engine("PRAGMA busy_timeout", e))?;
        Ok(Self { conn, config })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register(&self, registry: &dyn FunctionRegistry) -> Result<()> {
        registry
            .register(&self.conn)
            .map_err(|e| TranslateError::engine("<function registration>", e))
    }

    /// Runs one statement, retrying while the database is busy or locked.
    pub fn execute(&self, sql: &str, params: &Params) -> Result<Execution> {
        debug!(sql, params = params.len(), "sqlite");
        let mut attempts = 0;
        loop {
            match self.run_once(sql, params) {
                Ok(execution) => return Ok(execution),
                Err(err) if is_busy(&err) => {
                    attempts += 1;
                    if attempts > self.config.busy_retries {
                        return Err(TranslateError::BusyTimeout {
                            sql: sql.to_string(),
                            attempts,
                        });
                    }
                    warn!(attempts, sql, "database busy, retrying");
                    std::thread::sleep(self.config.backoff(attempts));
                }
                Err(err) => return Err(TranslateError::engine(sql, err)),
            }
        }
    }

    pub fn exec(&self, sql: &str) -> Result<Execution> {
        self.execute(sql, &Params::new())
    }

    /// Rows of a statement; statements without columns yield an empty set.
    pub fn query(&self, sql: &str, params: &Params) -> Result<ResultSet> {
        Ok(self.execute(sql, params)?.rows.unwrap_or_default())
    }

    pub fn query_i64(&self, sql: &str, params: &Params) -> Result<Option<i64>> {
        let rows = self.query(sql, params)?;
        Ok(rows.rows.first().and_then(|r| r.first()).and_then(Cell::as_i64))
    }

    fn run_once(&self, sql: &str, params: &Params) -> rusqlite::Result<Execution> {
        let mut stmt = self.conn.prepare(sql)?;
        for i in 1..=stmt.parameter_count() {
            let name = stmt
                .parameter_name(i)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("?{i}"));
            let value = params
                .get(&name)
                .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.clone()))?;
            stmt.raw_bind_parameter(i, value)?;
        }

        if stmt.column_count() > 0 {
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let width = columns.len();
            let mut result = ResultSet::new(columns);
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(width);
                for i in 0..width {
                    cells.push(Cell::from(row.get_ref(i)?));
                }
                result.push(cells);
            }
            return Ok(Execution {
                rows: Some(result),
                changes: 0,
                last_insert_id: self.conn.last_insert_rowid(),
            });
        }

        let changes = stmt.raw_execute()?;
        Ok(Execution {
            rows: None,
            changes: changes as u64,
            last_insert_id: self.conn.last_insert_rowid(),
        })
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}
