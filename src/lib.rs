//! Runs MySQL-dialect SQL against an embedded SQLite database.
//!
//! Each statement passed to [`Translator::query`] is tokenized, rewritten
//! into SQLite SQL with its literals bound as parameters, executed, and
//! answered in the shape a MySQL client expects: rows, an affected-row
//! count with the last insert id, or a plain success flag. Introspection
//! statements (`SHOW`, `DESCRIBE`) are emulated from the SQLite catalog and
//! a side table that remembers the original MySQL column types.
//!
//! ```no_run
//! use mysqlite::{Config, Translator};
//!
//! let mut db = Translator::open_in_memory(Config::default())?;
//! db.query("CREATE TABLE t (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(20))")?;
//! db.query("INSERT INTO t (name) VALUES ('a')")?;
//! let rows = db.query("SELECT SQL_CALC_FOUND_ROWS * FROM t LIMIT 1")?;
//! # Ok::<(), mysqlite::TranslateError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod functions;
pub mod hooks;
pub mod keywords;
pub mod lexer;
pub mod model;
pub mod rewriter;
pub mod token;
pub mod translator;
pub mod txn;
pub mod type_cache;

pub use config::Config;
pub use engine::{Engine, Params};
pub use error::{Result, TranslateError};
pub use functions::{BuiltinFunctions, FunctionRegistry};
pub use hooks::{NoHooks, QueryEvent, QueryHooks, TransactionStep};
pub use lexer::{split_statements, tokenize};
pub use model::{Cell, QueryResult, ResultSet};
pub use translator::{StatementKind, Translator};
