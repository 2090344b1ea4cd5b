//! Statement dispatch and the state shared by the per-statement handlers.

mod admin;
mod alter;
mod create;
mod expr;
mod insert;
mod schema;
mod select;
mod update;

use crate::config::Config;
use crate::engine::{Engine, Execution, Params};
use crate::error::{Result, TranslateError};
use crate::functions::BuiltinFunctions;
use crate::hooks::{NoHooks, QueryEvent, QueryHooks};
use crate::lexer;
use crate::model::QueryResult;
use crate::rewriter::Rewriter;
use crate::token::{Token, TokenKind};
use crate::txn::TransactionManager;
use crate::type_cache::TypeCache;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub use schema::quote_name;

/// First keyword of a statement, resolved once before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
    Show,
    Describe,
    Check,
    Optimize,
    Repair,
    Analyze,
    Set,
    Use,
    Lock,
    Unlock,
}

impl StatementKind {
    pub fn from_keyword(word: &str) -> Result<Self> {
        Ok(match word.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => Self::Select,
            "INSERT" => Self::Insert,
            "REPLACE" => Self::Replace,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "CREATE" => Self::Create,
            "ALTER" => Self::Alter,
            "DROP" => Self::Drop,
            "TRUNCATE" => Self::Truncate,
            "SHOW" => Self::Show,
            "DESCRIBE" | "DESC" | "EXPLAIN" => Self::Describe,
            "CHECK" => Self::Check,
            "OPTIMIZE" => Self::Optimize,
            "REPAIR" => Self::Repair,
            "ANALYZE" => Self::Analyze,
            "SET" => Self::Set,
            "USE" => Self::Use,
            "LOCK" => Self::Lock,
            "UNLOCK" => Self::Unlock,
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "unknown statement type {other}"
                )))
            }
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Replace => "REPLACE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Drop => "DROP",
            Self::Truncate => "TRUNCATE",
            Self::Show => "SHOW",
            Self::Describe => "DESCRIBE",
            Self::Check => "CHECK",
            Self::Optimize => "OPTIMIZE",
            Self::Repair => "REPAIR",
            Self::Analyze => "ANALYZE",
            Self::Set => "SET",
            Self::Use => "USE",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
        }
    }
}

/// State of an open `LIKE` expression.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LikeState {
    pub depth: usize,
    pub escaped: bool,
}

/// Per-call state, reset at the start of every `query()`.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub params: Params,
    pub statement_type: Option<StatementKind>,
    pub table_name: Option<String>,
    pub insert_columns: Vec<String>,
    pub has_group_by: bool,
    /// Output position right after the top-level `WHERE`.
    pub where_at: Option<usize>,
    /// A `HAVING` turned into a WHERE condition is waiting for its `)`.
    pub having_open: bool,
    pub like: Option<LikeState>,
    /// Last significant input token handed to the shared passes.
    pub previous: Option<Token>,
    /// Rewritten SQL actually sent to SQLite, in order.
    pub executed: Vec<String>,
}

impl Session {
    pub fn bind(&mut self, value: impl Into<crate::model::Cell>) -> Token {
        let name = format!(":param{}", self.params.len());
        self.params.insert(name.clone(), value.into());
        Token::parameter(&name)
    }
}

enum TransactionCommand {
    Begin,
    Commit,
    Rollback,
}

fn transaction_command(sql: &str) -> Option<TransactionCommand> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE
        .get_or_init(|| {
            Regex::new(r"(?is)^\s*(BEGIN|START\s+TRANSACTION|COMMIT|ROLLBACK)(\s+WORK)?\s*;?\s*$").ok()
        })
        .as_ref()?;
    let caps = re.captures(sql)?;
    let word = caps.get(1)?.as_str().to_ascii_uppercase();
    Some(match word.as_str() {
        "COMMIT" => TransactionCommand::Commit,
        "ROLLBACK" => TransactionCommand::Rollback,
        _ => TransactionCommand::Begin,
    })
}

pub struct Translator {
    engine: Engine,
    config: Config,
    txn: TransactionManager,
    hooks: Box<dyn QueryHooks>,
    session: Session,
    last_error: Option<String>,
    last_found_rows: Option<i64>,
    vacuum_requested: bool,
}

impl Translator {
    pub fn new(engine: Engine) -> Result<Self> {
        let config = engine.config().clone();
        if config.register_builtin_functions {
            engine.register(&BuiltinFunctions)?;
        }
        TypeCache::new(&engine).ensure()?;
        Ok(Self {
            engine,
            config,
            txn: TransactionManager::new(),
            hooks: Box::new(NoHooks),
            session: Session::default(),
            last_error: None,
            last_found_rows: None,
            vacuum_requested: false,
        })
    }

    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        Self::new(Engine::open(path, config)?)
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        Self::new(Engine::open_in_memory(config)?)
    }

    pub fn with_hooks(mut self, hooks: impl QueryHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Message of the error raised by the last `query()`, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Row count remembered for `FOUND_ROWS()`.
    pub fn last_found_rows(&self) -> Option<i64> {
        self.last_found_rows
    }

    /// SQLite statements run by the last `query()`.
    pub fn executed_queries(&self) -> &[String] {
        &self.session.executed
    }

    pub fn transaction_depth(&self) -> usize {
        self.txn.depth()
    }

    /// Translates and runs one MySQL statement.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.session = Session::default();
        self.last_error = None;

        if let Some(result) = self.hooks.pre_query(sql, &self.engine) {
            return result;
        }

        let result = self.run(sql);
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }

        let error = self.last_error.clone();
        let statement_type = self.session.statement_type.map_or("", StatementKind::as_str);
        let event = QueryEvent {
            sql,
            statement_type,
            table: self.session.table_name.as_deref(),
            result: match (&result, &error) {
                (Ok(r), _) => Ok(r),
                (Err(_), Some(msg)) => Err(msg.as_str()),
                (Err(_), None) => Err(""),
            },
        };
        self.hooks.post_query(&event);
        result
    }

    fn run(&mut self, sql: &str) -> Result<QueryResult> {
        if let Some(command) = transaction_command(sql) {
            let done = match command {
                TransactionCommand::Begin => {
                    self.txn.begin(&self.engine, self.hooks.as_mut())?;
                    true
                }
                TransactionCommand::Commit => self.txn.commit(&self.engine, self.hooks.as_mut())?,
                TransactionCommand::Rollback => self.txn.rollback(&self.engine, self.hooks.as_mut())?,
            };
            return Ok(QueryResult::Ok(done));
        }

        self.txn.begin(&self.engine, self.hooks.as_mut())?;
        match self.translate_and_execute(sql) {
            Ok(result) => {
                self.txn.commit(&self.engine, self.hooks.as_mut())?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = self.txn.rollback(&self.engine, self.hooks.as_mut()) {
                    warn!("rollback after failed statement also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn translate_and_execute(&mut self, sql: &str) -> Result<QueryResult> {
        let tokens = statement_tokens(lexer::tokenize(sql)?)?;
        let mut rw = Rewriter::new(tokens);
        let Some(first) = rw.peek_nth(1) else {
            return Ok(QueryResult::Ok(true));
        };
        let first = if first.is_operator("(") {
            rw.peek_nth(2).cloned().unwrap_or_else(|| first.clone())
        } else {
            first.clone()
        };
        let kind = StatementKind::from_keyword(&first.value_str())?;
        self.session.statement_type = Some(kind);
        debug!(kind = kind.as_str(), "translating {}", sql);

        match kind {
            StatementKind::Select => self.handle_select(&mut rw),
            StatementKind::Insert | StatementKind::Replace => self.handle_insert(&mut rw),
            StatementKind::Update => self.handle_update(&mut rw),
            StatementKind::Delete => self.handle_delete(&mut rw),
            StatementKind::Create => self.handle_create(&mut rw),
            StatementKind::Alter => self.handle_alter(&mut rw),
            StatementKind::Drop => self.handle_drop(&mut rw),
            StatementKind::Truncate => self.handle_truncate(&mut rw),
            StatementKind::Show => self.handle_show(&mut rw),
            StatementKind::Describe => self.handle_describe(&mut rw),
            StatementKind::Check => self.handle_check(&mut rw),
            StatementKind::Optimize | StatementKind::Repair | StatementKind::Analyze => {
                self.handle_maintenance(&mut rw, kind)
            }
            StatementKind::Set
            | StatementKind::Use
            | StatementKind::Lock
            | StatementKind::Unlock => {
                debug!("ignoring {} statement", kind.as_str());
                Ok(QueryResult::Ok(true))
            }
        }
    }

    /// Runs rewritten SQL with the session's bound parameters.
    fn execute(&mut self, sql: &str) -> Result<Execution> {
        let params = std::mem::take(&mut self.session.params);
        let result = self.execute_with(sql, &params);
        self.session.params = params;
        result
    }

    fn execute_with(&mut self, sql: &str, params: &Params) -> Result<Execution> {
        self.session.executed.push(sql.to_string());
        self.engine.execute(sql, params)
    }

    fn type_cache(&self) -> TypeCache<'_> {
        TypeCache::new(&self.engine)
    }

    /// Runs the VACUUM requested by OPTIMIZE/REPAIR/ANALYZE, if any.
    pub fn close(mut self) -> Result<()> {
        self.vacuum_if_requested()
    }

    fn vacuum_if_requested(&mut self) -> Result<()> {
        if !self.vacuum_requested || !self.config.vacuum_on_close {
            return Ok(());
        }
        self.vacuum_requested = false;
        if self.txn.depth() > 0 {
            warn!("skipping VACUUM, a transaction is still open");
            return Ok(());
        }
        info!("running deferred VACUUM");
        self.engine.exec("VACUUM")?;
        Ok(())
    }
}

impl Drop for Translator {
    fn drop(&mut self) {
        if let Err(e) = self.vacuum_if_requested() {
            warn!("deferred VACUUM failed: {}", e);
        }
    }
}

/// Drops comments and cuts the stream at the first delimiter. Anything
/// significant after it means the caller sent several statements at once.
fn statement_tokens(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter();
    for token in iter.by_ref() {
        match token.kind {
            TokenKind::Delimiter => break,
            TokenKind::Comment => {
                if !out.last().is_some_and(|t: &Token| t.kind == TokenKind::Whitespace) {
                    out.push(Token::whitespace());
                }
            }
            _ => out.push(token),
        }
    }
    if iter.any(|t| !t.is_semantically_void() && t.kind != TokenKind::Delimiter) {
        return Err(TranslateError::Unsupported(
            "multiple statements in one query".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_command_detection() {
        assert!(matches!(transaction_command("begin"), Some(TransactionCommand::Begin)));
        assert!(matches!(
            transaction_command("  START  TRANSACTION ;"),
            Some(TransactionCommand::Begin)
        ));
        assert!(matches!(transaction_command("COMMIT WORK"), Some(TransactionCommand::Commit)));
        assert!(matches!(transaction_command("rollback;"), Some(TransactionCommand::Rollback)));
        assert!(transaction_command("ROLLBACK TO SAVEPOINT a").is_none());
        assert!(transaction_command("SELECT 1").is_none());
    }

    #[test]
    fn test_statement_kind() {
        assert_eq!(StatementKind::from_keyword("desc").unwrap(), StatementKind::Describe);
        assert!(matches!(
            StatementKind::from_keyword("GRANT"),
            Err(TranslateError::Unsupported(_))
        ));
    }

    #[test]
    fn test_statement_tokens_strip_comments_and_reject_second_statement() {
        let tokens = statement_tokens(lexer::tokenize("SELECT /* x */ 1;  ").unwrap()).unwrap();
        assert_eq!(crate::rewriter::render(&tokens), "SELECT  1");
        assert!(statement_tokens(lexer::tokenize("SELECT 1; SELECT 2").unwrap()).is_err());
    }
}
