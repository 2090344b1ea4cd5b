//! Extension points for the application embedding the translator.

use crate::engine::Engine;
use crate::error::Result;
use crate::model::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStep {
    Begin,
    Commit,
    Rollback,
}

/// Emitted after every `query()` call, successful or not.
#[derive(Debug)]
pub struct QueryEvent<'a> {
    pub sql: &'a str,
    /// Upper-cased first keyword of the statement.
    pub statement_type: &'a str,
    pub table: Option<&'a str>,
    pub result: std::result::Result<&'a QueryResult, &'a str>,
}

/// All methods have no-op defaults.
pub trait QueryHooks: Send {
    /// Returning `Some` skips translation and uses the given result instead.
    fn pre_query(&mut self, _sql: &str, _engine: &Engine) -> Option<Result<QueryResult>> {
        None
    }

    /// Called after each transaction step with the nesting depth it left
    /// behind and the SQL it ran.
    fn transaction_step(&mut self, _step: TransactionStep, _depth: usize, _sql: &str) {}

    fn post_query(&mut self, _event: &QueryEvent<'_>) {}

    fn filter_last_insert_id(&mut self, id: i64, _table: Option<&str>) -> i64 {
        id
    }
}

#[derive(Debug, Default)]
pub struct NoHooks;

impl QueryHooks for NoHooks {}
