//! Nested transactions on top of SQLite savepoints.
//!
//! Depth 0 means no transaction. The first `begin` opens a real transaction,
//! every further one a savepoint named after the depth it was opened at.

use crate::engine::Engine;
use crate::error::Result;
use crate::hooks::{QueryHooks, TransactionStep};
use tracing::trace;

#[derive(Debug, Default)]
pub struct TransactionManager {
    depth: usize,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn begin(&mut self, engine: &Engine, hooks: &mut dyn QueryHooks) -> Result<()> {
        let sql = if self.depth == 0 {
            "BEGIN".to_string()
        } else {
            format!("SAVEPOINT LEVEL{}", self.depth)
        };
        engine.exec(&sql)?;
        self.depth += 1;
        trace!(depth = self.depth, "begin");
        hooks.transaction_step(TransactionStep::Begin, self.depth, &sql);
        Ok(())
    }

    /// Returns `false` when there was nothing to commit.
    pub fn commit(&mut self, engine: &Engine, hooks: &mut dyn QueryHooks) -> Result<bool> {
        if self.depth == 0 {
            return Ok(false);
        }
        self.depth -= 1;
        let sql = if self.depth == 0 {
            "COMMIT".to_string()
        } else {
            format!("RELEASE SAVEPOINT LEVEL{}", self.depth)
        };
        engine.exec(&sql)?;
        trace!(depth = self.depth, "commit");
        hooks.transaction_step(TransactionStep::Commit, self.depth, &sql);
        Ok(true)
    }

    /// Undoes the work since the matching `begin`.
    pub fn rollback(&mut self, engine: &Engine, hooks: &mut dyn QueryHooks) -> Result<bool> {
        if self.depth == 0 {
            return Ok(false);
        }
        self.depth -= 1;
        let sql = if self.depth == 0 {
            engine.exec("ROLLBACK")?;
            "ROLLBACK".to_string()
        } else {
            let savepoint = format!("LEVEL{}", self.depth);
            engine.exec(&format!("ROLLBACK TO SAVEPOINT {savepoint}"))?;
            engine.exec(&format!("RELEASE SAVEPOINT {savepoint}"))?;
            format!("ROLLBACK TO SAVEPOINT {savepoint}")
        };
        trace!(depth = self.depth, "rollback");
        hooks.transaction_step(TransactionStep::Rollback, self.depth, &sql);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::Params;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<String>,
    }

    impl QueryHooks for Recorder {
        fn transaction_step(&mut self, _step: TransactionStep, _depth: usize, sql: &str) {
            self.steps.push(sql.to_string());
        }
    }

    fn engine() -> Engine {
        Engine::open_in_memory(Config::default()).unwrap()
    }

    #[test]
    fn test_three_levels_commit_in_order() {
        let e = engine();
        let mut hooks = Recorder::default();
        let mut txn = TransactionManager::new();
        for _ in 0..3 {
            txn.begin(&e, &mut hooks).unwrap();
        }
        assert_eq!(txn.depth(), 3);
        for _ in 0..3 {
            assert!(txn.commit(&e, &mut hooks).unwrap());
        }
        assert_eq!(
            hooks.steps,
            vec![
                "BEGIN",
                "SAVEPOINT LEVEL1",
                "SAVEPOINT LEVEL2",
                "RELEASE SAVEPOINT LEVEL2",
                "RELEASE SAVEPOINT LEVEL1",
                "COMMIT",
            ]
        );
        assert_eq!(txn.depth(), 0);
    }

    #[test]
    fn test_commit_without_transaction() {
        let e = engine();
        let mut txn = TransactionManager::new();
        assert!(!txn.commit(&e, &mut Recorder::default()).unwrap());
        assert!(!txn.rollback(&e, &mut Recorder::default()).unwrap());
    }

    #[test]
    fn test_nested_rollback_only_undoes_inner_work() {
        let e = engine();
        let mut hooks = Recorder::default();
        let mut txn = TransactionManager::new();
        e.exec("CREATE TABLE t (a INTEGER)").unwrap();

        txn.begin(&e, &mut hooks).unwrap();
        e.exec("INSERT INTO t VALUES (1)").unwrap();
        txn.begin(&e, &mut hooks).unwrap();
        e.exec("INSERT INTO t VALUES (2)").unwrap();
        txn.rollback(&e, &mut hooks).unwrap();
        txn.commit(&e, &mut hooks).unwrap();

        let count = e.query_i64("SELECT COUNT(*) FROM t", &Params::new()).unwrap();
        assert_eq!(count, Some(1));
        assert_eq!(txn.depth(), 0);
    }
}
