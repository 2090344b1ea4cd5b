use super::{quote_name, schema, Translator};
use crate::error::{Result, TranslateError};
use crate::model::QueryResult;
use crate::rewriter::Rewriter;
use crate::token::{Filter, Token, TokenKind};
use tracing::{debug, warn};

fn all_in(columns: &[String], candidates: &[String]) -> bool {
    !columns.is_empty()
        && columns
            .iter()
            .all(|c| candidates.iter().any(|i| i.eq_ignore_ascii_case(c)))
}

impl Translator {
    pub(super) fn handle_insert(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.consume(&Filter::keyword(&["INSERT", "REPLACE"]));
        while let Some(next) = rw.peek_nth(1) {
            if next.is_keyword(&["IGNORE"]) {
                rw.skip(&Filter::keyword(&["IGNORE"]));
                rw.add(Token::raw("OR IGNORE"));
            } else if next.is_keyword(&["LOW_PRIORITY", "DELAYED", "HIGH_PRIORITY"]) {
                rw.skip(&Filter::any());
            } else {
                break;
            }
        }
        if rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["INTO"])) {
            rw.consume(&Filter::keyword(&["INTO"]));
        }
        let table = rw
            .consume(&Filter::any())
            .filter(|t| t.is_identifier_like())
            .map(|t| t.value_str().into_owned())
            .ok_or_else(|| TranslateError::Parse("INSERT without a table name".into()))?;
        self.session.table_name = Some(table.clone());

        if rw.peek_nth(1).is_some_and(|t| t.is_operator("(")) {
            rw.consume(&Filter::operator(&["("]));
            while let Some(token) = rw.consume(&Filter::any()) {
                if token.is_operator(")") && rw.depth() == 0 {
                    break;
                }
                if token.is_identifier_like() {
                    self.session.insert_columns.push(token.value_str().into_owned());
                }
            }
        }

        let mut in_update = false;
        while let Some(token) = rw.skip_one() {
            if token.is_keyword(&["ON DUPLICATE KEY UPDATE"]) {
                self.finish_like(rw);
                match self.conflict_target(&table)? {
                    Some(columns) => {
                        let target: Vec<String> = columns.iter().map(|c| quote_name(c)).collect();
                        rw.add(Token::raw(format!("ON CONFLICT({}) DO UPDATE SET", target.join(", "))));
                        in_update = true;
                    }
                    None => {
                        warn!(table = %table, "no key to resolve ON DUPLICATE KEY UPDATE, inserting plainly");
                        rw.skip_and_return_all(&Filter::kind(TokenKind::Delimiter));
                        rw.trim_output();
                    }
                }
                continue;
            }
            if in_update
                && token.is_function()
                && token.value_upper() == "VALUES"
                && rw.peek_nth(1).is_some_and(|t| t.is_operator("("))
            {
                let depth = rw.depth();
                let inner = rw.skip_and_return_all(&Filter::operator(&[")"]).at_depth(depth));
                let column = inner
                    .iter()
                    .find(|t| t.is_identifier_like())
                    .ok_or_else(|| TranslateError::Parse("VALUES() without a column".into()))?;
                rw.add(Token::raw(format!("excluded.{}", quote_name(&column.value_str()))));
                continue;
            }
            self.translate_token(rw, token)?;
        }
        self.finish_like(rw);

        let sql = rw.render();
        let done = self.execute(&sql)?;
        // SQLite keeps the previous rowid when nothing went in, MySQL reports 0
        let inserted = if done.changes == 0 { 0 } else { done.last_insert_id };
        let id = self.hooks.filter_last_insert_id(inserted, Some(&table));
        Ok(QueryResult::Affected {
            rows: done.changes,
            last_insert_id: Some(id),
        })
    }

    /// Columns an `ON CONFLICT` clause can name for this insert.
    fn conflict_target(&self, table: &str) -> Result<Option<Vec<String>>> {
        let pk = schema::primary_key(&self.engine, table)?;
        let unique: Vec<Vec<String>> = schema::index_list(&self.engine, table)?
            .into_iter()
            .filter(|i| i.unique && i.origin != "pk")
            .map(|i| i.columns)
            .collect();
        let inserted = &self.session.insert_columns;

        let covered = unique.iter().position(|cols| all_in(cols, inserted));

        let chosen = if all_in(&pk, inserted) {
            Some(pk)
        } else if let Some(i) = covered {
            Some(unique[i].clone())
        } else if pk.len() > 1 {
            Some(pk)
        } else if let Some(index) = unique.into_iter().next() {
            Some(index)
        } else if pk.len() == 1 {
            Some(pk)
        } else {
            None
        };
        debug!(table, target = ?chosen, "conflict target");
        Ok(chosen)
    }
}
