//! UPDATE and DELETE, including the two-phase multi-table DELETE.

use super::{quote_name, schema, Translator};
use crate::engine::Params;
use crate::error::{Result, TranslateError};
use crate::model::{Cell, QueryResult};
use crate::rewriter::Rewriter;
use crate::token::{Filter, Token, TokenKind};
use std::collections::HashSet;
use tracing::{debug, info};

/// A table named in a FROM clause and the alias it is referred to by.
#[derive(Debug, Clone, PartialEq)]
struct TableRef {
    table: String,
    alias: String,
}

/// Reads `t [AS] alias` pairs following FROM, JOIN and top-level commas.
fn table_refs(tokens: &[Token]) -> Vec<TableRef> {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_semantically_void()).collect();
    let mut refs = Vec::new();
    let mut depth = 0usize;
    let mut in_from = false;
    let mut i = 0;
    while i < significant.len() {
        let t = significant[i];
        if t.is_operator("(") {
            depth += 1;
        } else if t.is_operator(")") {
            depth = depth.saturating_sub(1);
        }
        let opens_ref = depth == 0
            && (t.is_keyword(&["FROM", "JOIN"]) || (in_from && t.is_operator(",")));
        if depth == 0 && t.is_keyword(&["WHERE", "ORDER BY", "LIMIT", "GROUP BY"]) {
            in_from = false;
        }
        if opens_ref {
            in_from = true;
            if let Some(table) = significant.get(i + 1).filter(|n| n.is_identifier_like()) {
                let mut j = i + 2;
                if significant.get(j).is_some_and(|n| n.is_keyword(&["AS"])) {
                    j += 1;
                }
                let alias = significant
                    .get(j)
                    .filter(|n| n.is_identifier_like())
                    .map(|n| n.value_str().into_owned())
                    .unwrap_or_else(|| table.value_str().into_owned());
                refs.push(TableRef {
                    table: table.value_str().into_owned(),
                    alias,
                });
            }
        }
        i += 1;
    }
    refs
}

impl Translator {
    pub(super) fn handle_update(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.consume(&Filter::keyword(&["UPDATE"]));
        while let Some(next) = rw.peek_nth(1) {
            if next.is_keyword(&["IGNORE"]) {
                rw.skip(&Filter::keyword(&["IGNORE"]));
                rw.add(Token::raw("OR IGNORE"));
            } else if next.is_keyword(&["LOW_PRIORITY"]) {
                rw.skip(&Filter::any());
            } else {
                break;
            }
        }
        if let Some(table) = rw.consume(&Filter::any()).filter(|t| t.is_identifier_like()) {
            self.session.table_name = Some(table.value_str().into_owned());
        }
        self.translate_without_order_and_limit(rw)?;

        let done = self.execute(&rw.render())?;
        Ok(QueryResult::Affected {
            rows: done.changes,
            last_insert_id: None,
        })
    }

    pub(super) fn handle_delete(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.consume(&Filter::keyword(&["DELETE"]));
        while rw
            .peek_nth(1)
            .is_some_and(|t| t.is_keyword(&["LOW_PRIORITY", "QUICK", "IGNORE"]))
        {
            rw.skip(&Filter::any());
        }
        if !rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["FROM"])) {
            return self.delete_multi_table(rw);
        }

        rw.consume(&Filter::keyword(&["FROM"]));
        if let Some(table) = rw.consume(&Filter::any()).filter(|t| t.is_identifier_like()) {
            self.session.table_name = Some(table.value_str().into_owned());
        }
        self.translate_without_order_and_limit(rw)?;

        let done = self.execute(&rw.render())?;
        Ok(QueryResult::Affected {
            rows: done.changes,
            last_insert_id: None,
        })
    }

    /// SQLite builds without `SQLITE_ENABLE_UPDATE_DELETE_LIMIT` reject these.
    fn translate_without_order_and_limit(&mut self, rw: &mut Rewriter) -> Result<()> {
        while let Some(token) = rw.skip_one() {
            if rw.depth() == 0 && token.is_keyword(&["ORDER BY", "LIMIT"]) {
                debug!("dropping trailing {}", token.value_str());
                rw.skip_and_return_all(&Filter::kind(TokenKind::Delimiter));
                break;
            }
            self.translate_token(rw, token)?;
        }
        self.finish_like(rw);
        rw.trim_output();
        Ok(())
    }

    /// `DELETE a, b FROM ...` selects the doomed keys first, then deletes
    /// them table by table.
    fn delete_multi_table(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        let targets: Vec<String> = rw
            .skip_and_return_all(&Filter::keyword(&["FROM"]).at_depth(0))
            .iter()
            .filter(|t| t.is_identifier_like())
            .map(|t| t.value_str().into_owned())
            .collect();
        if targets.is_empty() {
            return Err(TranslateError::Parse("DELETE without a table".into()));
        }
        let mut from_tail = vec![Token::keyword("FROM")];
        from_tail.extend(rw.remaining().iter().cloned());
        let refs = table_refs(&from_tail);

        let mut resolved = Vec::with_capacity(targets.len());
        for target in &targets {
            let table = refs
                .iter()
                .find(|r| r.alias.eq_ignore_ascii_case(target))
                .map(|r| r.table.clone())
                .unwrap_or_else(|| target.clone());
            let key = match schema::primary_key(&self.engine, &table)?.as_slice() {
                [] => "rowid".to_string(),
                [single] => single.clone(),
                _ => {
                    return Err(TranslateError::Unsupported(format!(
                        "multi-table DELETE on {table} with a composite primary key"
                    )))
                }
            };
            resolved.push((target.clone(), table, key));
        }
        self.session.table_name = resolved.first().map(|(_, table, _)| table.clone());

        let projection: Vec<String> = resolved
            .iter()
            .enumerate()
            .map(|(i, (alias, _, key))| format!("{}.{} AS __pk_{i}", quote_name(alias), quote_name(key)))
            .collect();
        let mut select = Rewriter::new(from_tail);
        select.add(Token::raw(format!("SELECT {} ", projection.join(", "))));
        self.translate_rest(&mut select)?;
        let rows = self.execute(&select.render())?.rows.unwrap_or_default();

        let mut deleted = 0;
        for (i, (_, table, key)) in resolved.iter().enumerate() {
            let mut seen = HashSet::new();
            let ids: Vec<Cell> = rows
                .rows
                .iter()
                .filter_map(|row| row.get(i).cloned())
                .filter(|id| !id.is_null() && seen.insert(id.clone()))
                .collect();

            let mut params = Params::new();
            let condition = if ids.is_empty() {
                "0=1".to_string()
            } else {
                let names: Vec<String> = ids
                    .into_iter()
                    .enumerate()
                    .map(|(n, id)| {
                        let name = format!(":id{n}");
                        params.insert(name.clone(), id);
                        name
                    })
                    .collect();
                format!("{} IN ({})", quote_name(key), names.join(", "))
            };
            let sql = format!("DELETE FROM {} WHERE {condition}", quote_name(table));
            deleted += self.execute_with(&sql, &params)?.changes;
        }
        info!(tables = resolved.len(), deleted, "multi-table delete");
        Ok(QueryResult::Affected {
            rows: deleted,
            last_insert_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lexer::tokenize;

    fn translator() -> Translator {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        t.query("CREATE TABLE posts (id INT AUTO_INCREMENT PRIMARY KEY, title TEXT)").unwrap();
        t.query("CREATE TABLE meta (meta_id INT AUTO_INCREMENT PRIMARY KEY, post_id INT, k TEXT)")
            .unwrap();
        t.query("INSERT INTO posts (title) VALUES ('a'), ('b'), ('c')").unwrap();
        t.query("INSERT INTO meta (post_id, k) VALUES (1, 'x'), (1, 'y'), (2, 'x'), (3, 'z')")
            .unwrap();
        t
    }

    fn count(t: &mut Translator, table: &str) -> i64 {
        let rows = t.query(&format!("SELECT COUNT(*) FROM {table}")).unwrap().into_rows().unwrap();
        rows.rows[0][0].as_i64().unwrap()
    }

    #[test]
    fn test_table_refs() {
        let tokens = tokenize("p LEFT JOIN meta AS m ON m.post_id = p.id, other WHERE x").unwrap();
        let mut all = vec![Token::keyword("FROM")];
        all.extend(tokens);
        assert_eq!(
            table_refs(&all),
            vec![
                TableRef { table: "p".into(), alias: "p".into() },
                TableRef { table: "meta".into(), alias: "m".into() },
                TableRef { table: "other".into(), alias: "other".into() },
            ]
        );
    }

    #[test]
    fn test_update_strips_order_and_limit() {
        let mut t = translator();
        let r = t
            .query("UPDATE posts SET title = 'new' WHERE id > 1 ORDER BY id LIMIT 1")
            .unwrap();
        assert_eq!(r.affected_rows(), Some(2));
        assert_eq!(t.executed_queries()[0], "UPDATE posts SET title = :param0 WHERE id > 1");
    }

    #[test]
    fn test_single_table_delete() {
        let mut t = translator();
        let r = t.query("DELETE FROM meta WHERE k = 'x' LIMIT 10").unwrap();
        assert_eq!(r.affected_rows(), Some(2));
        assert_eq!(count(&mut t, "meta"), 2);
    }

    #[test]
    fn test_multi_table_delete() {
        let mut t = translator();
        let r = t
            .query(
                "DELETE p, m FROM posts p LEFT JOIN meta m ON m.post_id = p.id WHERE p.title = 'a'",
            )
            .unwrap();
        assert_eq!(r.affected_rows(), Some(3));
        assert_eq!(count(&mut t, "posts"), 2);
        assert_eq!(count(&mut t, "meta"), 2);
        assert!(t.executed_queries()[0].starts_with("SELECT \"p\".\"id\" AS __pk_0, \"m\".\"meta_id\" AS __pk_1"));
    }

    #[test]
    fn test_multi_table_delete_without_matches() {
        let mut t = translator();
        let r = t
            .query("DELETE m FROM meta m JOIN posts p ON p.id = m.post_id WHERE p.title = 'none'")
            .unwrap();
        assert_eq!(r.affected_rows(), Some(0));
        assert!(t.executed_queries()[1].ends_with("WHERE 0=1"));
    }
}
