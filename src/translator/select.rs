use super::{schema, Translator};
use crate::engine::{params, Params};
use crate::error::Result;
use crate::model::{Cell, QueryResult};
use crate::rewriter::{render, Rewriter};
use crate::token::{quote_identifier, Filter, Token, TokenFlags, TokenKind};
use tracing::{debug, warn};

/// Always valid, never returns a row.
const EMPTY_QUERY: &str = "SELECT 1 WHERE 1=0";

/// Name the rewritten query uses for `information_schema.TABLES`.
const SCHEMA_TABLES: &str = "_information_schema_tables";

const SCHEMA_TABLES_COLUMNS: &[&str] = &[
    "TABLE_CATALOG",
    "TABLE_SCHEMA",
    "TABLE_NAME",
    "TABLE_TYPE",
    "ENGINE",
    "ROW_FORMAT",
    "TABLE_ROWS",
    "AVG_ROW_LENGTH",
    "DATA_LENGTH",
    "INDEX_LENGTH",
    "DATA_FREE",
    "AUTO_INCREMENT",
    "TABLE_COLLATION",
    "TABLE_COMMENT",
];

/// Session variables and `CONVERT(...)` have no SQLite counterpart.
fn has_unsupported_construct(tokens: &[Token]) -> bool {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_semantically_void()).collect();
    significant.iter().enumerate().any(|(i, t)| {
        (t.kind == TokenKind::Symbol && t.flags.contains(TokenFlags::SYSTEM))
            || (t.is_function()
                && t.value_upper() == "CONVERT"
                && significant.get(i + 1).is_some_and(|n| n.is_operator("(")))
    })
}

fn mentions_information_schema(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| t.is_identifier_like() && t.value_str().eq_ignore_ascii_case("information_schema"))
}

/// The value of a `table_schema = '...'` filter. SQLite has one schema, so
/// it answers to whatever name the client asks for.
fn requested_schema(tokens: &[Token]) -> Option<String> {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_semantically_void()).collect();
    significant.windows(3).find_map(|w| {
        (w[0].is_identifier_like()
            && w[0].value_str().eq_ignore_ascii_case("table_schema")
            && w[1].is_operator("=")
            && w[2].kind == TokenKind::String)
            .then(|| w[2].value_str().into_owned())
    })
}

impl Translator {
    pub(super) fn handle_select(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        if has_unsupported_construct(rw.remaining()) {
            warn!("unsupported SELECT construct, answering with an empty result");
            let rows = self.execute(EMPTY_QUERY)?.rows.unwrap_or_default();
            return Ok(QueryResult::Rows(rows));
        }
        let schema_tables = mentions_information_schema(rw.remaining());
        if schema_tables {
            let schema_name = requested_schema(rw.remaining()).unwrap_or_else(|| "main".to_string());
            let cte = self.schema_tables_cte(&schema_name)?;
            rw.add_many(cte);
        }

        let mut calc_found_rows = false;
        let mut limit_at = None;
        let mut in_projection = true;

        while let Some(token) = rw.skip_one() {
            let top_level = rw.depth() == 0;
            if token.is_keyword(&["SQL_CALC_FOUND_ROWS"]) {
                calc_found_rows = true;
                continue;
            }
            if top_level && token.is_keyword(&["FOR UPDATE", "LOCK IN SHARE MODE"]) {
                continue;
            }
            if schema_tables
                && token.is_identifier_like()
                && token.value_str().eq_ignore_ascii_case("information_schema")
                && rw.peek_nth(1).is_some_and(|t| t.is_operator("."))
            {
                rw.skip(&Filter::operator(&["."]));
                let view = rw.skip(&Filter::any()).map(|t| t.value_upper()).unwrap_or_default();
                if view != "TABLES" {
                    warn!(view = %view, "no emulation for this information_schema view, answering with an empty result");
                    let rows = self.execute_with(EMPTY_QUERY, &Params::new())?.rows.unwrap_or_default();
                    return Ok(QueryResult::Rows(rows));
                }
                rw.add(Token::identifier(SCHEMA_TABLES));
                continue;
            }
            if token.is_function()
                && token.value_upper() == "FOUND_ROWS"
                && rw.peek_nth(1).is_some_and(|t| t.is_operator("("))
            {
                rw.skip(&Filter::operator(&[")"]).at_depth(rw.depth()));
                rw.add(Token::number(self.last_found_rows.unwrap_or(0)));
                if in_projection && top_level {
                    rw.add(Token::raw(" AS `FOUND_ROWS()`"));
                }
                continue;
            }
            if top_level && token.is_keyword(&["FROM"]) {
                in_projection = false;
                if self.session.table_name.is_none() {
                    if let Some(next) = rw.peek_nth(1).filter(|t| t.is_identifier_like()) {
                        self.session.table_name = Some(next.value_str().into_owned());
                    }
                }
            }
            let is_limit = top_level && token.is_keyword(&["LIMIT"]);
            self.translate_token(rw, token)?;
            if is_limit {
                limit_at = Some(rw.output_len().saturating_sub(1));
            }
        }
        self.finish_like(rw);
        self.close_having(rw);

        let sql = rw.render();
        let rows = self.execute(&sql)?.rows.unwrap_or_default();

        let found = match (calc_found_rows, limit_at) {
            (true, Some(index)) => {
                let unlimited = render(&rw.output()[..index]);
                let count_sql = format!("SELECT COUNT(*) FROM ({})", unlimited.trim_end());
                let params = self.session.params.clone();
                let count = self.execute_with(&count_sql, &params)?;
                count
                    .rows
                    .and_then(|r| r.rows.first().and_then(|row| row.first()).and_then(Cell::as_i64))
                    .unwrap_or(0)
            }
            _ => rows.len() as i64,
        };
        debug!(found, "remembered FOUND_ROWS");
        self.last_found_rows = Some(found);
        Ok(QueryResult::Rows(rows))
    }

    /// `WITH` clause holding one `information_schema.TABLES` row per table,
    /// so the caller's own projection and filters run against it.
    fn schema_tables_cte(&mut self, schema_name: &str) -> Result<Vec<Token>> {
        let tables = schema::list_tables(&self.engine)?;
        let page_size = self.engine.query_i64("PRAGMA page_size", &Params::new())?.unwrap_or(0);
        let pages = self.engine.query_i64("PRAGMA page_count", &Params::new())?.unwrap_or(0);
        let free = self.engine.query_i64("PRAGMA freelist_count", &Params::new())?.unwrap_or(0);
        let has_sequence = schema::table_exists(&self.engine, "sqlite_sequence")?;

        let mut counts = Vec::with_capacity(tables.len());
        for table in &tables {
            let sql = format!("SELECT COUNT(*) FROM {}", schema::quote_name(table));
            counts.push(self.engine.query_i64(&sql, &Params::new())?.unwrap_or(0));
        }
        let total_rows: i64 = counts.iter().sum();
        let used_bytes = (pages - free).max(0) * page_size;

        let columns = SCHEMA_TABLES_COLUMNS
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut cte = vec![Token::raw(format!(
            "WITH {}({columns}) AS (",
            quote_identifier(SCHEMA_TABLES)
        ))];
        let schema_param = self.session.bind(Cell::text(schema_name));

        if tables.is_empty() {
            let nulls = vec!["NULL"; SCHEMA_TABLES_COLUMNS.len()].join(", ");
            cte.push(Token::raw(format!("SELECT {nulls} WHERE 0")));
        }
        for (i, (table, rows)) in tables.into_iter().zip(counts).enumerate() {
            // SQLite keeps no per-table size, so split the used pages by row share
            let bytes = if total_rows > 0 { used_bytes * rows / total_rows } else { 0 };
            let next_id = if has_sequence {
                self.engine.query_i64(
                    "SELECT seq + 1 FROM sqlite_sequence WHERE name = :t",
                    &params([(":t", Cell::text(&table))]),
                )?
            } else {
                None
            };
            let avg = if rows > 0 { bytes / rows } else { 0 };
            if i > 0 {
                cte.push(Token::raw(" UNION ALL "));
            }
            cte.push(Token::raw("SELECT 'def', "));
            cte.push(schema_param.clone());
            cte.push(Token::raw(", "));
            cte.push(self.session.bind(Cell::text(table)));
            cte.push(Token::raw(format!(
                ", 'BASE TABLE', 'InnoDB', 'Dynamic', {rows}, {avg}, {bytes}, 0, {}, {}, 'utf8mb4_general_ci', ''",
                free * page_size,
                next_id.map_or_else(|| "NULL".to_string(), |n| n.to_string()),
            )));
        }
        cte.push(Token::raw(") "));
        debug!(schema = schema_name, "emulating information_schema.TABLES");
        Ok(cte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn translator() -> Translator {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        t.query("CREATE TABLE t (a INT, b VARCHAR(10))").unwrap();
        for i in 1..=6 {
            t.query(&format!("INSERT INTO t (a, b) VALUES ({i}, 'v{i}')")).unwrap();
        }
        t
    }

    #[test]
    fn test_calc_found_rows() {
        let mut t = translator();
        let rows = t
            .query("SELECT SQL_CALC_FOUND_ROWS * FROM t WHERE a BETWEEN 1 AND 5 LIMIT 2")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!t.executed_queries()[0].contains("SQL_CALC_FOUND_ROWS"));
        assert_eq!(
            t.executed_queries()[1],
            "SELECT COUNT(*) FROM (SELECT  * FROM t WHERE a BETWEEN 1 AND 5)"
        );

        let found = t.query("SELECT FOUND_ROWS()").unwrap().into_rows().unwrap();
        assert_eq!(found.columns, vec!["FOUND_ROWS()"]);
        assert_eq!(found.rows[0][0], Cell::Int(5));
    }

    #[test]
    fn test_found_rows_without_calc_is_row_count() {
        let mut t = translator();
        t.query("SELECT a FROM t WHERE a > 4").unwrap();
        assert_eq!(t.last_found_rows(), Some(2));
    }

    #[test]
    fn test_locking_clauses_stripped() {
        let mut t = translator();
        let rows = t.query("SELECT a FROM t WHERE a = 1 FOR UPDATE").unwrap().into_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(t.query("SELECT a FROM t LOCK IN SHARE MODE").is_ok());
    }

    #[test]
    fn test_unsupported_constructs_return_no_rows() {
        let mut t = translator();
        let rows = t.query("SELECT @@SESSION.sql_mode").unwrap().into_rows().unwrap();
        assert!(rows.is_empty());
        let rows = t
            .query("SELECT CONVERT(b USING utf8mb4) FROM t")
            .unwrap()
            .into_rows()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_information_schema() {
        let mut t = translator();
        t.query("CREATE TABLE u (x INT)").unwrap();
        let count = t
            .query("SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'db'")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(count.rows[0][0], Cell::Int(2));

        let listing = t
            .query("SELECT TABLE_NAME FROM information_schema.TABLES")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.get(0, "TABLE_NAME"), Some(&Cell::text("t")));

        let sizes = t
            .query("SELECT SUM(data_length + index_length) AS bytes FROM information_schema.TABLES")
            .unwrap()
            .into_rows()
            .unwrap();
        assert!(sizes.get(0, "bytes").and_then(Cell::as_i64).is_some_and(|b| b > 0));
    }

    #[test]
    fn test_information_schema_honors_filters() {
        let mut t = translator();
        t.query("CREATE TABLE u (x INT)").unwrap();

        let found = t
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'wordpress' AND table_name = 't'",
            )
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(found.rows, vec![vec![Cell::text("t")]]);

        let count = t
            .query("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'missing'")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(count.rows[0][0], Cell::Int(0));

        let rows = t
            .query("SELECT TABLE_ROWS, TABLE_SCHEMA FROM information_schema.TABLES WHERE TABLE_NAME = 't'")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.rows, vec![vec![Cell::Int(6), Cell::text("main")]]);

        let other = t
            .query("SELECT column_name FROM information_schema.columns WHERE table_name = 't'")
            .unwrap()
            .into_rows()
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_information_schema_on_empty_database() {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        let count = t
            .query("SELECT COUNT(*) FROM information_schema.tables")
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(count.rows[0][0], Cell::Int(0));
    }

    #[test]
    fn test_table_name_is_captured() {
        let mut t = translator();
        t.query("SELECT a FROM `t` WHERE a IN (SELECT a FROM t)").unwrap();
        assert_eq!(t.session.table_name.as_deref(), Some("t"));
    }
}
