//! DROP, TRUNCATE, the SHOW family, DESCRIBE and the table maintenance
//! statements. Most of these answer from the catalog instead of running SQL.

use super::create::on_update_trigger_name;
use super::{quote_name, schema, StatementKind, Translator};
use crate::engine::{params, Params};
use crate::error::{Result, TranslateError};
use crate::model::{Cell, QueryResult, ResultSet};
use crate::rewriter::Rewriter;
use crate::token::{quote_identifier, Filter, Token};
use regex::Regex;
use tracing::{debug, info};

const GRANT_ALL: &str = "GRANT ALL PRIVILEGES ON *.* TO `root`@`localhost` WITH GRANT OPTION";

fn like_matches(pattern: &str, value: &str) -> bool {
    let mut re = String::with_capacity(pattern.len() * 2 + 6);
    re.push_str("(?i)^");
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    re.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok().is_some_and(|r| r.is_match(value))
}

/// `a, b, c` at the start of `tokens`; stops at the first name not
/// preceded by a comma.
fn name_list(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    let mut expect_name = true;
    for t in tokens.iter().filter(|t| !t.is_semantically_void()) {
        if expect_name && t.is_identifier_like() {
            names.push(t.value_str().into_owned());
            expect_name = false;
        } else if !expect_name && t.is_operator(",") {
            expect_name = true;
        } else {
            break;
        }
    }
    names
}

fn next_name(rw: &mut Rewriter, what: &str) -> Result<String> {
    rw.skip(&Filter::any())
        .filter(|t| t.is_identifier_like())
        .map(|t| t.value_str().into_owned())
        .ok_or_else(|| TranslateError::Parse(format!("expected {what}")))
}

fn skip_if(rw: &mut Rewriter, words: &[&str]) -> bool {
    let found = rw.peek_nth(1).is_some_and(|t| {
        let upper = t.value_upper();
        words.iter().any(|w| *w == upper)
    });
    if found {
        rw.skip(&Filter::any());
    }
    found
}

/// `[FROM|IN] table`
fn table_operand(rw: &mut Rewriter) -> Result<String> {
    skip_if(rw, &["FROM", "IN"]);
    next_name(rw, "a table name")
}

/// `[FROM db] [LIKE 'pattern']`
fn like_operand(rw: &mut Rewriter) -> Option<String> {
    if skip_if(rw, &["FROM", "IN"]) {
        rw.skip(&Filter::any());
    }
    if skip_if(rw, &["LIKE"]) {
        return rw.skip(&Filter::any()).map(|t| t.value_str().into_owned());
    }
    None
}

/// `WHERE column = 'value'`, the only filter SHOW INDEX callers send.
fn where_equals(rw: &mut Rewriter) -> Option<(String, String)> {
    if !skip_if(rw, &["WHERE"]) {
        return None;
    }
    let column = rw.skip(&Filter::any())?.value_str().into_owned();
    rw.skip(&Filter::operator(&["="]));
    let value = rw.skip(&Filter::any())?.value_str().into_owned();
    Some((column, value))
}

fn retain_matching(rs: &mut ResultSet, column: &str, value: &str) {
    if let Some(index) = rs.column_index(column) {
        rs.rows.retain(|row| {
            row.get(index)
                .and_then(Cell::to_display_string)
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
        });
    }
}

fn unquote_default(value: &str) -> String {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map(|v| v.replace("''", "'"))
        .unwrap_or_else(|| value.to_string())
}

/// A column as MySQL's introspection statements describe it.
struct ColumnMeta {
    name: String,
    mysql_type: String,
    nullable: bool,
    key: &'static str,
    /// Raw SQL default as SQLite stored it.
    default: Option<String>,
    extra: &'static str,
}

impl Translator {
    pub(super) fn handle_drop(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        skip_if(rw, &["TEMPORARY"]);
        let subject = rw
            .skip(&Filter::any())
            .map(|t| t.value_upper())
            .ok_or_else(|| TranslateError::Parse("DROP without a subject".into()))?;
        match subject.as_str() {
            "TABLE" | "TABLES" => {
                let if_exists = skip_if(rw, &["IF EXISTS"]);
                let tables = name_list(rw.remaining());
                if tables.is_empty() {
                    return Err(TranslateError::Parse("DROP TABLE without a name".into()));
                }
                self.session.table_name = tables.first().cloned();
                for table in &tables {
                    let sql = format!(
                        "DROP TABLE {}{}",
                        if if_exists { "IF EXISTS " } else { "" },
                        quote_name(table)
                    );
                    self.execute_with(&sql, &Params::new())?;
                    self.type_cache().remove_table(table)?;
                }
                info!(tables = tables.len(), "dropped tables");
                Ok(QueryResult::Ok(true))
            }
            "INDEX" => {
                let index = next_name(rw, "an index name")?;
                if !skip_if(rw, &["ON"]) {
                    return Err(TranslateError::Parse(format!("DROP INDEX {index} without ON")));
                }
                let table = next_name(rw, "a table name")?;
                self.session.table_name = Some(table.clone());
                self.drop_index(&table, &index)?;
                Ok(QueryResult::Ok(true))
            }
            "DATABASE" | "SCHEMA" | "PROCEDURE" => {
                debug!("ignoring DROP {}", subject);
                Ok(QueryResult::Ok(true))
            }
            other => Err(TranslateError::Unsupported(format!("DROP {other}"))),
        }
    }

    pub(super) fn handle_truncate(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        skip_if(rw, &["TABLE"]);
        let table = next_name(rw, "a table name")?;
        self.session.table_name = Some(table.clone());

        let done = self.execute_with(&format!("DELETE FROM {}", quote_name(&table)), &Params::new())?;
        if schema::table_exists(&self.engine, "sqlite_sequence")? {
            self.execute_with(
                "DELETE FROM sqlite_sequence WHERE name = :t",
                &params([(":t", Cell::text(&table))]),
            )?;
        }
        Ok(QueryResult::Affected {
            rows: done.changes,
            last_insert_id: None,
        })
    }

    pub(super) fn handle_show(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        let full = skip_if(rw, &["FULL"]);
        let what = rw
            .skip(&Filter::any())
            .map(|t| t.value_upper())
            .ok_or_else(|| TranslateError::Parse("SHOW without a subject".into()))?;
        let rows = match what.as_str() {
            "COLUMNS" | "FIELDS" => {
                let table = table_operand(rw)?;
                self.session.table_name = Some(table.clone());
                let mut rs = self.describe(&table, full)?;
                if let Some(pattern) = like_operand(rw) {
                    rs.rows.retain(|row| {
                        row.first()
                            .and_then(Cell::as_str)
                            .is_some_and(|name| like_matches(&pattern, name))
                    });
                }
                rs
            }
            "INDEX" | "INDEXES" | "KEYS" => {
                let table = table_operand(rw)?;
                self.session.table_name = Some(table.clone());
                let mut rs = self.show_index(&table)?;
                if let Some((column, value)) = where_equals(rw) {
                    retain_matching(&mut rs, &column, &value);
                }
                rs
            }
            "TABLES" => {
                let pattern = like_operand(rw);
                self.show_tables(full, pattern.as_deref())?
            }
            "TABLE" => {
                if !skip_if(rw, &["STATUS"]) {
                    return Err(TranslateError::Unsupported("SHOW TABLE without STATUS".into()));
                }
                let pattern = like_operand(rw);
                self.table_status(pattern.as_deref())?
            }
            "CREATE" => {
                let object = rw.skip(&Filter::any()).map(|t| t.value_upper()).unwrap_or_default();
                match object.as_str() {
                    "TABLE" => {
                        let table = next_name(rw, "a table name")?;
                        self.session.table_name = Some(table.clone());
                        self.show_create_table(&table)?
                    }
                    "PROCEDURE" => ResultSet::with_columns(&["Procedure", "sql_mode", "Create Procedure"]),
                    other => return Err(TranslateError::Unsupported(format!("SHOW CREATE {other}"))),
                }
            }
            "GRANTS" => {
                let mut rs = ResultSet::with_columns(&["Grants for root@localhost"]);
                rs.push(vec![Cell::text(GRANT_ALL)]);
                rs
            }
            "VARIABLES" | "STATUS" => ResultSet::with_columns(&["Variable_name", "Value"]),
            "DATABASES" | "SCHEMAS" => {
                let mut rs = ResultSet::with_columns(&["Database"]);
                rs.push(vec![Cell::text("information_schema")]);
                rs.push(vec![Cell::text("main")]);
                rs
            }
            other => return Err(TranslateError::Unsupported(format!("SHOW {other}"))),
        };
        Ok(QueryResult::Rows(rows))
    }

    pub(super) fn handle_describe(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        if rw.peek_nth(1).is_some_and(|t| {
            t.is_keyword(&["SELECT", "INSERT", "UPDATE", "DELETE", "REPLACE", "WITH"])
        }) {
            return Err(TranslateError::Unsupported("EXPLAIN of a statement".into()));
        }
        let table = next_name(rw, "a table name")?;
        self.session.table_name = Some(table.clone());
        let mut rs = self.describe(&table, false)?;
        if let Some(pattern) = rw.skip(&Filter::any()).map(|t| t.value_str().into_owned()) {
            rs.rows.retain(|row| {
                row.first()
                    .and_then(Cell::as_str)
                    .is_some_and(|name| like_matches(&pattern, name))
            });
        }
        Ok(QueryResult::Rows(rs))
    }

    pub(super) fn handle_check(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        skip_if(rw, &["TABLE"]);
        let tables = name_list(rw.remaining());
        let verdict = self
            .engine
            .query("PRAGMA quick_check", &Params::new())?
            .rows
            .first()
            .and_then(|r| r.first())
            .and_then(Cell::to_display_string)
            .unwrap_or_default();
        let healthy = verdict.eq_ignore_ascii_case("ok");
        let status = if healthy { ("status", "OK".to_string()) } else { ("error", verdict) };
        self.table_report(&tables, "check", status).map(QueryResult::Rows)
    }

    /// OPTIMIZE, REPAIR and ANALYZE all come down to one VACUUM, run when
    /// the translator closes.
    pub(super) fn handle_maintenance(&mut self, rw: &mut Rewriter, kind: StatementKind) -> Result<QueryResult> {
        rw.skip(&Filter::any());
        skip_if(rw, &["NO_WRITE_TO_BINLOG", "LOCAL"]);
        skip_if(rw, &["TABLE"]);
        let tables = name_list(rw.remaining());
        self.vacuum_requested = true;
        info!(op = kind.as_str(), tables = tables.len(), "scheduled VACUUM");
        let op = kind.as_str().to_ascii_lowercase();
        self.table_report(&tables, &op, ("status", "OK".to_string()))
            .map(QueryResult::Rows)
    }

    fn table_report(&self, tables: &[String], op: &str, status: (&str, String)) -> Result<ResultSet> {
        let mut rs = ResultSet::with_columns(&["Table", "Op", "Msg_type", "Msg_text"]);
        for table in tables {
            let (msg_type, msg_text) = if schema::table_exists(&self.engine, table)? {
                (status.0.to_string(), status.1.clone())
            } else {
                ("Error".to_string(), format!("Table '{table}' doesn't exist"))
            };
            rs.push(vec![
                Cell::text(table),
                Cell::text(op),
                Cell::text(msg_type),
                Cell::text(msg_text),
            ]);
        }
        Ok(rs)
    }

    fn column_meta(&self, table: &str) -> Result<Vec<ColumnMeta>> {
        let columns = schema::table_info(&self.engine, table)?;
        if columns.is_empty() {
            return Err(TranslateError::Parse(format!("Table '{table}' doesn't exist")));
        }
        let types = self.type_cache().for_table(table)?;
        let indexes = schema::index_list(&self.engine, table)?;
        let triggers: Vec<String> = schema::dependent_objects(&self.engine, table, "trigger")?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let autoincrement = schema::table_sql(&self.engine, table)?
            .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));
        let pk_len = columns.iter().filter(|c| c.pk > 0).count();

        Ok(columns
            .into_iter()
            .map(|c| {
                let key = if c.pk > 0 {
                    "PRI"
                } else if indexes
                    .iter()
                    .any(|i| i.unique && i.columns.len() == 1 && i.columns[0].eq_ignore_ascii_case(&c.name))
                {
                    "UNI"
                } else if indexes
                    .iter()
                    .any(|i| i.columns.first().is_some_and(|f| f.eq_ignore_ascii_case(&c.name)))
                {
                    "MUL"
                } else {
                    ""
                };
                let on_update = on_update_trigger_name(table, &c.name);
                let extra = if c.pk > 0 && pk_len == 1 && autoincrement {
                    "auto_increment"
                } else if triggers.iter().any(|t| t.eq_ignore_ascii_case(&on_update)) {
                    "on update CURRENT_TIMESTAMP"
                } else {
                    ""
                };
                let mysql_type = types
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(&c.name))
                    .map(|(_, ty)| ty.clone())
                    .unwrap_or_else(|| c.sqlite_type.to_ascii_lowercase());
                ColumnMeta {
                    nullable: !c.not_null && c.pk == 0,
                    default: c.default.filter(|d| !d.eq_ignore_ascii_case("NULL")),
                    name: c.name,
                    mysql_type,
                    key,
                    extra,
                }
            })
            .collect())
    }

    /// DESCRIBE and SHOW [FULL] COLUMNS.
    fn describe(&self, table: &str, full: bool) -> Result<ResultSet> {
        let mut rs = if full {
            ResultSet::with_columns(&[
                "Field", "Type", "Collation", "Null", "Key", "Default", "Extra", "Privileges", "Comment",
            ])
        } else {
            ResultSet::with_columns(&["Field", "Type", "Null", "Key", "Default", "Extra"])
        };
        for column in self.column_meta(table)? {
            let default = column
                .default
                .as_deref()
                .map_or(Cell::Null, |d| Cell::text(unquote_default(d)));
            let null = Cell::text(if column.nullable { "YES" } else { "NO" });
            let mut row = vec![Cell::text(&column.name), Cell::text(&column.mysql_type)];
            if full {
                let textual = ["char", "text", "enum", "set"]
                    .iter()
                    .any(|t| column.mysql_type.contains(t));
                row.push(if textual { Cell::text("utf8mb4_general_ci") } else { Cell::Null });
            }
            row.extend([null, Cell::text(column.key), default, Cell::text(column.extra)]);
            if full {
                row.push(Cell::text("select,insert,update,references"));
                row.push(Cell::text(""));
            }
            rs.push(row);
        }
        Ok(rs)
    }

    fn show_index(&self, table: &str) -> Result<ResultSet> {
        let mut rs = ResultSet::with_columns(&[
            "Table", "Non_unique", "Key_name", "Seq_in_index", "Column_name", "Collation",
            "Cardinality", "Sub_part", "Packed", "Null", "Index_type", "Comment", "Index_comment",
        ]);
        let columns = schema::table_info(&self.engine, table)?;
        let nullable = |name: &str| {
            columns
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(name) && !c.not_null && c.pk == 0)
        };
        let types = self.type_cache().for_table(table)?;

        let mut keys: Vec<(String, bool, String, Vec<String>)> = Vec::new();
        let pk = schema::primary_key(&self.engine, table)?;
        if !pk.is_empty() {
            keys.push(("PRIMARY".into(), true, "BTREE".into(), pk));
        }
        for index in schema::index_list(&self.engine, table)? {
            if index.origin == "pk" {
                continue;
            }
            let kind = types
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&index.name))
                .map(|(_, kind)| kind.as_str());
            let index_type = match kind {
                Some("FULLTEXT") => "FULLTEXT",
                Some("SPATIAL") => "SPATIAL",
                _ => "BTREE",
            };
            keys.push((
                schema::mysql_index_name(table, &index.name),
                index.unique,
                index_type.into(),
                index.columns,
            ));
        }

        for (name, unique, index_type, key_columns) in keys {
            for (seq, column) in key_columns.iter().enumerate() {
                rs.push(vec![
                    Cell::text(table),
                    Cell::Int(i64::from(!unique)),
                    Cell::text(&name),
                    Cell::Int(seq as i64 + 1),
                    Cell::text(column),
                    Cell::text("A"),
                    Cell::Int(0),
                    Cell::Null,
                    Cell::Null,
                    Cell::text(if nullable(column) { "YES" } else { "" }),
                    Cell::text(&index_type),
                    Cell::text(""),
                    Cell::text(""),
                ]);
            }
        }
        Ok(rs)
    }

    fn show_tables(&self, full: bool, pattern: Option<&str>) -> Result<ResultSet> {
        let mut rs = if full {
            ResultSet::with_columns(&["Tables_in_main", "Table_type"])
        } else {
            ResultSet::with_columns(&["Tables_in_main"])
        };
        for table in schema::list_tables(&self.engine)? {
            if pattern.is_some_and(|p| !like_matches(p, &table)) {
                continue;
            }
            let mut row = vec![Cell::text(table)];
            if full {
                row.push(Cell::text("BASE TABLE"));
            }
            rs.push(row);
        }
        Ok(rs)
    }

    fn table_status(&self, pattern: Option<&str>) -> Result<ResultSet> {
        let mut rs = ResultSet::with_columns(&[
            "Name", "Engine", "Version", "Row_format", "Rows", "Avg_row_length", "Data_length",
            "Max_data_length", "Index_length", "Data_free", "Auto_increment", "Create_time",
            "Update_time", "Check_time", "Collation", "Checksum", "Create_options", "Comment",
        ]);
        let has_sequence = schema::table_exists(&self.engine, "sqlite_sequence")?;
        for table in schema::list_tables(&self.engine)? {
            if pattern.is_some_and(|p| !like_matches(p, &table)) {
                continue;
            }
            let rows = self
                .engine
                .query_i64(&format!("SELECT COUNT(*) FROM {}", quote_name(&table)), &Params::new())?
                .unwrap_or(0);
            let next_id = if has_sequence {
                self.engine
                    .query_i64(
                        "SELECT seq + 1 FROM sqlite_sequence WHERE name = :t",
                        &params([(":t", Cell::text(&table))]),
                    )?
                    .map_or(Cell::Null, Cell::Int)
            } else {
                Cell::Null
            };
            rs.push(vec![
                Cell::text(table),
                Cell::text("InnoDB"),
                Cell::Int(10),
                Cell::text("Dynamic"),
                Cell::Int(rows),
                Cell::Int(0),
                Cell::Int(0),
                Cell::Int(0),
                Cell::Int(0),
                Cell::Int(0),
                next_id,
                Cell::Null,
                Cell::Null,
                Cell::Null,
                Cell::text("utf8mb4_general_ci"),
                Cell::Null,
                Cell::text(""),
                Cell::text(""),
            ]);
        }
        Ok(rs)
    }

    /// Rebuilds MySQL DDL from the catalog and the cached column types.
    fn show_create_table(&self, table: &str) -> Result<ResultSet> {
        let mut lines = Vec::new();
        for column in self.column_meta(table)? {
            let mut line = format!("  {} {}", quote_identifier(&column.name), column.mysql_type);
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            match column.default.as_deref() {
                Some(d) => {
                    line.push_str(" DEFAULT ");
                    line.push_str(d);
                }
                None if column.nullable => line.push_str(" DEFAULT NULL"),
                None => {}
            }
            match column.extra {
                "auto_increment" => line.push_str(" AUTO_INCREMENT"),
                "" => {}
                other => {
                    line.push(' ');
                    line.push_str(other);
                }
            }
            lines.push(line);
        }

        let quoted = |cols: &[String]| -> String {
            cols.iter().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(",")
        };
        let pk = schema::primary_key(&self.engine, table)?;
        if !pk.is_empty() {
            lines.push(format!("  PRIMARY KEY ({})", quoted(&pk)));
        }
        let types = self.type_cache().for_table(table)?;
        for index in schema::index_list(&self.engine, table)? {
            if index.origin == "pk" {
                continue;
            }
            let cached = types
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&index.name))
                .map(|(_, kind)| kind.as_str());
            let prefix = match cached {
                Some("FULLTEXT") => "FULLTEXT KEY",
                Some("SPATIAL") => "SPATIAL KEY",
                _ if index.unique => "UNIQUE KEY",
                _ => "KEY",
            };
            lines.push(format!(
                "  {prefix} {} ({})",
                quote_identifier(&schema::mysql_index_name(table, &index.name)),
                quoted(&index.columns)
            ));
        }

        let ddl = format!(
            "CREATE TABLE {} (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            quote_identifier(table),
            lines.join(",\n")
        );
        let mut rs = ResultSet::with_columns(&["Table", "Create Table"]);
        rs.push(vec![Cell::text(table), Cell::text(ddl)]);
        Ok(rs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lexer::tokenize;

    fn translator() -> Translator {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        t.query(
            "CREATE TABLE wp_options (option_id bigint(20) unsigned NOT NULL AUTO_INCREMENT, \
             option_name varchar(191) NOT NULL DEFAULT '', option_value longtext, \
             autoload varchar(20) NOT NULL DEFAULT 'yes', \
             PRIMARY KEY (option_id), UNIQUE KEY option_name (option_name), KEY autoload (autoload))",
        )
        .unwrap();
        t.query("INSERT INTO wp_options (option_name, option_value) VALUES ('siteurl', 'x')")
            .unwrap();
        t
    }

    fn rows(t: &mut Translator, sql: &str) -> ResultSet {
        t.query(sql).unwrap().into_rows().unwrap()
    }

    #[test]
    fn test_like_matches() {
        assert!(like_matches("wp_%", "WP_options"));
        assert!(like_matches("wp\\_o_tions", "wp_options"));
        assert!(!like_matches("wp\\_options", "wpxoptions"));
        assert!(!like_matches("wp_", "wp_options"));
        assert!(like_matches("a.b", "a.b"));
        assert!(!like_matches("a.b", "axb"));
    }

    #[test]
    fn test_name_list() {
        let tokens = tokenize("a, `b` , c QUICK").unwrap();
        assert_eq!(name_list(&tokens), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_describe() {
        let mut t = translator();
        let rs = rows(&mut t, "DESCRIBE wp_options");
        assert_eq!(rs.columns, vec!["Field", "Type", "Null", "Key", "Default", "Extra"]);
        assert_eq!(rs.len(), 4);
        assert_eq!(rs.rows[0][1], Cell::text("bigint(20) unsigned"));
        assert_eq!(rs.rows[0][3], Cell::text("PRI"));
        assert_eq!(rs.rows[0][5], Cell::text("auto_increment"));
        assert_eq!(rs.rows[1][3], Cell::text("UNI"));
        assert_eq!(rs.rows[1][4], Cell::text(""));
        assert_eq!(rs.rows[2][2], Cell::text("YES"));
        assert_eq!(rs.rows[2][4], Cell::Null);
        assert_eq!(rs.rows[3][3], Cell::text("MUL"));
        assert_eq!(rs.rows[3][4], Cell::text("yes"));

        let full = rows(&mut t, "SHOW FULL COLUMNS FROM wp_options");
        assert_eq!(full.columns.len(), 9);
        assert_eq!(full.get(1, "Collation"), Some(&Cell::text("utf8mb4_general_ci")));
    }

    #[test]
    fn test_show_index() {
        let mut t = translator();
        let rs = rows(&mut t, "SHOW INDEX FROM wp_options");
        let names: Vec<String> = (0..rs.len())
            .filter_map(|i| rs.get(i, "Key_name").and_then(Cell::to_display_string))
            .collect();
        assert_eq!(names, vec!["PRIMARY", "option_name", "autoload"]);
        assert_eq!(rs.get(1, "Non_unique"), Some(&Cell::Int(0)));
        assert_eq!(rs.get(2, "Non_unique"), Some(&Cell::Int(1)));

        let rs = rows(&mut t, "SHOW INDEX FROM wp_options WHERE Key_name = 'autoload'");
        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "Column_name"), Some(&Cell::text("autoload")));
    }

    #[test]
    fn test_show_tables_and_status() {
        let mut t = translator();
        t.query("CREATE TABLE other (a INT)").unwrap();
        assert_eq!(rows(&mut t, "SHOW TABLES").len(), 2);
        let like = rows(&mut t, "SHOW TABLES LIKE 'wp\\_%'");
        assert_eq!(like.rows, vec![vec![Cell::text("wp_options")]]);
        let full = rows(&mut t, "SHOW FULL TABLES");
        assert_eq!(full.columns, vec!["Tables_in_main", "Table_type"]);

        let status = rows(&mut t, "SHOW TABLE STATUS LIKE 'wp_options'");
        assert_eq!(status.get(0, "Rows"), Some(&Cell::Int(1)));
        assert_eq!(status.get(0, "Auto_increment"), Some(&Cell::Int(2)));
    }

    #[test]
    fn test_show_create_table() {
        let mut t = translator();
        let rs = rows(&mut t, "SHOW CREATE TABLE wp_options");
        let ddl = rs.get(0, "Create Table").and_then(Cell::as_str).unwrap().to_string();
        assert!(ddl.starts_with("CREATE TABLE `wp_options` (\n  `option_id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,"));
        assert!(ddl.contains("  PRIMARY KEY (`option_id`)"));
        assert!(ddl.contains("  UNIQUE KEY `option_name` (`option_name`)"));
        assert!(ddl.contains("  KEY `autoload` (`autoload`)"));
    }

    #[test]
    fn test_misc_show() {
        let mut t = translator();
        assert_eq!(rows(&mut t, "SHOW GRANTS").rows[0][0], Cell::text(GRANT_ALL));
        assert!(rows(&mut t, "SHOW VARIABLES LIKE 'max_allowed_packet'").is_empty());
        assert_eq!(rows(&mut t, "SHOW DATABASES").len(), 2);
        assert!(t.query("SHOW PROCESSLIST").is_err());
    }

    #[test]
    fn test_drop_and_truncate() {
        let mut t = translator();
        t.query("CREATE TABLE a (x INT)").unwrap();
        t.query("CREATE TABLE b (x INT)").unwrap();
        t.query("DROP TABLE IF EXISTS a, b, missing").unwrap();
        assert_eq!(schema::list_tables(t.engine()).unwrap(), vec!["wp_options"]);
        assert!(t.type_cache().for_table("a").unwrap().is_empty());

        t.query("DROP INDEX autoload ON wp_options").unwrap();
        assert!(!schema::index_exists(t.engine(), "wp_options__autoload").unwrap());

        let r = t.query("TRUNCATE TABLE wp_options").unwrap();
        assert_eq!(r.affected_rows(), Some(1));
        let r = t.query("INSERT INTO wp_options (option_name) VALUES ('home')").unwrap();
        assert_eq!(r.last_insert_id(), Some(1));
    }

    #[test]
    fn test_check_and_optimize() {
        let mut t = translator();
        let rs = rows(&mut t, "CHECK TABLE wp_options, missing");
        assert_eq!(rs.get(0, "Msg_text"), Some(&Cell::text("OK")));
        assert_eq!(rs.get(1, "Msg_type"), Some(&Cell::text("Error")));

        let rs = rows(&mut t, "OPTIMIZE TABLE wp_options");
        assert_eq!(rs.get(0, "Op"), Some(&Cell::text("optimize")));
        assert!(t.vacuum_requested);
        t.close().unwrap();
    }
}
