//! CREATE TABLE / CREATE INDEX and the column and index definitions ALTER
//! TABLE reuses.

use super::{quote_name, schema, Translator};
use crate::error::{Result, TranslateError};
use crate::keywords::keyword_flags;
use crate::model::QueryResult;
use crate::rewriter::{render, Rewriter};
use crate::token::{quote_string, Filter, Token, TokenFlags, TokenKind, TokenValue};
use tracing::{debug, info};

/// SQLite storage class for a MySQL base type name.
pub(crate) fn sqlite_type(mysql: &str) -> Option<&'static str> {
    Some(match mysql.to_ascii_lowercase().as_str() {
        "bit" | "bool" | "boolean" | "tinyint" | "smallint" | "mediumint" | "int" | "integer"
        | "bigint" | "year" => "integer",
        "float" | "double" | "double precision" | "real" | "decimal" | "dec" | "numeric"
        | "fixed" => "real",
        "date" | "datetime" | "timestamp" | "time" | "char" | "varchar" | "nchar" | "nvarchar"
        | "tinytext" | "text" | "mediumtext" | "longtext" | "json" | "enum" | "set" => "text",
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" | "geometry"
        | "point" | "linestring" | "polygon" | "multipoint" | "multilinestring"
        | "multipolygon" | "geometrycollection" | "geomcollection" => "blob",
        _ => return None,
    })
}

fn is_data_type(token: &Token) -> bool {
    if token.flags.contains(TokenFlags::DATA_TYPE) {
        return true;
    }
    matches!(token.kind, TokenKind::Keyword | TokenKind::None)
        && keyword_flags(&token.text).is_some_and(|f| f.contains(TokenFlags::DATA_TYPE))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldDef {
    pub name: String,
    /// Declared type as MySQL reports it, e.g. `bigint(20) unsigned`.
    pub mysql_type: String,
    pub sqlite_type: &'static str,
    pub not_null: bool,
    /// Default as an SQL expression.
    pub default: Option<String>,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub on_update_now: bool,
}

impl FieldDef {
    /// Column definition for SQLite. `inline_pk` is false when the key is
    /// declared at table level.
    pub fn to_sql(&self, inline_pk: bool) -> String {
        let mut sql = format!("{} {}", quote_name(&self.name), self.sqlite_type);
        if inline_pk && self.primary_key {
            sql.push_str(if self.auto_increment {
                " PRIMARY KEY AUTOINCREMENT"
            } else {
                " PRIMARY KEY"
            });
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if self.sqlite_type == "text" {
            sql.push_str(" COLLATE NOCASE");
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexKind {
    Primary,
    Unique,
    Key,
    Fulltext,
    Spatial,
}

impl IndexKind {
    pub fn as_mysql(self) -> &'static str {
        match self {
            IndexKind::Primary => "PRIMARY",
            IndexKind::Unique => "UNIQUE",
            IndexKind::Key => "KEY",
            IndexKind::Fulltext => "FULLTEXT",
            IndexKind::Spatial => "SPATIAL",
        }
    }

    pub fn from_mysql(value: &str) -> Option<Self> {
        let first = value.split_whitespace().next()?.to_ascii_uppercase();
        Some(match first.as_str() {
            "PRIMARY" => IndexKind::Primary,
            "UNIQUE" => IndexKind::Unique,
            "KEY" | "INDEX" => IndexKind::Key,
            "FULLTEXT" => IndexKind::Fulltext,
            "SPATIAL" => IndexKind::Spatial,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IndexDef {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<String>,
}

impl IndexDef {
    pub fn sqlite_name(&self, table: &str) -> String {
        format!("{table}__{}", self.name)
    }

    pub fn create_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_name(c)).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.kind == IndexKind::Unique { "UNIQUE " } else { "" },
            quote_name(&self.sqlite_name(table)),
            quote_name(table),
            columns.join(", ")
        )
    }
}

pub(crate) fn on_update_trigger_name(table: &str, column: &str) -> String {
    format!("__{table}_{column}_on_update__")
}

fn on_update_trigger_sql(table: &str, column: &str) -> String {
    let t = quote_name(table);
    let c = quote_name(column);
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} AFTER UPDATE ON {t} FOR EACH ROW \
         WHEN NEW.{c} = OLD.{c} \
         BEGIN UPDATE {t} SET {c} = CURRENT_TIMESTAMP WHERE rowid = NEW.rowid; END",
        quote_name(&on_update_trigger_name(table, column))
    )
}

/// One entry of a CREATE TABLE body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Definition {
    Field(FieldDef),
    Index(IndexDef),
    /// FOREIGN KEY and CHECK constraints, which are dropped.
    Ignored,
}

pub(crate) fn significant(tokens: &[Token]) -> Vec<Token> {
    tokens.iter().filter(|t| !t.is_semantically_void()).cloned().collect()
}

/// Splits a parenthesized body at its top-level commas, keeping whitespace.
pub(crate) fn split_top_level(body: &[Token]) -> Vec<Vec<Token>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0usize;
    for token in body {
        if token.is_operator("(") {
            depth += 1;
        } else if token.is_operator(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_operator(",") {
            parts.push(Vec::new());
            continue;
        }
        if let Some(part) = parts.last_mut() {
            part.push(token.clone());
        }
    }
    parts
}

/// Significant tokens of each top-level entry of a body.
pub(crate) fn split_definitions(body: &[Token]) -> Vec<Vec<Token>> {
    split_top_level(body)
        .iter()
        .map(|p| significant(p))
        .filter(|p| !p.is_empty())
        .collect()
}

pub(crate) fn parse_definition(tokens: &[Token]) -> Result<Definition> {
    let Some(first) = tokens.first() else {
        return Err(TranslateError::Parse("empty column definition".into()));
    };
    let is_constraint = first.kind == TokenKind::Keyword
        && (first.flags.contains(TokenFlags::KEY) || first.is_keyword(&["CONSTRAINT", "CHECK"]));
    if is_constraint {
        return parse_constraint(tokens);
    }
    parse_field(tokens).map(Definition::Field)
}

/// `name type [(args)] [UNSIGNED] [ZEROFILL] [options...]`
pub(crate) fn parse_field(tokens: &[Token]) -> Result<FieldDef> {
    let name = tokens
        .first()
        .ok_or_else(|| TranslateError::Parse("missing column name".into()))?
        .value_str()
        .into_owned();
    let type_token = tokens
        .get(1)
        .ok_or_else(|| TranslateError::Parse(format!("column {name} has no type")))?;
    if !is_data_type(type_token) {
        return Err(TranslateError::UnknownDataType(type_token.text.clone()));
    }
    let base = type_token.value_str().to_ascii_lowercase();
    let base = base.split_whitespace().collect::<Vec<_>>().join(" ");
    let storage = sqlite_type(&base).ok_or_else(|| TranslateError::UnknownDataType(base.clone()))?;

    let mut field = FieldDef {
        name,
        mysql_type: base,
        sqlite_type: storage,
        ..FieldDef::default()
    };

    let mut i = 2;
    if tokens.get(i).is_some_and(|t| t.is_operator("(")) {
        let close = matching_paren(tokens, i);
        field.mysql_type.push_str(&render(&tokens[i..=close]));
        i = close + 1;
    }
    while let Some(t) = tokens.get(i) {
        let modifier = t.value_str().to_ascii_lowercase();
        if modifier == "unsigned" || modifier == "zerofill" {
            field.mysql_type.push(' ');
            field.mysql_type.push_str(&modifier);
            i += 1;
        } else {
            break;
        }
    }

    while let Some(t) = tokens.get(i) {
        i += 1;
        match t.value_upper().as_str() {
            "NOT NULL" => field.not_null = true,
            "NULL" => {}
            "AUTO_INCREMENT" => {
                field.auto_increment = true;
                field.primary_key = true;
            }
            "PRIMARY KEY" | "KEY" => field.primary_key = true,
            "UNIQUE" | "UNIQUE KEY" => field.unique = true,
            "DEFAULT" => {
                let (default, used) = default_expression(&tokens[i..]);
                field.default = default;
                i += used;
            }
            "ON UPDATE" => {
                let (value, used) = default_expression(&tokens[i..]);
                field.on_update_now = value.as_deref() == Some("CURRENT_TIMESTAMP");
                i += used;
            }
            "COMMENT" | "CHARACTER SET" | "CHARSET" | "COLLATE" => i += 1,
            other => debug!(option = other, "ignoring column option"),
        }
    }
    Ok(field)
}

/// Index of the `)` closing the `(` at `open`.
pub(crate) fn matching_paren(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        if t.is_operator("(") {
            depth += 1;
        } else if t.is_operator(")") {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i;
            }
        }
    }
    tokens.len().saturating_sub(1)
}

/// Reads a DEFAULT or ON UPDATE value; returns it with the token count used.
fn default_expression(tokens: &[Token]) -> (Option<String>, usize) {
    let Some(t) = tokens.first() else {
        return (None, 0);
    };
    let call_len = if tokens.get(1).is_some_and(|n| n.is_operator("(")) {
        matching_paren(tokens, 1) + 1
    } else {
        1
    };
    let value = match (&t.kind, &t.value) {
        (TokenKind::String, v) => quote_string(&v.to_string()),
        (TokenKind::Number, TokenValue::Int(n)) => n.to_string(),
        (TokenKind::Number, TokenValue::Float(x)) => x.to_string(),
        (TokenKind::Bool, TokenValue::Bool(b)) => i64::from(*b).to_string(),
        _ if t.is_keyword(&["NULL"]) => "NULL".to_string(),
        _ if matches!(
            t.value_upper().as_str(),
            "CURRENT_TIMESTAMP" | "NOW" | "LOCALTIME" | "LOCALTIMESTAMP"
        ) =>
        {
            return (Some("CURRENT_TIMESTAMP".into()), call_len)
        }
        _ if t.is_operator("(") => {
            let close = matching_paren(tokens, 0);
            return (Some(render(&tokens[..=close])), close + 1);
        }
        _ => t.text.clone(),
    };
    (Some(value), 1)
}

/// `[CONSTRAINT [name]] {PRIMARY KEY|UNIQUE|KEY|INDEX|FULLTEXT|SPATIAL} [name] (cols)`
pub(crate) fn parse_constraint(tokens: &[Token]) -> Result<Definition> {
    let mut i = 0;
    let mut name = None;
    if tokens.first().is_some_and(|t| t.is_keyword(&["CONSTRAINT"])) {
        i += 1;
        if tokens.get(i).is_some_and(|t| t.is_identifier_like() && !t.flags.contains(TokenFlags::KEY)) {
            name = Some(tokens[i].value_str().into_owned());
            i += 1;
        }
    }
    let Some(kind_token) = tokens.get(i) else {
        return Err(TranslateError::Parse("constraint without a type".into()));
    };
    if kind_token.is_keyword(&["FOREIGN KEY", "FOREIGN", "CHECK"]) {
        debug!("dropping {} constraint", kind_token.value_str());
        return Ok(Definition::Ignored);
    }
    let kind = IndexKind::from_mysql(&kind_token.value_str())
        .ok_or_else(|| TranslateError::Unsupported(format!("constraint {}", kind_token.text)))?;
    i += 1;
    if kind_token.value_str().split_whitespace().count() == 1
        && matches!(kind, IndexKind::Unique | IndexKind::Fulltext | IndexKind::Spatial)
        && tokens.get(i).is_some_and(|t| t.is_keyword(&["KEY", "INDEX"]))
    {
        i += 1;
    }
    if let Some(t) = tokens.get(i).filter(|t| !t.is_operator("(") && !t.is_keyword(&["USING"])) {
        name = Some(t.value_str().into_owned());
        i += 1;
    }
    if tokens.get(i).is_some_and(|t| t.is_keyword(&["USING"])) {
        i += 2;
    }
    let columns = index_columns(tokens.get(i..).unwrap_or_default());
    if columns.is_empty() {
        return Err(TranslateError::Parse(format!("{} without columns", kind.as_mysql())));
    }
    let name = match kind {
        IndexKind::Primary => "PRIMARY".to_string(),
        _ => name.unwrap_or_else(|| columns.join("_")),
    };
    Ok(Definition::Index(IndexDef { name, kind, columns }))
}

/// Column names of `(a, b(191) DESC, c)`, prefix lengths and ordering dropped.
pub(crate) fn index_columns(tokens: &[Token]) -> Vec<String> {
    let mut columns = Vec::new();
    let mut depth = 0usize;
    for t in tokens {
        if t.is_operator("(") {
            depth += 1;
        } else if t.is_operator(")") {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                break;
            }
        } else if depth == 1 && t.is_identifier_like() && !t.is_keyword(&["ASC", "DESC"]) {
            columns.push(t.value_str().into_owned());
        }
    }
    columns
}

impl Translator {
    pub(super) fn handle_create(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::keyword(&["CREATE"]));
        let mut temporary = false;
        if rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["TEMPORARY"])) {
            rw.skip(&Filter::any());
            temporary = true;
        }
        let subject = rw
            .peek_nth(1)
            .map(|t| t.value_upper())
            .ok_or_else(|| TranslateError::Parse("CREATE without a subject".into()))?;
        match subject.as_str() {
            "TABLE" => self.create_table(rw, temporary),
            "INDEX" | "UNIQUE" | "UNIQUE INDEX" | "FULLTEXT" | "FULLTEXT INDEX" | "SPATIAL"
            | "SPATIAL INDEX" => self.create_index(rw),
            "DATABASE" | "SCHEMA" | "PROCEDURE" => {
                debug!("ignoring CREATE {}", subject);
                Ok(QueryResult::Ok(true))
            }
            other => Err(TranslateError::Unsupported(format!("CREATE {other}"))),
        }
    }

    fn create_table(&mut self, rw: &mut Rewriter, temporary: bool) -> Result<QueryResult> {
        rw.skip(&Filter::keyword(&["TABLE"]));
        let if_not_exists = rw.peek_nth(1).is_some_and(|t| t.is_keyword(&["IF NOT EXISTS"]));
        if if_not_exists {
            rw.skip(&Filter::any());
        }
        let table = rw
            .skip(&Filter::any())
            .filter(|t| t.is_identifier_like())
            .map(|t| t.value_str().into_owned())
            .ok_or_else(|| TranslateError::Parse("CREATE TABLE without a name".into()))?;
        self.session.table_name = Some(table.clone());

        if !rw.peek_nth(1).is_some_and(|t| t.is_operator("(")) {
            return Err(TranslateError::Unsupported(format!("CREATE TABLE {table} without columns")));
        }
        rw.skip(&Filter::operator(&["("]));
        let mut body = rw.skip_and_return_all(&Filter::operator(&[")"]).at_depth(0));
        body.pop();

        let mut fields = Vec::new();
        let mut indexes = Vec::new();
        for part in split_definitions(&body) {
            match parse_definition(&part)? {
                Definition::Field(f) => fields.push(f),
                Definition::Index(i) => indexes.push(i),
                Definition::Ignored => {}
            }
        }
        if fields.is_empty() {
            return Err(TranslateError::Parse(format!("CREATE TABLE {table} has no columns")));
        }
        self.create_table_from(&table, fields, indexes, if_not_exists, temporary)?;
        Ok(QueryResult::Ok(true))
    }

    /// Runs the SQLite DDL for a parsed table and records its MySQL types.
    pub(super) fn create_table_from(
        &mut self,
        table: &str,
        mut fields: Vec<FieldDef>,
        indexes: Vec<IndexDef>,
        if_not_exists: bool,
        temporary: bool,
    ) -> Result<()> {
        for index in indexes.iter().filter(|i| i.kind == IndexKind::Primary) {
            for field in fields.iter_mut() {
                if index.columns.iter().any(|c| c.eq_ignore_ascii_case(&field.name)) {
                    field.primary_key = true;
                }
            }
        }
        let pk: Vec<&FieldDef> = fields.iter().filter(|f| f.primary_key).collect();
        let composite = pk.len() > 1;
        if composite && pk.iter().any(|f| f.auto_increment) {
            return Err(TranslateError::Unsupported(format!(
                "AUTO_INCREMENT with a composite primary key on {table}"
            )));
        }

        let mut definitions: Vec<String> = fields.iter().map(|f| f.to_sql(!composite)).collect();
        if composite {
            let columns: Vec<String> = pk.iter().map(|f| quote_name(&f.name)).collect();
            definitions.push(format!("PRIMARY KEY ({})", columns.join(", ")));
        }
        let sql = format!(
            "CREATE {}TABLE {}{} (\n\t{}\n)",
            if temporary { "TEMPORARY " } else { "" },
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            quote_name(table),
            definitions.join(",\n\t")
        );
        self.execute_with(&sql, &Default::default())?;

        let cache = self.type_cache();
        for field in &fields {
            cache.set(table, &field.name, &field.mysql_type)?;
        }

        let mut secondary: Vec<IndexDef> = indexes
            .into_iter()
            .filter(|i| i.kind != IndexKind::Primary)
            .collect();
        for field in fields.iter().filter(|f| f.unique && !f.primary_key) {
            secondary.push(IndexDef {
                name: field.name.clone(),
                kind: IndexKind::Unique,
                columns: vec![field.name.clone()],
            });
        }
        for index in &secondary {
            self.add_index(table, index)?;
        }
        for field in fields.iter().filter(|f| f.on_update_now) {
            self.execute_with(&on_update_trigger_sql(table, &field.name), &Default::default())?;
        }
        info!(table, columns = fields.len(), indexes = secondary.len(), "created table");
        Ok(())
    }

    pub(super) fn add_index(&mut self, table: &str, index: &IndexDef) -> Result<()> {
        self.execute_with(&index.create_sql(table), &Default::default())?;
        self.type_cache()
            .set(table, &index.sqlite_name(table), index.kind.as_mysql())
    }

    pub(super) fn add_on_update_trigger(&mut self, table: &str, column: &str) -> Result<()> {
        self.execute_with(&on_update_trigger_sql(table, column), &Default::default())?;
        Ok(())
    }

    /// `CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX name ON table (cols)`
    fn create_index(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        let head = rw.skip_and_return_all(&Filter::keyword(&["ON"]));
        let head = significant(&head);
        let kind = head
            .first()
            .and_then(|t| IndexKind::from_mysql(&t.value_str()))
            .unwrap_or(IndexKind::Key);
        let name = head
            .iter()
            .rev()
            .nth(1)
            .filter(|t| t.is_identifier_like() && !t.flags.contains(TokenFlags::KEY))
            .map(|t| t.value_str().into_owned())
            .ok_or_else(|| TranslateError::Parse("CREATE INDEX without a name".into()))?;
        let table = rw
            .skip(&Filter::any())
            .filter(|t| t.is_identifier_like())
            .map(|t| t.value_str().into_owned())
            .ok_or_else(|| TranslateError::Parse("CREATE INDEX without a table".into()))?;
        self.session.table_name = Some(table.clone());
        if !schema::table_exists(&self.engine, &table)? {
            return Err(TranslateError::Parse(format!("table {table} does not exist")));
        }

        let columns = index_columns(&significant(rw.remaining()));
        if columns.is_empty() {
            return Err(TranslateError::Parse(format!("index {name} has no columns")));
        }
        let kind = if kind == IndexKind::Primary { IndexKind::Unique } else { kind };
        self.add_index(&table, &IndexDef { name, kind, columns })?;
        Ok(QueryResult::Ok(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lexer::tokenize;

    fn definitions(body: &str) -> Vec<Definition> {
        split_definitions(&tokenize(body).unwrap())
            .iter()
            .map(|d| parse_definition(d).unwrap())
            .collect()
    }

    #[test]
    fn test_sqlite_type_is_stable() {
        for ty in ["varchar", "BIGINT", "longtext", "decimal", "datetime", "blob"] {
            assert_eq!(sqlite_type(ty), sqlite_type(ty));
        }
        assert_eq!(sqlite_type("VARCHAR"), Some("text"));
        assert_eq!(sqlite_type("tinyint"), Some("integer"));
        assert_eq!(sqlite_type("double precision"), Some("real"));
        assert_eq!(sqlite_type("longblob"), Some("blob"));
        assert_eq!(sqlite_type("uuid"), None);
    }

    #[test]
    fn test_parse_fields_and_constraints() {
        let defs = definitions(
            "ID bigint(20) unsigned NOT NULL auto_increment, \
             post_title text NOT NULL, \
             post_date datetime NOT NULL default '0000-00-00 00:00:00', \
             menu_order int(11) NOT NULL DEFAULT -1 COMMENT 'order', \
             d DATE, \
             PRIMARY KEY  (ID), \
             KEY type_status_date (post_title(191), post_date DESC), \
             UNIQUE (menu_order), \
             CONSTRAINT fk FOREIGN KEY (d) REFERENCES other (d)",
        );
        let Definition::Field(id) = &defs[0] else { panic!("{defs:?}") };
        assert_eq!(id.mysql_type, "bigint(20) unsigned");
        assert!(id.auto_increment && id.primary_key && id.not_null);

        let Definition::Field(date) = &defs[2] else { panic!() };
        assert_eq!(date.default.as_deref(), Some("'0000-00-00 00:00:00'"));

        let Definition::Field(order) = &defs[3] else { panic!() };
        assert_eq!(order.default.as_deref(), Some("-1"));

        let Definition::Field(d) = &defs[4] else { panic!() };
        assert_eq!((d.mysql_type.as_str(), d.sqlite_type), ("date", "text"));

        assert_eq!(
            defs[5],
            Definition::Index(IndexDef {
                name: "PRIMARY".into(),
                kind: IndexKind::Primary,
                columns: vec!["ID".into()],
            })
        );
        assert_eq!(
            defs[6],
            Definition::Index(IndexDef {
                name: "type_status_date".into(),
                kind: IndexKind::Key,
                columns: vec!["post_title".into(), "post_date".into()],
            })
        );
        let Definition::Index(unique) = &defs[7] else { panic!() };
        assert_eq!((unique.name.as_str(), unique.kind), ("menu_order", IndexKind::Unique));
        assert_eq!(defs[8], Definition::Ignored);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let tokens = split_definitions(&tokenize("a frobnicator").unwrap());
        assert!(matches!(
            parse_definition(&tokens[0]),
            Err(TranslateError::UnknownDataType(_))
        ));
    }

    #[test]
    fn test_field_sql() {
        let field = FieldDef {
            name: "title".into(),
            mysql_type: "varchar(20)".into(),
            sqlite_type: "text",
            not_null: true,
            default: Some("''".into()),
            ..FieldDef::default()
        };
        assert_eq!(field.to_sql(true), "\"title\" text NOT NULL DEFAULT '' COLLATE NOCASE");
    }

    #[test]
    fn test_create_table_end_to_end() {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        t.query(
            "CREATE TABLE IF NOT EXISTS wp_posts (\
               ID bigint(20) unsigned NOT NULL AUTO_INCREMENT,\
               post_name varchar(200) NOT NULL DEFAULT '',\
               modified timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\
               PRIMARY KEY (ID),\
               KEY post_name (post_name(191))\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_520_ci",
        )
        .unwrap();
        let sql = &t.executed_queries()[0];
        assert!(sql.contains("\"ID\" integer PRIMARY KEY AUTOINCREMENT NOT NULL"), "{sql}");
        assert!(t.executed_queries().iter().any(|q| q.contains("\"wp_posts__post_name\"")));
        assert!(t.executed_queries().iter().any(|q| q.contains("__wp_posts_modified_on_update__")));

        let cache = t.type_cache();
        assert_eq!(cache.get("wp_posts", "ID").unwrap().as_deref(), Some("bigint(20) unsigned"));
        assert_eq!(cache.get("wp_posts", "wp_posts__post_name").unwrap().as_deref(), Some("KEY"));
    }

    #[test]
    fn test_composite_key_with_auto_increment_fails() {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        let err = t
            .query("CREATE TABLE c (a INT AUTO_INCREMENT, b INT, PRIMARY KEY (a, b))")
            .unwrap_err();
        assert!(matches!(err, TranslateError::Unsupported(_)));
        assert!(t.last_error().is_some());
    }

    #[test]
    fn test_create_index_statement() {
        let mut t = Translator::open_in_memory(Config::default()).unwrap();
        t.query("CREATE TABLE s (a INT, b TEXT)").unwrap();
        t.query("CREATE UNIQUE INDEX ab ON s (a, b(10))").unwrap();
        assert_eq!(
            t.executed_queries()[0],
            "CREATE UNIQUE INDEX IF NOT EXISTS \"s__ab\" ON \"s\" (\"a\", \"b\")"
        );
        assert!(t.query("CREATE DATABASE other").is_ok());
    }
}
