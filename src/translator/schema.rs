//! Catalog introspection over `sqlite_master` and the table-valued pragmas.

use crate::engine::{params, Engine, Params};
use crate::error::Result;
use crate::model::Cell;
use crate::type_cache::CACHE_TABLE;

/// Quotes a name for SQLite with double quotes.
pub fn quote_name(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Tables the translator owns or SQLite maintains itself.
pub(crate) fn is_internal_table(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("sqlite_") || lower == CACHE_TABLE
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnInfo {
    pub name: String,
    pub sqlite_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it.
    pub pk: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IndexInfo {
    pub name: String,
    pub unique: bool,
    /// `c` for CREATE INDEX, `u` for UNIQUE constraints, `pk` for the key.
    pub origin: String,
    pub columns: Vec<String>,
}

fn text(cell: Option<&Cell>) -> String {
    cell.and_then(Cell::to_display_string).unwrap_or_default()
}

pub(crate) fn table_exists(engine: &Engine, table: &str) -> Result<bool> {
    let found = engine.query_i64(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = :t COLLATE NOCASE",
        &params([(":t", Cell::text(table))]),
    )?;
    Ok(found.unwrap_or(0) > 0)
}

pub(crate) fn index_exists(engine: &Engine, index: &str) -> Result<bool> {
    let found = engine.query_i64(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = :i COLLATE NOCASE",
        &params([(":i", Cell::text(index))]),
    )?;
    Ok(found.unwrap_or(0) > 0)
}

/// User tables, sorted by name.
pub(crate) fn list_tables(engine: &Engine) -> Result<Vec<String>> {
    let rows = engine.query(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        &Params::new(),
    )?;
    Ok(rows
        .rows
        .iter()
        .filter_map(|r| r.first().and_then(Cell::to_display_string))
        .filter(|name| !is_internal_table(name))
        .collect())
}

pub(crate) fn table_info(engine: &Engine, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows = engine.query(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(:t) ORDER BY cid",
        &params([(":t", Cell::text(table))]),
    )?;
    Ok(rows
        .rows
        .iter()
        .map(|r| ColumnInfo {
            name: text(r.first()),
            sqlite_type: text(r.get(1)),
            not_null: r.get(2).and_then(Cell::as_i64).unwrap_or(0) != 0,
            default: r.get(3).and_then(Cell::to_display_string),
            pk: r.get(4).and_then(Cell::as_i64).unwrap_or(0),
        })
        .collect())
}

/// Indexes of a table with their columns in key order.
pub(crate) fn index_list(engine: &Engine, table: &str) -> Result<Vec<IndexInfo>> {
    let list = engine.query(
        "SELECT name, \"unique\", origin FROM pragma_index_list(:t) ORDER BY seq DESC",
        &params([(":t", Cell::text(table))]),
    )?;
    let mut indexes = Vec::with_capacity(list.len());
    for row in &list.rows {
        let name = text(row.first());
        let info = engine.query(
            "SELECT name FROM pragma_index_info(:i) ORDER BY seqno",
            &params([(":i", Cell::text(&name))]),
        )?;
        indexes.push(IndexInfo {
            unique: row.get(1).and_then(Cell::as_i64).unwrap_or(0) != 0,
            origin: text(row.get(2)),
            columns: info.rows.iter().map(|r| text(r.first())).collect(),
            name,
        });
    }
    Ok(indexes)
}

/// Primary key columns in key order.
pub(crate) fn primary_key(engine: &Engine, table: &str) -> Result<Vec<String>> {
    let mut columns: Vec<ColumnInfo> = table_info(engine, table)?
        .into_iter()
        .filter(|c| c.pk > 0)
        .collect();
    columns.sort_by_key(|c| c.pk);
    Ok(columns.into_iter().map(|c| c.name).collect())
}

/// The `CREATE TABLE` text SQLite stored for a table.
pub(crate) fn table_sql(engine: &Engine, table: &str) -> Result<Option<String>> {
    let rows = engine.query(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = :t COLLATE NOCASE",
        &params([(":t", Cell::text(table))]),
    )?;
    Ok(rows.rows.first().and_then(|r| r.first()).and_then(Cell::to_display_string))
}

/// `(name, sql)` of every explicitly created index or trigger on a table.
pub(crate) fn dependent_objects(engine: &Engine, table: &str, kind: &str) -> Result<Vec<(String, String)>> {
    let rows = engine.query(
        "SELECT name, sql FROM sqlite_master \
         WHERE type = :kind AND tbl_name = :t COLLATE NOCASE AND sql IS NOT NULL",
        &params([(":kind", Cell::text(kind)), (":t", Cell::text(table))]),
    )?;
    Ok(rows
        .rows
        .iter()
        .map(|r| (text(r.first()), text(r.get(1))))
        .collect())
}

/// Strips the `table__` prefix CREATE TABLE and ALTER TABLE put on index names.
pub(crate) fn mysql_index_name(table: &str, index: &str) -> String {
    let prefix = format!("{table}__");
    match (index.get(..prefix.len()), index.get(prefix.len()..)) {
        (Some(head), Some(rest)) if !rest.is_empty() && head.eq_ignore_ascii_case(&prefix) => rest.to_string(),
        _ => index.to_string(),
    }
}
