//! Side table remembering the MySQL type each column and index was declared
//! with, so introspection can report `varchar(20)` instead of `text`.

use crate::engine::{params, Engine};
use crate::error::Result;
use crate::model::Cell;
use std::collections::HashMap;

pub const CACHE_TABLE: &str = "_mysql_data_types_cache";

pub struct TypeCache<'a> {
    engine: &'a Engine,
}

impl<'a> TypeCache<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn ensure(&self) -> Result<()> {
        self.engine.exec(&format!(
            "CREATE TABLE IF NOT EXISTS {CACHE_TABLE} (\
             `table` TEXT NOT NULL COLLATE NOCASE, \
             `column_or_index` TEXT NOT NULL COLLATE NOCASE, \
             `mysql_type` TEXT NOT NULL, \
             PRIMARY KEY(`table`, `column_or_index`))"
        ))?;
        Ok(())
    }

    pub fn set(&self, table: &str, column_or_index: &str, mysql_type: &str) -> Result<()> {
        self.engine.execute(
            &format!(
                "INSERT INTO {CACHE_TABLE} (`table`, `column_or_index`, `mysql_type`) \
                 VALUES (:table, :column, :type) \
                 ON CONFLICT(`table`, `column_or_index`) DO UPDATE SET `mysql_type` = excluded.`mysql_type`"
            ),
            &params([
                (":table", Cell::text(table)),
                (":column", Cell::text(column_or_index)),
                (":type", Cell::text(mysql_type)),
            ]),
        )?;
        Ok(())
    }

    pub fn get(&self, table: &str, column_or_index: &str) -> Result<Option<String>> {
        let rows = self.engine.query(
            &format!(
                "SELECT `mysql_type` FROM {CACHE_TABLE} \
                 WHERE `table` = :table COLLATE NOCASE AND `column_or_index` = :column COLLATE NOCASE"
            ),
            &params([
                (":table", Cell::text(table)),
                (":column", Cell::text(column_or_index)),
            ]),
        )?;
        Ok(rows.get(0, "mysql_type").and_then(Cell::to_display_string))
    }

    /// Every cached entry of a table keyed by lower-cased column or index name.
    pub fn for_table(&self, table: &str) -> Result<HashMap<String, String>> {
        let rows = self.engine.query(
            &format!(
                "SELECT `column_or_index`, `mysql_type` FROM {CACHE_TABLE} \
                 WHERE `table` = :table COLLATE NOCASE"
            ),
            &params([(":table", Cell::text(table))]),
        )?;
        Ok(rows
            .rows
            .iter()
            .filter_map(|row| match row.as_slice() {
                [name, ty] => Some((name.to_display_string()?.to_lowercase(), ty.to_display_string()?)),
                _ => None,
            })
            .collect())
    }

    pub fn remove(&self, table: &str, column_or_index: &str) -> Result<()> {
        self.engine.execute(
            &format!(
                "DELETE FROM {CACHE_TABLE} \
                 WHERE `table` = :table COLLATE NOCASE AND `column_or_index` = :column COLLATE NOCASE"
            ),
            &params([
                (":table", Cell::text(table)),
                (":column", Cell::text(column_or_index)),
            ]),
        )?;
        Ok(())
    }

    pub fn rename_table(&self, old: &str, new: &str) -> Result<()> {
        self.engine.execute(
            &format!("UPDATE {CACHE_TABLE} SET `table` = :new WHERE `table` = :old COLLATE NOCASE"),
            &params([(":old", Cell::text(old)), (":new", Cell::text(new))]),
        )?;
        Ok(())
    }

    pub fn remove_table(&self, table: &str) -> Result<()> {
        self.engine.execute(
            &format!("DELETE FROM {CACHE_TABLE} WHERE `table` = :table COLLATE NOCASE"),
            &params([(":table", Cell::text(table))]),
        )?;
        Ok(())
    }
}
