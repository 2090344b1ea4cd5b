//! ALTER TABLE. SQLite alters little in place, so CHANGE and MODIFY rebuild
//! the table through a scratch copy.

use super::create::{
    matching_paren, on_update_trigger_name, parse_constraint, parse_field, significant,
    split_definitions, split_top_level, Definition, FieldDef, IndexDef, IndexKind,
};
use super::{quote_name, schema, Translator};
use crate::engine::Params;
use crate::error::{Result, TranslateError};
use crate::lexer::tokenize;
use crate::model::QueryResult;
use crate::rewriter::{render, Rewriter};
use crate::token::{Filter, Token, TokenFlags, TokenKind};
use rand::Rng;
use tracing::{debug, info, warn};

/// Cuts a trailing `FIRST` or `AFTER col`. SQLite always appends.
fn strip_position(tokens: &[Token]) -> &[Token] {
    let at = tokens.iter().position(|t| {
        matches!(t.kind, TokenKind::Keyword | TokenKind::None)
            && matches!(t.value_upper().as_str(), "FIRST" | "AFTER")
    });
    match at {
        Some(i) if i >= 2 => {
            debug!("ignoring column position");
            &tokens[..i]
        }
        _ => tokens,
    }
}

fn name_at(tokens: &[Token], i: usize) -> Result<String> {
    tokens
        .get(i)
        .filter(|t| t.is_identifier_like() || t.kind == TokenKind::Keyword)
        .map(|t| t.value_str().into_owned())
        .ok_or_else(|| TranslateError::Parse("expected a name in ALTER TABLE".into()))
}

/// Points quoted or bare references to column `old` at `new`.
fn rename_column_refs(tokens: &[Token], old: &str, new: &str) -> Vec<Token> {
    tokens
        .iter()
        .map(|t| {
            let is_name = match t.kind {
                TokenKind::Symbol | TokenKind::None => true,
                TokenKind::String => t.flags.contains(TokenFlags::DOUBLE_QUOTES),
                _ => false,
            };
            if is_name && t.value_str().eq_ignore_ascii_case(old) {
                Token::raw(quote_name(new))
            } else {
                t.clone()
            }
        })
        .collect()
}

/// Rewrites a stored `CREATE TABLE` so column `old` takes the definition `field`.
fn rewrite_table_sql(sql: &str, old: &str, field: &FieldDef) -> Result<String> {
    let tokens = tokenize(sql)?;
    let open = tokens
        .iter()
        .position(|t| t.is_operator("("))
        .ok_or_else(|| TranslateError::Parse(format!("unexpected table definition: {sql}")))?;
    let close = matching_paren(&tokens, open);

    let mut found = false;
    let mut definitions = Vec::new();
    for part in split_top_level(&tokens[open + 1..close]) {
        let words = significant(&part);
        let Some(first) = words.first() else {
            continue;
        };
        if first.is_identifier_like() && first.value_str().eq_ignore_ascii_case(old) {
            found = true;
            // the key stays where it was declared
            let inline_pk = words.iter().any(|t| t.value_upper() == "PRIMARY KEY");
            let mut field = field.clone();
            field.primary_key = inline_pk;
            field.auto_increment &= inline_pk;
            field.auto_increment |= inline_pk && words.iter().any(|t| t.value_upper() == "AUTOINCREMENT");
            definitions.push(field.to_sql(inline_pk));
        } else {
            definitions.push(render(&rename_column_refs(&part, old, &field.name)).trim().to_string());
        }
    }
    if !found {
        return Err(TranslateError::Parse(format!("unknown column {old}")));
    }
    Ok(format!(
        "{} (\n\t{}\n){}",
        render(&tokens[..open]).trim_end(),
        definitions.join(",\n\t"),
        render(&tokens[close + 1..])
    ))
}

impl Translator {
    pub(super) fn handle_alter(&mut self, rw: &mut Rewriter) -> Result<QueryResult> {
        rw.skip(&Filter::keyword(&["ALTER"]));
        while rw
            .peek_nth(1)
            .is_some_and(|t| matches!(t.value_upper().as_str(), "IGNORE" | "ONLINE" | "OFFLINE"))
        {
            rw.skip(&Filter::any());
        }
        match rw.skip(&Filter::any()) {
            Some(t) if t.is_keyword(&["TABLE"]) => {}
            Some(t) => return Err(TranslateError::Unsupported(format!("ALTER {}", t.value_upper()))),
            None => return Err(TranslateError::Parse("ALTER without a subject".into())),
        }
        let mut table = rw
            .skip(&Filter::any())
            .filter(|t| t.is_identifier_like())
            .map(|t| t.value_str().into_owned())
            .ok_or_else(|| TranslateError::Parse("ALTER TABLE without a name".into()))?;
        self.session.table_name = Some(table.clone());

        let clauses = split_definitions(rw.remaining());
        if clauses.is_empty() {
            return Err(TranslateError::Parse(format!("ALTER TABLE {table} without changes")));
        }
        for clause in &clauses {
            self.alter_clause(&mut table, clause)?;
        }
        Ok(QueryResult::Ok(true))
    }

    fn alter_clause(&mut self, table: &mut String, clause: &[Token]) -> Result<()> {
        let Some((action, rest)) = clause.split_first() else {
            return Ok(());
        };
        let lead = rest
            .first()
            .filter(|t| t.kind == TokenKind::Keyword)
            .map(|t| t.value_upper())
            .unwrap_or_default();
        let after_column = if lead == "COLUMN" { &rest[1..] } else { rest };

        match action.value_upper().as_str() {
            "ADD" => {
                if rest.first().is_some_and(|t| t.is_operator("(")) {
                    let close = matching_paren(rest, 0);
                    for part in split_definitions(&rest[1..close]) {
                        self.add_column(table, &part)?;
                    }
                    return Ok(());
                }
                let constraint = lead != "COLUMN"
                    && rest.first().is_some_and(|t| {
                        t.kind == TokenKind::Keyword
                            && (t.flags.contains(TokenFlags::KEY) || t.is_keyword(&["CONSTRAINT", "CHECK"]))
                    });
                if !constraint {
                    return self.add_column(table, after_column);
                }
                match parse_constraint(rest)? {
                    Definition::Index(index) if index.kind == IndexKind::Primary => Err(
                        TranslateError::Unsupported(format!("ADD PRIMARY KEY on {table}")),
                    ),
                    Definition::Index(index) => self.add_index(table, &index),
                    _ => {
                        debug!("ignoring added constraint");
                        Ok(())
                    }
                }
            }
            "DROP" => match lead.as_str() {
                "PRIMARY KEY" | "PRIMARY" => {
                    Err(TranslateError::Unsupported(format!("DROP PRIMARY KEY on {table}")))
                }
                "INDEX" | "KEY" => self.drop_index(table, &name_at(rest, 1)?),
                "FOREIGN KEY" | "FOREIGN" | "CHECK" | "CONSTRAINT" => {
                    debug!("ignoring dropped constraint");
                    Ok(())
                }
                _ => self.drop_column(table, &name_at(after_column, 0)?),
            },
            "CHANGE" => {
                let old = name_at(after_column, 0)?;
                let field = parse_field(strip_position(&after_column[1..]))?;
                self.rebuild_column(table, &old, field)
            }
            "MODIFY" => {
                let field = parse_field(strip_position(after_column))?;
                let old = field.name.clone();
                self.rebuild_column(table, &old, field)
            }
            "RENAME" => match lead.as_str() {
                "COLUMN" => self.rename_column(table, &name_at(rest, 1)?, &name_at(rest, 3)?),
                "INDEX" | "KEY" => self.rename_index(table, &name_at(rest, 1)?, &name_at(rest, 3)?),
                "TO" | "AS" => self.rename_table(table, &name_at(rest, 1)?),
                _ => self.rename_table(table, &name_at(rest, 0)?),
            },
            other => Err(TranslateError::Unsupported(format!(
                "ALTER TABLE {table} {other}"
            ))),
        }
    }

    fn add_column(&mut self, table: &str, tokens: &[Token]) -> Result<()> {
        let field = parse_field(strip_position(tokens))?;
        if field.primary_key {
            return Err(TranslateError::Unsupported(format!(
                "adding primary key column {} to {table}",
                field.name
            )));
        }
        let mut stored = field.clone();
        let backfill_now = field.default.as_deref() == Some("CURRENT_TIMESTAMP");
        if backfill_now {
            warn!(column = %field.name, "added columns cannot default to the current time, backfilling once");
            stored.default = None;
            stored.not_null = false;
        } else if field.not_null && field.default.is_none() {
            // existing rows need a value
            stored.default = Some(match field.sqlite_type {
                "integer" | "real" => "0".into(),
                _ => "''".into(),
            });
        }

        let none = Params::new();
        let sql = format!("ALTER TABLE {} ADD COLUMN {}", quote_name(table), stored.to_sql(false));
        self.execute_with(&sql, &none)?;
        if backfill_now {
            let sql = format!(
                "UPDATE {} SET {} = CURRENT_TIMESTAMP",
                quote_name(table),
                quote_name(&field.name)
            );
            self.execute_with(&sql, &none)?;
        }
        self.type_cache().set(table, &field.name, &field.mysql_type)?;
        if field.unique {
            self.add_index(
                table,
                &IndexDef {
                    name: field.name.clone(),
                    kind: IndexKind::Unique,
                    columns: vec![field.name.clone()],
                },
            )?;
        }
        if field.on_update_now {
            self.add_on_update_trigger(table, &field.name)?;
        }
        info!(table, column = %field.name, "added column");
        Ok(())
    }

    /// Drops `name`, looking for the prefixed SQLite index first.
    pub(super) fn drop_index(&mut self, table: &str, name: &str) -> Result<()> {
        let prefixed = format!("{table}__{name}");
        let index = if schema::index_exists(&self.engine, &prefixed)? {
            prefixed
        } else {
            name.to_string()
        };
        self.execute_with(&format!("DROP INDEX {}", quote_name(&index)), &Params::new())?;
        self.type_cache().remove(table, &index)
    }

    /// Drops the on-update trigger of a column; true if there was one.
    fn drop_on_update_trigger(&mut self, table: &str, column: &str) -> Result<bool> {
        let name = on_update_trigger_name(table, column);
        let exists = schema::dependent_objects(&self.engine, table, "trigger")?
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(&name));
        if exists {
            self.execute_with(&format!("DROP TRIGGER {}", quote_name(&name)), &Params::new())?;
        }
        Ok(exists)
    }

    fn drop_column(&mut self, table: &str, column: &str) -> Result<()> {
        // SQLite refuses to drop indexed columns, so shrink those indexes first
        let indexed: Vec<schema::IndexInfo> = schema::index_list(&self.engine, table)?
            .into_iter()
            .filter(|i| i.origin == "c" && i.columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
            .collect();
        for index in indexed {
            let cached = self.type_cache().get(table, &index.name)?;
            self.execute_with(&format!("DROP INDEX {}", quote_name(&index.name)), &Params::new())?;
            self.type_cache().remove(table, &index.name)?;
            let columns: Vec<String> = index
                .columns
                .into_iter()
                .filter(|c| !c.eq_ignore_ascii_case(column))
                .collect();
            if !columns.is_empty() {
                let kind = cached
                    .as_deref()
                    .and_then(IndexKind::from_mysql)
                    .unwrap_or(if index.unique { IndexKind::Unique } else { IndexKind::Key });
                let def = IndexDef {
                    name: schema::mysql_index_name(table, &index.name),
                    kind,
                    columns,
                };
                self.add_index(table, &def)?;
            }
        }
        self.drop_on_update_trigger(table, column)?;

        let sql = format!("ALTER TABLE {} DROP COLUMN {}", quote_name(table), quote_name(column));
        self.execute_with(&sql, &Params::new())?;
        self.type_cache().remove(table, column)?;
        info!(table, column, "dropped column");
        Ok(())
    }

    /// CHANGE and MODIFY: copy the rows aside, recreate the table with the
    /// new column definition, copy them back and restore indexes and triggers.
    fn rebuild_column(&mut self, table: &str, old: &str, field: FieldDef) -> Result<()> {
        let create_sql = schema::table_sql(&self.engine, table)?
            .ok_or_else(|| TranslateError::Parse(format!("no such table: {table}")))?;
        let columns = schema::table_info(&self.engine, table)?;
        if !columns.iter().any(|c| c.name.eq_ignore_ascii_case(old)) {
            return Err(TranslateError::Parse(format!("unknown column {old} in {table}")));
        }
        let indexes = schema::dependent_objects(&self.engine, table, "index")?;
        let old_trigger = on_update_trigger_name(table, old);
        let triggers: Vec<(String, String)> = schema::dependent_objects(&self.engine, table, "trigger")?
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(&old_trigger))
            .collect();
        let new_sql = rewrite_table_sql(&create_sql, old, &field)?;

        let scratch = format!("_tmp__{table}_{}", rand::thread_rng().gen_range(10_000_000..100_000_000));
        let (from, to): (Vec<String>, Vec<String>) = columns
            .iter()
            .map(|c| {
                let target = if c.name.eq_ignore_ascii_case(old) { &field.name } else { &c.name };
                (quote_name(&c.name), quote_name(target))
            })
            .unzip();
        let t = quote_name(table);
        let s = quote_name(&scratch);
        let none = Params::new();

        debug!(table, scratch = %scratch, "rebuilding table");
        self.execute_with(&format!("CREATE TABLE {s} AS SELECT * FROM {t}"), &none)?;
        self.execute_with(&format!("DROP TABLE {t}"), &none)?;
        self.execute_with(&new_sql, &none)?;
        self.execute_with(
            &format!("INSERT INTO {t} ({}) SELECT {} FROM {s}", to.join(", "), from.join(", ")),
            &none,
        )?;
        self.execute_with(&format!("DROP TABLE {s}"), &none)?;
        for (name, sql) in indexes.iter().chain(&triggers) {
            debug!(object = %name, "restoring");
            let restored = render(&rename_column_refs(&tokenize(sql)?, old, &field.name));
            self.execute_with(&restored, &none)?;
        }

        let cache = self.type_cache();
        cache.remove(table, old)?;
        cache.set(table, &field.name, &field.mysql_type)?;
        if field.unique {
            self.add_index(
                table,
                &IndexDef {
                    name: field.name.clone(),
                    kind: IndexKind::Unique,
                    columns: vec![field.name.clone()],
                },
            )?;
        }
        if field.on_update_now {
            self.add_on_update_trigger(table, &field.name)?;
        }
        info!(table, from = old, to = %field.name, "rebuilt table");
        Ok(())
    }

    fn rename_column(&mut self, table: &str, old: &str, new: &str) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_name(table),
            quote_name(old),
            quote_name(new)
        );
        self.execute_with(&sql, &Params::new())?;
        let cache = self.type_cache();
        if let Some(mysql_type) = cache.get(table, old)? {
            cache.remove(table, old)?;
            cache.set(table, new, &mysql_type)?;
        }
        if self.drop_on_update_trigger(table, old)? {
            self.add_on_update_trigger(table, new)?;
        }
        Ok(())
    }

    fn rename_index(&mut self, table: &str, old: &str, new: &str) -> Result<()> {
        let index = schema::index_list(&self.engine, table)?
            .into_iter()
            .find(|i| {
                i.origin == "c"
                    && (i.name.eq_ignore_ascii_case(old)
                        || i.name.eq_ignore_ascii_case(&format!("{table}__{old}")))
            })
            .ok_or_else(|| TranslateError::Parse(format!("unknown index {old} on {table}")))?;
        let cached = self.type_cache().get(table, &index.name)?;
        self.execute_with(&format!("DROP INDEX {}", quote_name(&index.name)), &Params::new())?;
        self.type_cache().remove(table, &index.name)?;
        let kind = cached
            .as_deref()
            .and_then(IndexKind::from_mysql)
            .unwrap_or(if index.unique { IndexKind::Unique } else { IndexKind::Key });
        self.add_index(
            table,
            &IndexDef {
                name: new.to_string(),
                kind,
                columns: index.columns,
            },
        )
    }

    fn rename_table(&mut self, table: &mut String, new: &str) -> Result<()> {
        let old = table.clone();
        let sql = format!("ALTER TABLE {} RENAME TO {}", quote_name(&old), quote_name(new));
        self.execute_with(&sql, &Params::new())?;
        self.type_cache().rename_table(&old, new)?;

        // index and trigger names carry the table name
        for index in schema::index_list(&self.engine, new)? {
            let short = schema::mysql_index_name(&old, &index.name);
            if index.origin != "c" || short == index.name {
                continue;
            }
            let cached = self.type_cache().get(new, &index.name)?;
            self.execute_with(&format!("DROP INDEX {}", quote_name(&index.name)), &Params::new())?;
            self.type_cache().remove(new, &index.name)?;
            let kind = cached
                .as_deref()
                .and_then(IndexKind::from_mysql)
                .unwrap_or(if index.unique { IndexKind::Unique } else { IndexKind::Key });
            self.add_index(
                new,
                &IndexDef {
                    name: short,
                    kind,
                    columns: index.columns,
                },
            )?;
        }
        let prefix = format!("__{old}_");
        for (name, _) in schema::dependent_objects(&self.engine, new, "trigger")? {
            let column = name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix("_on_update__"))
                .map(str::to_string);
            if let Some(column) = column {
                self.execute_with(&format!("DROP TRIGGER {}", quote_name(&name)), &Params::new())?;
                self.add_on_update_trigger(new, &column)?;
            }
        }
        info!(from = %old, to = new, "renamed table");
        *table = new.to_string();
        self.session.table_name = Some(new.to_string());
        Ok(())
    }
}
