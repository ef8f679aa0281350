use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::builder::{create_table_sql, drop_table_sql};
use crate::error::DbError;
use crate::query::CreateOptions;
use crate::schema::{ColumnDef, ColumnType, TableSchema};

/// Table inspection and DDL with a per-instance cache of reflected schemas.
///
/// The catalog never owns the connection; callers pass the connection (or an
/// open transaction) for every call. Entries are dropped on create and drop
/// so the cache cannot outlive the table it describes.
///
/// Table names match case-insensitively, the way the engine resolves them.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    cache: Mutex<HashMap<String, TableSchema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a table called `name` exists, ignoring ASCII case.
    pub fn has_table(&self, conn: &Connection, name: &str) -> Result<bool, DbError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// User tables sorted by name; engine tables (`sqlite_*`) are skipped.
    pub fn list_tables(&self, conn: &Connection) -> Result<Vec<String>, DbError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Column metadata for `name`, loaded from the engine on first access.
    ///
    /// The returned schema carries the table's stored name, which may differ
    /// in case from `name`. Fails with `TableNotFound` if there is no table.
    pub fn reflect(&self, conn: &Connection, name: &str) -> Result<TableSchema, DbError> {
        let cached = self.cache.lock().get(&cache_key(name)).cloned();
        if let Some(schema) = cached {
            return Ok(schema);
        }

        let found: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT name, sql FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((stored_name, create_sql)) = found else {
            return Err(DbError::TableNotFound(name.to_string()));
        };
        let autoincrement = create_sql.as_deref().is_some_and(declares_autoincrement);

        let mut stmt = conn.prepare(
            "SELECT \"name\", \"type\", \"notnull\", \"pk\" FROM pragma_table_info(?1) ORDER BY \"cid\"",
        )?;
        let raw = stmt
            .query_map(params![stored_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let key_count = raw.iter().filter(|(_, _, _, pk)| *pk > 0).count();
        let columns = raw
            .into_iter()
            .map(|(col_name, declared, notnull, pk)| {
                let col_type = ColumnType::from_declared(&declared);
                let primary_key = pk > 0;
                ColumnDef {
                    name: col_name,
                    col_type,
                    nullable: notnull == 0 && !primary_key,
                    primary_key,
                    autoincrement: autoincrement
                        && primary_key
                        && key_count == 1
                        && col_type == ColumnType::Integer,
                }
            })
            .collect();

        let schema = TableSchema::new(stored_name, columns);
        debug!(table = %schema.name, columns = schema.columns.len(), "reflected table");
        self.cache.lock().insert(cache_key(name), schema.clone());
        Ok(schema)
    }

    /// Create `schema`, dropping an existing table first when
    /// `opts.replace` is set. Run inside a transaction so a replace is atomic.
    pub fn create_table(
        &self,
        conn: &Connection,
        schema: &TableSchema,
        opts: CreateOptions,
    ) -> Result<(), DbError> {
        schema.validate()?;
        self.invalidate(&schema.name);

        if self.has_table(conn, &schema.name)? {
            if !opts.replace {
                return Err(DbError::TableExists(schema.name.clone()));
            }
            conn.execute(&drop_table_sql(&schema.name), [])?;
            debug!(table = %schema.name, "dropped table for replace");
        }

        let sql = create_table_sql(schema);
        debug!("CREATE TABLE SQL: {}", sql);
        conn.execute(&sql, [])?;
        info!(table = %schema.name, columns = schema.columns.len(), "created table");
        Ok(())
    }

    /// Drop `name`. Fails with `TableNotFound` if there is no such table.
    pub fn drop_table(&self, conn: &Connection, name: &str) -> Result<(), DbError> {
        if !self.has_table(conn, name)? {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        self.invalidate(name);
        conn.execute(&drop_table_sql(name), [])?;
        info!(table = %name, "dropped table");
        Ok(())
    }

    /// Forget the cached schema of `name`, if any.
    pub fn invalidate(&self, name: &str) {
        self.cache.lock().remove(&cache_key(name));
    }

    /// Forget every cached schema.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    #[cfg(test)]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.lock().contains_key(&cache_key(name))
    }
}

fn cache_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Whether a `CREATE TABLE` statement gives a column the `AUTOINCREMENT`
/// keyword. The keyword can only follow `PRIMARY KEY [ASC|DESC]
/// [ON CONFLICT <action>]`, so a match must come right after one of those.
fn declares_autoincrement(sql: &str) -> bool {
    bare_words(sql).windows(2).any(|pair| {
        pair[1] == "AUTOINCREMENT"
            && matches!(
                pair[0].as_str(),
                "KEY" | "ASC" | "DESC" | "ROLLBACK" | "ABORT" | "FAIL" | "IGNORE" | "REPLACE"
            )
    })
}

/// Unquoted words of a statement, upper-cased. Quoted names, string literals
/// and comments are skipped.
fn bare_words(sql: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => skip_quoted(&mut chars, c),
            '[' => skip_quoted(&mut chars, ']'),
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = c.to_ascii_uppercase().to_string();
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '$') {
                        break;
                    }
                    word.push(next.to_ascii_uppercase());
                    chars.next();
                }
                words.push(word);
            }
            _ => {}
        }
    }
    words
}

/// Consume up to the closing delimiter. A doubled quote is an escaped quote.
fn skip_quoted(chars: &mut Peekable<Chars<'_>>, close: char) {
    while let Some(c) = chars.next() {
        if c == close {
            if close != ']' && chars.peek() == Some(&close) {
                chars.next();
                continue;
            }
            return;
        }
    }
}
