use std::path::Path;

use rusqlite::{params_from_iter, Connection};
use tabula_config::ConnectionSpec;
use tracing::{debug, info, instrument};

use crate::builder::{self, OutputColumn, Statement};
use crate::catalog::Catalog;
use crate::error::DbError;
use crate::query::{CreateOptions, DeleteOptions, SelectOptions, UpdateOptions};
use crate::records::{self, Records};
use crate::schema::TableSchema;
use crate::value::Value;

/// A single engine connection with table CRUD on top.
///
/// `Database` owns exactly one connection for its lifetime. It is `Send` but
/// not `Sync`; share it across threads behind a mutex if needed.
pub struct Database {
    conn: Connection,
    catalog: Catalog,
    spec: ConnectionSpec,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("spec", &self.spec).finish_non_exhaustive()
    }
}

impl Database {
    // ─────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────

    /// Open the database described by `spec`.
    ///
    /// Only the `sqlite` backend can be opened. An empty database name or
    /// `:memory:` gives a private in-memory database; anything else is a file
    /// path, opened in WAL mode.
    #[instrument(skip_all, fields(url = %spec))]
    pub fn connect(spec: ConnectionSpec) -> Result<Self, DbError> {
        let backend = spec.backend();
        if backend != "sqlite" {
            return Err(DbError::Connection(format!(
                "unsupported driver '{}': only sqlite can be opened",
                spec.driver
            )));
        }

        let path = spec.database.as_deref().unwrap_or("");
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| DbError::Connection(format!("cannot open '{path}': {e}")))?;

        let configured = conn
            .execute_batch("PRAGMA foreign_keys=ON; PRAGMA case_sensitive_like=ON;")
            .and_then(|()| {
                if path.is_empty() || path == ":memory:" {
                    return Ok(());
                }
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
                .map(|mode| debug!("journal_mode={}", mode))
            });
        configured.map_err(|e| DbError::Connection(format!("cannot configure '{path}': {e}")))?;

        debug!("Opened database {}", if path.is_empty() { ":memory:" } else { path });
        Ok(Self {
            conn,
            catalog: Catalog::new(),
            spec,
        })
    }

    /// Parse `url` and [`connect`](Self::connect).
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        Self::connect(ConnectionSpec::from_url(url)?)
    }

    /// Open (or create) a SQLite file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Self::connect(ConnectionSpec::sqlite(path.as_ref().to_string_lossy()))
    }

    /// A private in-memory database (useful for testing).
    pub fn open_memory() -> Result<Self, DbError> {
        Self::connect(ConnectionSpec::sqlite_memory())
    }

    /// The settings this database was opened with.
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    /// Close the connection, reporting any failure to do so.
    pub fn close(self) -> Result<(), DbError> {
        self.conn
            .close()
            .map_err(|(_, e)| DbError::Connection(format!("close failed: {e}")))
    }

    // ─────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────

    /// Whether a table called `name` exists. Names match case-insensitively.
    pub fn has_table(&self, name: &str) -> Result<bool, DbError> {
        self.catalog.has_table(&self.conn, name)
    }

    /// Names of all user tables, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, DbError> {
        self.catalog.list_tables(&self.conn)
    }

    /// The reflected schema of `name`, for inspection or for building
    /// filters against. Cached after the first call.
    #[instrument(skip_all, fields(table = %name))]
    pub fn table(&self, name: &str) -> Result<TableSchema, DbError> {
        self.catalog.reflect(&self.conn, name)
    }

    /// Create a table. With `opts.replace` an existing table of the same name
    /// is dropped first, in the same transaction.
    #[instrument(skip_all, fields(table = %schema.name))]
    pub fn create_table(&self, schema: &TableSchema, opts: CreateOptions) -> Result<(), DbError> {
        let tx = self.conn.unchecked_transaction()?;
        let result = self
            .catalog
            .create_table(&tx, schema, opts)
            .and_then(|()| tx.commit().map_err(DbError::from));
        if result.is_err() {
            self.catalog.invalidate(&schema.name);
        }
        result
    }

    /// Create a table typed from `records` and insert its rows, atomically.
    /// Returns the number of rows written.
    #[instrument(skip_all, fields(table = %name))]
    pub fn create_table_from_records(
        &self,
        name: &str,
        records: impl Into<Records>,
        opts: CreateOptions,
    ) -> Result<usize, DbError> {
        let records = records.into();
        let schema = records::infer_schema(name, &records)?;
        let rows = records::bind_rows(&schema, &records)?;

        let tx = self.conn.unchecked_transaction()?;
        let result = self
            .catalog
            .create_table(&tx, &schema, opts)
            .and_then(|()| write_rows(&tx, &schema, records.columns(), &rows))
            .and_then(|n| tx.commit().map(|()| n).map_err(DbError::from));
        if result.is_err() {
            self.catalog.invalidate(name);
        }
        result
    }

    /// Drop a table. Fails with `TableNotFound` if it does not exist.
    #[instrument(skip_all, fields(table = %name))]
    pub fn drop_table(&self, name: &str) -> Result<(), DbError> {
        self.catalog.drop_table(&self.conn, name)
    }

    // ─────────────────────────────────────────────
    // Rows
    // ─────────────────────────────────────────────

    /// Insert one or more rows. Every row is validated before anything is
    /// written, and all rows are written in one transaction.
    #[instrument(skip_all, fields(table = %table))]
    pub fn insert(&self, table: &str, rows: impl Into<Records>) -> Result<usize, DbError> {
        let records = rows.into();
        let schema = self.catalog.reflect(&self.conn, table)?;
        let bound = records::bind_rows(&schema, &records)?;

        let tx = self.conn.unchecked_transaction()?;
        let written = write_rows(&tx, &schema, records.columns(), &bound)?;
        tx.commit()?;
        Ok(written)
    }

    /// Compile `opts` against the table's schema and return the matching
    /// rows. Unknown columns and type mismatches fail before the engine runs.
    #[instrument(skip_all, fields(table = %table))]
    pub fn select(&self, table: &str, opts: &SelectOptions) -> Result<Records, DbError> {
        let schema = self.catalog.reflect(&self.conn, table)?;
        let stmt = builder::select(&schema, opts)?;
        if opts.limit == Some(0) {
            return Ok(Records::new(stmt.output_names()));
        }
        let records = self.run_query(&stmt)?;
        debug!("Selected {} rows from {}", records.len(), table);
        Ok(records)
    }

    /// Returns the number of rows changed.
    #[instrument(skip_all, fields(table = %table))]
    pub fn update(&self, table: &str, opts: &UpdateOptions) -> Result<usize, DbError> {
        let schema = self.catalog.reflect(&self.conn, table)?;
        let stmt = builder::update(&schema, opts)?;
        let changed = self.run_execute(&stmt)?;
        debug!("Updated {} rows in {}", changed, table);
        Ok(changed)
    }

    /// Returns the number of rows deleted.
    #[instrument(skip_all, fields(table = %table))]
    pub fn delete(&self, table: &str, opts: &DeleteOptions) -> Result<usize, DbError> {
        let schema = self.catalog.reflect(&self.conn, table)?;
        let stmt = builder::delete(&schema, opts)?;
        let deleted = self.run_execute(&stmt)?;
        debug!("Deleted {} rows from {}", deleted, table);
        Ok(deleted)
    }

    /// Delete rows by primary-key value. The table must have a single-column
    /// primary key. An empty `ids` deletes nothing.
    #[instrument(skip_all, fields(table = %table))]
    pub fn delete_ids<V: Into<Value>>(
        &self,
        table: &str,
        ids: impl IntoIterator<Item = V>,
    ) -> Result<usize, DbError> {
        let schema = self.catalog.reflect(&self.conn, table)?;
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        let filter = records::ids_filter(&schema, ids)?;
        let stmt = builder::delete(&schema, &DeleteOptions::new().filter(filter))?;
        let deleted = self.run_execute(&stmt)?;
        debug!("Deleted {} rows by id from {}", deleted, table);
        Ok(deleted)
    }

    // ─────────────────────────────────────────────
    // Raw SQL
    // ─────────────────────────────────────────────

    /// Run a statement that returns no rows. It may alter any table, so the
    /// schema cache is emptied afterwards.
    pub fn execute_sql(&self, sql: &str, params: &[Value]) -> Result<usize, DbError> {
        debug!("Raw SQL: {}", sql);
        let result = self.conn.execute(sql, params_from_iter(params.iter()));
        self.catalog.clear();
        Ok(result?)
    }

    /// Run a query; cells decode by storage class.
    pub fn query_sql(&self, sql: &str, params: &[Value]) -> Result<Records, DbError> {
        debug!("Raw query: {}", sql);
        let output: Vec<OutputColumn> = {
            let stmt = self.conn.prepare(sql)?;
            stmt.column_names()
                .into_iter()
                .map(|name| OutputColumn {
                    name: name.to_string(),
                    col_type: None,
                })
                .collect()
        };
        self.run_query(&Statement {
            sql: sql.to_string(),
            params: params.to_vec(),
            output,
        })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn run_query(&self, stmt: &Statement) -> Result<Records, DbError> {
        debug!("SELECT SQL: {}", stmt.sql);
        let mut prepared = self.conn.prepare(&stmt.sql)?;
        let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;

        let mut records = Records::new(stmt.output_names());
        while let Some(row) = rows.next()? {
            records.push_values(records::decode_row(row, &stmt.output)?);
        }
        Ok(records)
    }

    fn run_execute(&self, stmt: &Statement) -> Result<usize, DbError> {
        debug!("SQL: {}", stmt.sql);
        Ok(self.conn.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?)
    }

    #[cfg(test)]
    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Insert pre-bound rows with one prepared statement.
fn write_rows(
    conn: &Connection,
    schema: &TableSchema,
    columns: &[String],
    rows: &[Vec<Value>],
) -> Result<usize, DbError> {
    let sql = builder::insert_sql(schema, columns)?;
    debug!("INSERT SQL: {}", sql);
    let mut stmt = conn.prepare(&sql)?;
    for row in rows {
        stmt.execute(params_from_iter(row.iter()))?;
    }
    info!(table = %schema.name, rows = rows.len(), "inserted rows");
    Ok(rows.len())
}
