//! Statement builder: compiles option structs against a reflected
//! [`TableSchema`] into SQL text with numbered placeholders.
//!
//! Every identifier is double-quoted and every value is bound, so nothing
//! caller-supplied is spliced into the SQL except `LIMIT`/`OFFSET` integers.

use crate::error::DbError;
use crate::filter::{Filter, Operator};
use crate::query::{Aggregate, AggregateFunc, DeleteOptions, SelectOptions, UpdateOptions};
use crate::schema::{ColumnType, TableSchema};
use crate::value::Value;

/// A result column: its name and, when known, its logical type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    pub col_type: Option<ColumnType>,
}

/// A compiled statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    /// Result columns, empty for statements that return no rows.
    pub output: Vec<OutputColumn>,
}

impl Statement {
    pub fn output_names(&self) -> Vec<String> {
        self.output.iter().map(|c| c.name.clone()).collect()
    }
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ─────────────────────────────────────────────
// DDL
// ─────────────────────────────────────────────

/// `CREATE TABLE` for a validated schema.
///
/// A sole key column carries an inline `PRIMARY KEY` (with `AUTOINCREMENT`
/// when requested); composite keys become a table-level constraint.
pub fn create_table_sql(schema: &TableSchema) -> String {
    let keys = schema.primary_key();
    let single_key = keys.len() == 1;

    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|col| {
            let mut def = format!("{} {}", quote_ident(&col.name), col.col_type.to_sqlite_type());
            let rowid_alias = single_key && col.primary_key && col.col_type == ColumnType::Integer;
            if single_key && col.primary_key {
                def.push_str(" PRIMARY KEY");
                if col.autoincrement {
                    def.push_str(" AUTOINCREMENT");
                }
            }
            if !col.nullable && !rowid_alias {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    if keys.len() > 1 {
        let names: Vec<String> = keys.iter().map(|c| quote_ident(&c.name)).collect();
        defs.push(format!("PRIMARY KEY ({})", names.join(", ")));
    }

    format!("CREATE TABLE {} ({})", quote_ident(&schema.name), defs.join(", "))
}

pub fn drop_table_sql(name: &str) -> String {
    format!("DROP TABLE {}", quote_ident(name))
}

// ─────────────────────────────────────────────
// DML
// ─────────────────────────────────────────────

/// Compile a select.
pub fn select(schema: &TableSchema, opts: &SelectOptions) -> Result<Statement, DbError> {
    let grouped = opts.is_grouped();

    let plain: Vec<String> = match opts.columns.as_ref().filter(|c| !c.is_empty()) {
        Some(cols) => cols.clone(),
        None if grouped => opts.group_by.clone(),
        None => schema.columns.iter().map(|c| c.name.clone()).collect(),
    };

    let mut output = Vec::with_capacity(plain.len() + opts.aggregates.len());
    let mut select_list = Vec::with_capacity(output.capacity());
    for name in &plain {
        let col = schema.require_column(name)?;
        output.push(OutputColumn {
            name: name.clone(),
            col_type: Some(col.col_type),
        });
        select_list.push(quote_ident(name));
    }
    for name in &opts.group_by {
        schema.require_column(name)?;
    }
    for agg in &opts.aggregates {
        let col_type = aggregate_type(schema, agg)?;
        let label = agg.label();
        select_list.push(format!(
            "{}({}) AS {}",
            agg.func.as_str().to_ascii_uppercase(),
            quote_ident(&agg.column),
            quote_ident(&label)
        ));
        output.push(OutputColumn {
            name: label,
            col_type: Some(col_type),
        });
    }

    for (i, col) in output.iter().enumerate() {
        if output[..i].iter().any(|prev| prev.name == col.name) {
            return Err(DbError::Validation(format!(
                "duplicate result column '{}' in select on '{}'",
                col.name, schema.name
            )));
        }
    }

    let mut w = SqlWriter::new(schema);
    let mut sql = format!("SELECT {} FROM {}", select_list.join(", "), quote_ident(&schema.name));
    w.push_where(&mut sql, opts.filter.as_ref())?;

    if grouped {
        let mut keys: Vec<&str> = opts.group_by.iter().map(String::as_str).collect();
        for name in &plain {
            if !keys.contains(&name.as_str()) {
                keys.push(name);
            }
        }
        if !keys.is_empty() {
            let keys: Vec<String> = keys.into_iter().map(quote_ident).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&keys.join(", "));
        }
    }

    if !opts.order_by.is_empty() {
        let mut terms = Vec::with_capacity(opts.order_by.len());
        for entry in &opts.order_by {
            let is_label = opts.aggregates.iter().any(|a| a.label() == entry.column);
            if !is_label {
                schema.require_column(&entry.column)?;
            }
            terms.push(format!("{} {}", quote_ident(&entry.column), entry.direction.as_sql()));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    for (clause, value) in [("limit", opts.limit), ("offset", opts.offset)] {
        if value.is_some_and(|v| i64::try_from(v).is_err()) {
            return Err(DbError::Validation(format!(
                "{clause} on '{}' exceeds {}",
                schema.name,
                i64::MAX
            )));
        }
    }

    match (opts.limit, opts.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }

    Ok(Statement {
        sql,
        params: w.params,
        output,
    })
}

/// `INSERT` naming `columns` in order, one placeholder each.
pub fn insert_sql(schema: &TableSchema, columns: &[String]) -> Result<String, DbError> {
    if columns.is_empty() {
        return Ok(format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&schema.name)));
    }
    let mut names = Vec::with_capacity(columns.len());
    for name in columns {
        schema.require_column(name)?;
        names.push(quote_ident(name));
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&schema.name),
        names.join(", "),
        placeholders.join(", ")
    ))
}

/// Compile an update. Fails without a filter unless `all_rows` is set.
pub fn update(schema: &TableSchema, opts: &UpdateOptions) -> Result<Statement, DbError> {
    require_filter(schema, opts.filter.as_ref(), opts.all_rows, "update")?;
    if opts.values.is_empty() {
        return Err(DbError::Validation(format!(
            "update on '{}' needs at least one value",
            schema.name
        )));
    }

    let mut w = SqlWriter::new(schema);
    let mut assignments = Vec::with_capacity(opts.values.len());
    for (name, value) in opts.values.iter() {
        let col = schema.require_column(name)?;
        let bound = col.bind(&schema.name, value, false)?;
        assignments.push(format!("{} = {}", quote_ident(name), w.bind(bound)));
    }

    let mut sql = format!("UPDATE {} SET {}", quote_ident(&schema.name), assignments.join(", "));
    w.push_where(&mut sql, opts.filter.as_ref())?;
    Ok(Statement {
        sql,
        params: w.params,
        output: Vec::new(),
    })
}

/// Compile a delete. Fails without a filter unless `all_rows` is set.
pub fn delete(schema: &TableSchema, opts: &DeleteOptions) -> Result<Statement, DbError> {
    require_filter(schema, opts.filter.as_ref(), opts.all_rows, "delete")?;

    let mut w = SqlWriter::new(schema);
    let mut sql = format!("DELETE FROM {}", quote_ident(&schema.name));
    w.push_where(&mut sql, opts.filter.as_ref())?;
    Ok(Statement {
        sql,
        params: w.params,
        output: Vec::new(),
    })
}

fn require_filter(
    schema: &TableSchema,
    filter: Option<&Filter>,
    all_rows: bool,
    operation: &'static str,
) -> Result<(), DbError> {
    let has_filter = filter.is_some_and(|f| !f.is_empty());
    if has_filter || all_rows {
        Ok(())
    } else {
        Err(DbError::MissingFilterForMutation {
            table: schema.name.clone(),
            operation,
        })
    }
}

fn aggregate_type(schema: &TableSchema, agg: &Aggregate) -> Result<ColumnType, DbError> {
    let col = schema.require_column(&agg.column)?;
    match agg.func {
        AggregateFunc::Count => Ok(ColumnType::Integer),
        AggregateFunc::Sum | AggregateFunc::Avg if !col.col_type.is_numeric() => {
            Err(DbError::Validation(format!(
                "{} needs a numeric column, '{}' in '{}' is {}",
                agg.func, col.name, schema.name, col.col_type
            )))
        }
        AggregateFunc::Avg => Ok(ColumnType::Float),
        AggregateFunc::Sum | AggregateFunc::Min | AggregateFunc::Max => Ok(col.col_type),
    }
}

// ─────────────────────────────────────────────
// Filter compilation
// ─────────────────────────────────────────────

struct SqlWriter<'a> {
    schema: &'a TableSchema,
    params: Vec<Value>,
}

impl<'a> SqlWriter<'a> {
    fn new(schema: &'a TableSchema) -> Self {
        Self {
            schema,
            params: Vec::new(),
        }
    }

    /// Append a value and return its placeholder.
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn push_where(&mut self, sql: &mut String, filter: Option<&Filter>) -> Result<(), DbError> {
        if let Some(predicate) = filter.map(|f| self.predicate(f)).transpose()?.flatten() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        Ok(())
    }

    /// `None` for a filter that constrains nothing.
    fn predicate(&mut self, filter: &Filter) -> Result<Option<String>, DbError> {
        match filter {
            Filter::Compare { column, op, value } => self.compare(column, *op, value).map(Some),
            Filter::In { column, values } => {
                let col = self.schema.require_column(column)?;
                if values.is_empty() {
                    return Ok(Some("0 = 1".to_string()));
                }
                let mut slots = Vec::with_capacity(values.len());
                for value in values {
                    let bound = col.bind(&self.schema.name, value, true)?;
                    slots.push(self.bind(bound));
                }
                Ok(Some(format!("{} IN ({})", quote_ident(column), slots.join(", "))))
            }
            Filter::And(children) => self.group(children, " AND "),
            Filter::Or(children) => self.group(children, " OR "),
            Filter::Not(inner) => Ok(self.predicate(inner)?.map(|p| format!("NOT ({p})"))),
        }
    }

    fn group(&mut self, children: &[Filter], joiner: &str) -> Result<Option<String>, DbError> {
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            if let Some(p) = self.predicate(child)? {
                parts.push(p);
            }
        }
        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(format!("({})", parts.join(joiner))),
        })
    }

    fn compare(&mut self, column: &str, op: Operator, value: &Value) -> Result<String, DbError> {
        let col = self.schema.require_column(column)?;
        let ident = quote_ident(column);

        if value.is_null() {
            return match op {
                Operator::Eq => Ok(format!("{ident} IS NULL")),
                Operator::NotEq => Ok(format!("{ident} IS NOT NULL")),
                _ => Err(DbError::Validation(format!(
                    "operator {op} cannot compare '{column}' with NULL"
                ))),
            };
        }

        if op.is_pattern() {
            if col.col_type != ColumnType::Text {
                return Err(DbError::TypeMismatch {
                    table: self.schema.name.clone(),
                    column: column.to_string(),
                    expected: ColumnType::Text,
                    got: format!("{} column for {op}", col.col_type),
                });
            }
            if value.as_str().is_none() {
                return Err(DbError::TypeMismatch {
                    table: self.schema.name.clone(),
                    column: column.to_string(),
                    expected: ColumnType::Text,
                    got: value.type_name().to_string(),
                });
            }
            let slot = self.bind(value.clone());
            return Ok(match op {
                Operator::Like => format!("{ident} LIKE {slot}"),
                Operator::NotLike => format!("{ident} NOT LIKE {slot}"),
                Operator::ILike => format!("lower({ident}) LIKE lower({slot})"),
                Operator::NotILike => format!("lower({ident}) NOT LIKE lower({slot})"),
                Operator::Contains => format!("{ident} LIKE '%' || {slot} || '%'"),
                Operator::StartsWith => format!("{ident} LIKE {slot} || '%'"),
                _ => format!("{ident} LIKE '%' || {slot}"),
            });
        }

        let bound = col.bind(&self.schema.name, value, false)?;
        let slot = self.bind(bound);
        Ok(format!("{ident} {} {slot}", op.as_str()))
    }
}
