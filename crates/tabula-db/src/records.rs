//! Tabular data crossing the API boundary, and its conversion to and from
//! engine rows.

use std::collections::HashMap;

use crate::builder::OutputColumn;
use crate::error::DbError;
use crate::filter::Filter;
use crate::schema::{ColumnDef, ColumnType, TableSchema};
use crate::value::Value;

/// An ordered mapping of column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a cell, replacing any existing value for `column` in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// The value of `column`, if the row has one.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, v)| (name.as_str(), v))
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// The row as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .cells
            .iter()
            .map(|(name, v)| (name.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

/// Rectangular tabular data: named columns and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Records {
    /// No rows, with the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Columns are the union of the rows' columns in first-seen order;
    /// cells a row lacks are `Null`.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut records = Records::default();
        for row in rows {
            records.push_row(row);
        }
        records
    }

    /// Column-major construction. Every column must have the same length.
    pub fn from_columns<S: Into<String>>(
        data: impl IntoIterator<Item = (S, Vec<Value>)>,
    ) -> Result<Self, DbError> {
        let mut columns = Vec::new();
        let mut values: Vec<Vec<Value>> = Vec::new();
        for (name, col) in data {
            let name = name.into();
            if columns.contains(&name) {
                return Err(DbError::SerializationError(format!("duplicate column '{name}'")));
            }
            if let Some(first) = values.first() {
                if first.len() != col.len() {
                    return Err(DbError::SerializationError(format!(
                        "column '{name}' has {} values, expected {}",
                        col.len(),
                        first.len()
                    )));
                }
            }
            columns.push(name);
            values.push(col);
        }

        let height = values.first().map_or(0, Vec::len);
        let mut iters: Vec<_> = values.into_iter().map(Vec::into_iter).collect();
        let mut rows = Vec::with_capacity(height);
        for _ in 0..height {
            rows.push(iters.iter_mut().filter_map(Iterator::next).collect());
        }
        Ok(Self { columns, rows })
    }

    /// Accepts an array of objects (row-major) or an object of equal-length
    /// arrays (column-major). Cells must be JSON scalars.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, DbError> {
        match json {
            serde_json::Value::Array(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let obj = item.as_object().ok_or_else(|| {
                        DbError::SerializationError(format!("row {i} is not a JSON object"))
                    })?;
                    let mut row = Row::new();
                    for (key, cell) in obj {
                        row.set(key.clone(), json_cell(key, cell)?);
                    }
                    rows.push(row);
                }
                Ok(Self::from_rows(rows))
            }
            serde_json::Value::Object(obj) => {
                let mut data = Vec::with_capacity(obj.len());
                for (key, col) in obj {
                    let cells = col.as_array().ok_or_else(|| {
                        DbError::SerializationError(format!("column '{key}' is not a JSON array"))
                    })?;
                    let values = cells
                        .iter()
                        .map(|cell| json_cell(key, cell))
                        .collect::<Result<Vec<_>, _>>()?;
                    data.push((key.clone(), values));
                }
                Self::from_columns(data)
            }
            _ => Err(DbError::SerializationError(
                "expected a JSON array of objects or an object of arrays".into(),
            )),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, DbError> {
        let json: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json(&json)
    }

    /// Array of row objects.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.iter().map(|row| row.to_json()).collect())
    }

    /// Append a row. Columns not seen before are added, `Null` in earlier rows.
    pub fn push_row(&mut self, row: Row) {
        let mut values = vec![Value::Null; self.columns.len()];
        for (name, value) in row {
            match self.column_index(&name) {
                Some(i) => values[i] = value,
                None => {
                    self.columns.push(name);
                    for existing in &mut self.rows {
                        existing.push(Value::Null);
                    }
                    values.push(value);
                }
            }
        }
        self.rows.push(values);
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` among the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// A copy of row `index`, or `None` past the end.
    pub fn row(&self, index: usize) -> Option<Row> {
        self.rows.get(index).map(|values| self.make_row(values))
    }

    pub fn iter(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().map(|values| self.make_row(values))
    }

    pub fn into_rows(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| Row {
                cells: columns.iter().cloned().zip(values).collect(),
            })
            .collect()
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[i]).collect())
    }

    /// One cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let i = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[i])
    }

    /// Raw row values in column order.
    pub fn values(&self) -> &[Vec<Value>] {
        &self.rows
    }

    fn make_row(&self, values: &[Value]) -> Row {
        Row {
            cells: self.columns.iter().cloned().zip(values.iter().cloned()).collect(),
        }
    }

    pub(crate) fn push_values(&mut self, values: Vec<Value>) {
        self.rows.push(values);
    }
}

impl From<Row> for Records {
    fn from(row: Row) -> Self {
        Records::from_rows([row])
    }
}

impl From<Vec<Row>> for Records {
    fn from(rows: Vec<Row>) -> Self {
        Records::from_rows(rows)
    }
}

fn json_cell(column: &str, cell: &serde_json::Value) -> Result<Value, DbError> {
    Value::from_json(cell).ok_or_else(|| {
        DbError::SerializationError(format!("column '{column}' holds a non-scalar JSON value"))
    })
}

// -----------------------------------------------------------------------
// Engine marshalling
// -----------------------------------------------------------------------

/// Check every cell against `schema` and return the coerced rows. Nothing is
/// returned unless all rows pass, so callers can write atomically.
///
/// Columns absent from `records` are written as NULL, so they must be
/// nullable or the table's sole integer key.
pub(crate) fn bind_rows(schema: &TableSchema, records: &Records) -> Result<Vec<Vec<Value>>, DbError> {
    let engine_key = schema.primary_key().len() == 1;
    let defs: Vec<&ColumnDef> = records
        .columns()
        .iter()
        .map(|name| schema.require_column(name))
        .collect::<Result<_, _>>()?;

    if !records.is_empty() {
        for col in &schema.columns {
            if records.column_index(&col.name).is_none() {
                col.bind(&schema.name, &Value::Null, engine_key)?;
            }
        }
    }

    records
        .values()
        .iter()
        .map(|row| {
            defs.iter()
                .zip(row)
                .map(|(def, value)| def.bind(&schema.name, value, engine_key))
                .collect()
        })
        .collect()
}

/// Decode one engine row using the output column hints.
pub(crate) fn decode_row(row: &rusqlite::Row<'_>, output: &[OutputColumn]) -> Result<Vec<Value>, DbError> {
    output
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let cell = row.get_ref(i)?;
            Value::from_sql_ref(cell, col.col_type).map_err(|reason| DbError::Decode {
                column: col.name.clone(),
                reason,
            })
        })
        .collect()
}

fn value_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Null => None,
        Value::Integer(_) => Some(ColumnType::Integer),
        Value::Float(_) => Some(ColumnType::Float),
        Value::Text(_) => Some(ColumnType::Text),
        Value::Boolean(_) => Some(ColumnType::Boolean),
        Value::Timestamp(_) => Some(ColumnType::Timestamp),
    }
}

/// One nullable column per record column, typed from the data. Integer and
/// float mixes widen to float; all-null columns become text.
pub(crate) fn infer_schema(name: &str, records: &Records) -> Result<TableSchema, DbError> {
    let mut inferred: HashMap<&str, ColumnType> = HashMap::new();
    for (i, column) in records.columns().iter().enumerate() {
        for row in records.values() {
            let Some(found) = value_type(&row[i]) else {
                continue;
            };
            let merged = match inferred.get(column.as_str()) {
                None => found,
                Some(&seen) if seen == found => seen,
                Some(&seen) if seen.is_numeric() && found.is_numeric() => ColumnType::Float,
                Some(&seen) => {
                    return Err(DbError::TypeMismatch {
                        table: name.to_string(),
                        column: column.clone(),
                        expected: seen,
                        got: row[i].type_name().to_string(),
                    })
                }
            };
            inferred.insert(column, merged);
        }
    }

    let columns = records
        .columns()
        .iter()
        .map(|c| {
            let col_type = inferred.get(c.as_str()).copied().unwrap_or(ColumnType::Text);
            ColumnDef::new(c.clone(), col_type)
        })
        .collect();
    Ok(TableSchema::new(name, columns))
}

/// `pk IN (ids)` for a table with a single-column primary key.
pub(crate) fn ids_filter(schema: &TableSchema, ids: Vec<Value>) -> Result<Filter, DbError> {
    match schema.primary_key().as_slice() {
        [key] => Ok(Filter::In {
            column: key.name.clone(),
            values: ids,
        }),
        keys => Err(DbError::InvalidSchema(format!(
            "deleting by id needs a single-column primary key, '{}' has {}",
            schema.name,
            keys.len()
        ))),
    }
}
