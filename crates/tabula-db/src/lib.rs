//! # tabula-db
//!
//! Table CRUD, schema reflection and a declarative query builder over a
//! single SQLite connection.
//!
//! Callers name a table and describe what they want with option structs
//! ([`SelectOptions`], [`UpdateOptions`], [`DeleteOptions`]). The table's
//! schema is reflected from the engine and cached, every value is checked
//! against its column type, and one parameterised statement is run.
//!
//! ## Quick start
//!
//! ```no_run
//! use tabula_db::{
//!     AggregateFunc, ColumnDef, ColumnType, CreateOptions, Database, Filter, Row,
//!     SelectOptions, SortDirection, TableSchema,
//! };
//!
//! let db = Database::open_memory().unwrap();
//!
//! let schema = TableSchema::new(
//!     "sales",
//!     vec![
//!         ColumnDef::new("id", ColumnType::Integer).autoincrement(),
//!         ColumnDef::new("region", ColumnType::Text).not_null(),
//!         ColumnDef::new("amount", ColumnType::Float),
//!     ],
//! );
//! db.create_table(&schema, CreateOptions::default()).unwrap();
//!
//! db.insert("sales", vec![
//!     Row::new().with("region", "north").with("amount", 12.5),
//!     Row::new().with("region", "south").with("amount", 3),
//! ]).unwrap();
//!
//! let totals = db
//!     .select(
//!         "sales",
//!         &SelectOptions::new()
//!             .filter(Filter::gt("amount", 1))
//!             .group_by("region")
//!             .aggregate("amount", AggregateFunc::Sum)
//!             .order_by("amount_sum", SortDirection::Desc),
//!     )
//!     .unwrap();
//! println!("{}", totals.to_json());
//! ```

pub mod builder;
mod catalog;
pub mod database;
pub mod error;
pub mod filter;
pub mod query;
pub mod records;
pub mod schema;
pub mod value;

// Re-exports for convenience.
pub use builder::{OutputColumn, Statement};
pub use database::Database;
pub use error::{DbError, ErrorKind};
pub use filter::{Boolean, Filter, Operator};
pub use query::{
    Aggregate, AggregateFunc, CreateOptions, DeleteOptions, OrderBy, SelectOptions, SortDirection,
    UpdateOptions,
};
pub use records::{Records, Row};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use tabula_config::{get_database_url, ConnectionSpec, DatabaseEnv};
pub use value::Value;
