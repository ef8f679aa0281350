//! Integration tests for tabula-db.
//!
//! These tests run against on-disk SQLite files in temp directories and go
//! through the public API only, including env-file based connection setup.

use tabula_config::EnvKey;
use tabula_db::{
    get_database_url, AggregateFunc, ColumnDef, ColumnType, ConnectionSpec, CreateOptions,
    Database, DatabaseEnv, DeleteOptions, ErrorKind, Filter, Records, Row, SelectOptions,
    SortDirection, TableSchema, UpdateOptions, Value,
};

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

fn open_temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let db = Database::open(dir.path().join("test.db")).unwrap();
    (db, dir)
}

fn people_schema() -> TableSchema {
    TableSchema::new(
        "people",
        vec![
            ColumnDef::new("id", ColumnType::Integer).autoincrement(),
            ColumnDef::new("name", ColumnType::Text).not_null(),
            ColumnDef::new("team", ColumnType::Text),
            ColumnDef::new("age", ColumnType::Integer),
        ],
    )
}

fn person(name: &str, team: &str, age: i64) -> Row {
    Row::new().with("name", name).with("team", team).with("age", age)
}

fn seed_people(db: &Database) {
    db.create_table(&people_schema(), CreateOptions::default()).unwrap();
    db.insert(
        "people",
        vec![
            person("ada", "red", 36),
            person("bo", "blue", 22),
            person("cy", "red", 41),
            person("di", "blue", 29),
            person("ed", "green", 50),
        ],
    )
    .unwrap();
}

fn row_count(db: &Database) -> usize {
    db.select("people", &SelectOptions::default()).unwrap().len()
}

// ─────────────────────────────────────────────
// Test 1: Lifecycle on a file database
// ─────────────────────────────────────────────

#[test]
fn test_lifecycle() {
    let (db, _dir) = open_temp_db();

    db.create_table(&people_schema(), CreateOptions::default()).unwrap();
    assert!(db.has_table("people").unwrap());

    db.insert("people", person("ada", "red", 36)).unwrap();
    assert_eq!(row_count(&db), 1);

    db.drop_table("people").unwrap();
    assert!(!db.has_table("people").unwrap());
    assert_eq!(
        db.select("people", &SelectOptions::default()).unwrap_err().kind(),
        ErrorKind::Schema
    );
}

// ─────────────────────────────────────────────
// Test 2: Bulk insert is all-or-nothing
// ─────────────────────────────────────────────

#[test]
fn test_bulk_insert_atomic() {
    let (db, _dir) = open_temp_db();
    seed_people(&db);

    let mut batch: Vec<Row> = (0..50).map(|i| person(&format!("p{i}"), "grey", i)).collect();
    batch.push(Row::new().with("name", "late").with("shoe_size", 44));

    let err = db.insert("people", batch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(row_count(&db), 5);
}

// ─────────────────────────────────────────────
// Test 3: Grouped report with filter, order and paging
// ─────────────────────────────────────────────

#[test]
fn test_grouped_report() {
    let (db, _dir) = open_temp_db();
    seed_people(&db);

    let report = db
        .select(
            "people",
            &SelectOptions::new()
                .filter(Filter::gte("age", 25))
                .group_by("team")
                .aggregate("age", AggregateFunc::Avg)
                .aggregate("name", AggregateFunc::Count)
                .order_by("name_count", SortDirection::Desc)
                .order_by("team", SortDirection::Asc),
        )
        .unwrap();

    assert_eq!(report.columns(), ["team", "age_avg", "name_count"]);
    assert_eq!(
        report.to_json(),
        serde_json::json!([
            {"team": "red", "age_avg": 38.5, "name_count": 2},
            {"team": "blue", "age_avg": 29.0, "name_count": 1},
            {"team": "green", "age_avg": 50.0, "name_count": 1},
        ])
    );

    let second_page = db
        .select(
            "people",
            &SelectOptions::new()
                .columns(["name"])
                .order_by("age", SortDirection::Asc)
                .limit(2)
                .offset(2),
        )
        .unwrap();
    let names: Vec<Row> = second_page.into_rows();
    assert_eq!(names, vec![Row::new().with("name", "ada"), Row::new().with("name", "cy")]);
}

// ─────────────────────────────────────────────
// Test 4: Filter combinations parsed from text
// ─────────────────────────────────────────────

#[test]
fn test_parsed_filters() {
    let (db, _dir) = open_temp_db();
    seed_people(&db);

    let clauses = vec![
        Filter::parse("team", "=", "red").unwrap(),
        Filter::parse("age", ">", 45).unwrap(),
    ];
    let boolean = "or".parse().unwrap();
    let records = db
        .select(
            "people",
            &SelectOptions::new()
                .columns(["name"])
                .filter(Filter::combine(clauses, boolean))
                .order_by("name", SortDirection::Asc),
        )
        .unwrap();
    let names: Vec<&str> = records
        .column("name")
        .unwrap()
        .into_iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(names, vec!["ada", "cy", "ed"]);

    assert_eq!(Filter::parse("age", "~", 1).unwrap_err().kind(), ErrorKind::Validation);
}

// ─────────────────────────────────────────────
// Test 5: Mutations need a filter
// ─────────────────────────────────────────────

#[test]
fn test_mutations_need_filter() {
    let (db, _dir) = open_temp_db();
    seed_people(&db);

    let retire = UpdateOptions::new(Row::new().with("team", "retired"));
    assert_eq!(
        db.update("people", &retire).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(db.delete("people", &DeleteOptions::new()).unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(row_count(&db), 5);

    let changed = db
        .update("people", &retire.filter(Filter::gte("age", 40)))
        .unwrap();
    assert_eq!(changed, 2);

    let removed = db
        .delete("people", &DeleteOptions::new().filter(Filter::eq("team", "retired")))
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(row_count(&db), 3);

    assert_eq!(db.delete_ids("people", [2, 4, 99]).unwrap(), 2);
    assert_eq!(row_count(&db), 1);
}

// ─────────────────────────────────────────────
// Test 6: Tables created from data
// ─────────────────────────────────────────────

#[test]
fn test_create_from_json() {
    let (db, _dir) = open_temp_db();
    let data = Records::from_json_str(
        r#"{"id": [1, 2, 3], "column_one": ["a", "b", "c"], "column_two": [2, 4, 6]}"#,
    )
    .unwrap();

    db.create_table_from_records("test_table", data, CreateOptions::replace())
        .unwrap();
    let sums = db
        .select(
            "test_table",
            &SelectOptions::new().aggregate("column_two", AggregateFunc::Sum),
        )
        .unwrap();
    assert_eq!(sums.get(0, "column_two_sum"), Some(&Value::Integer(12)));
}

// ─────────────────────────────────────────────
// Test 7: Connection settings from an env file
// ─────────────────────────────────────────────

#[test]
fn test_connect_from_env_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("from_env.db");
    let scratch = |dir: &tempfile::TempDir| {
        DatabaseEnv::new()
            .with_env_file(dir.path().join(".env"))
            .with_mapping(EnvKey::Driver, "TABULA_IT_DRIVER")
            .with_mapping(EnvKey::User, "TABULA_IT_USER")
            .with_mapping(EnvKey::Password, "TABULA_IT_PASSWORD")
            .with_mapping(EnvKey::Host, "TABULA_IT_HOST")
            .with_mapping(EnvKey::Port, "TABULA_IT_PORT")
            .with_mapping(EnvKey::Database, "TABULA_IT_NAME")
    };

    let mut env = scratch(&dir);
    env.set(EnvKey::Driver, "sqlite");
    env.set(EnvKey::Database, db_path.display().to_string());
    env.save().unwrap();

    let mut loaded = scratch(&dir);
    assert_eq!(loaded.load().unwrap(), 2);

    let params = ConnectionSpec {
        user: None,
        password: None,
        host: None,
        port: None,
        ..ConnectionSpec::default()
    };
    let url = get_database_url(&params, Some(&loaded)).unwrap();
    assert_eq!(url, format!("sqlite:///{}", db_path.display()));

    let db = Database::from_url(&url).unwrap();
    seed_people(&db);
    db.close().unwrap();

    let reopened = Database::open(&db_path).unwrap();
    assert_eq!(row_count(&reopened), 5);
}

// ─────────────────────────────────────────────
// Test 8: Other drivers are configured but not opened
// ─────────────────────────────────────────────

#[test]
fn test_unsupported_driver_url() {
    let err = Database::from_url("mysql://root:pw@localhost/app").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!err.to_string().contains("pw"));
}
