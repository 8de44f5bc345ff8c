use ezdb_query::arrow::array::{Int64Array, StringArray};
use ezdb_query::arrow::datatypes::{DataType, Field, Schema};
use ezdb_query::arrow::record_batch::RecordBatch;
use ezdb_query::{
    sql, Connection, Query, QueryError, Result, SessionConfig, StoragePath, Table,
};
use ezdb_query_duckdb::{DuckDbEngine, DuckDbSession};
use serde_json::json;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session() -> DuckDbSession {
    init_tracing();
    DuckDbEngine::session(SessionConfig::new())
}

fn users_batch(ids: Vec<i64>, names: Vec<&str>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}

fn users() -> Table {
    Table::from_batch(users_batch(vec![1, 2, 3], vec!["ann", "bob", "cy"]))
}

fn single_value(session: &DuckDbSession, query: &Query, column: &str) -> serde_json::Value {
    let result = session.query(query).unwrap().expect("query returns rows");
    let rows = result.to_rows().unwrap();
    assert_eq!(rows.len(), 1, "expected exactly one row");
    rows[0][column].clone()
}

#[test]
fn test_scalar_bindings() {
    let session = session();
    let query = sql!("SELECT $a + $b AS total", a = 1, b = 2).unwrap();
    assert_eq!(single_value(&session, &query, "total"), json!(3));
}

#[test]
fn test_text_binding_round_trips_through_engine() {
    let session = session();
    let tricky = r"O'Brien said 'hi' \n $other";
    let query = sql!("SELECT $name AS name", name = tricky).unwrap();
    assert_eq!(single_value(&session, &query, "name"), json!(tricky));
}

#[test]
fn test_bool_null_and_float_bindings() {
    let session = session();
    let query = sql!(
        "SELECT $t AS t, $n IS NULL AS is_null, $f * 2 = 5.0 AS doubled, isnan($nan) AS nan",
        t = true,
        n = None::<i64>,
        f = 2.5,
        nan = f64::NAN,
    )
    .unwrap();

    let result = session.query(&query).unwrap().unwrap();
    let rows = result.to_rows().unwrap();
    assert_eq!(rows[0]["t"], json!(true));
    assert_eq!(rows[0]["is_null"], json!(true));
    assert_eq!(rows[0]["doubled"], json!(true));
    assert_eq!(rows[0]["nan"], json!(true));
}

#[test]
fn test_query_registered_table() {
    let session = session();
    let query = sql!(
        "SELECT name FROM $users WHERE id > $min ORDER BY id",
        users = users(),
        min = 1,
    )
    .unwrap();

    let result = session.query(&query).unwrap().unwrap();
    assert_eq!(result.column_names(), vec!["name"]);
    let names: Vec<_> = result
        .to_rows()
        .unwrap()
        .into_iter()
        .map(|row| row["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("bob"), json!("cy")]);
}

#[test]
fn test_nested_queries_with_multiple_tables() {
    let session = session();
    let people = users();
    let orders = Table::from_batch(users_batch(vec![1, 1, 3], vec!["book", "pen", "cup"]));

    let buyers = sql!(
        "SELECT DISTINCT p.name FROM $people p JOIN $orders o USING (id)",
        people = &people,
        orders = &orders,
    )
    .unwrap();
    let query = sql!(
        "SELECT count(*) AS n FROM ($buyers) AS b WHERE b.name IN (SELECT name FROM $people)",
        buyers = buyers,
        people = &people,
    )
    .unwrap();

    assert_eq!(query.collect_tables().len(), 2);
    assert_eq!(single_value(&session, &query, "n"), json!(2));
}

#[test]
fn test_table_with_several_batches() {
    let session = session();
    let first = users_batch(vec![1, 2], vec!["a", "b"]);
    let schema = first.schema();
    let table = Table::try_new(
        schema,
        vec![first, users_batch(vec![3, 4], vec!["c", "d"])],
    )
    .unwrap();

    let query = sql!("SELECT count(*) AS n, sum(id) AS s FROM $t", t = table).unwrap();
    let result = session.query(&query).unwrap().unwrap();
    let rows = result.to_rows().unwrap();
    assert_eq!(rows[0]["n"], json!(4));
}

#[test]
fn test_empty_table_registers_schema() {
    let session = session();
    let schema = users_batch(vec![], vec![]).schema();
    let query = sql!("SELECT * FROM $t", t = Table::empty(schema)).unwrap();

    let result = session.query(&query).unwrap().unwrap();
    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["id", "name"]);
}

#[test]
fn test_result_can_feed_another_query() {
    let session = session();
    let first = sql!("SELECT id * 10 AS id FROM $t", t = users()).unwrap();
    let table = session.query(&first).unwrap().unwrap().into_table().unwrap();

    let second = sql!("SELECT max(id) AS m FROM $t", t = table).unwrap();
    assert_eq!(single_value(&session, &second, "m"), json!(30));
}

#[test]
fn test_statement_without_result_set_is_none() {
    let session = session();
    assert!(session
        .execute("CREATE TABLE t (x INTEGER)")
        .unwrap()
        .is_none());
}

#[test]
fn test_empty_result_set_is_some() {
    let session = session();
    let result = session
        .execute("SELECT 1 AS x WHERE false")
        .unwrap()
        .expect("a result set with no rows");
    assert!(result.is_empty());
    assert_eq!(result.column_names(), vec!["x"]);
}

#[test]
fn test_returning_clause_yields_rows() {
    let session = session();
    let mut conn = session.connect().unwrap();
    conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

    let inserted = conn
        .execute("INSERT INTO t VALUES (1), (2) RETURNING x")
        .unwrap()
        .expect("RETURNING produces a result set");
    assert_eq!(inserted.row_count(), 2);
    assert_eq!(inserted.column_names(), vec!["x"]);

    let updated = conn
        .execute("UPDATE t SET x = x * 10 RETURNING x")
        .unwrap()
        .unwrap();
    assert_eq!(updated.row_count(), 2);

    let deleted = conn
        .execute("DELETE FROM t WHERE x > 10 RETURNING *")
        .unwrap()
        .unwrap();
    assert_eq!(deleted.to_rows().unwrap()[0]["x"], json!(20));

    assert!(conn.execute("INSERT INTO t VALUES (3)").unwrap().is_none());
}

#[test]
fn test_script_returns_last_result() {
    let session = session();

    let result = session
        .execute("CREATE TEMP TABLE a AS SELECT 1 AS x; SELECT x FROM a")
        .unwrap()
        .expect("the trailing SELECT has rows");
    assert_eq!(result.to_rows().unwrap()[0]["x"], json!(1));

    let result = session.execute("SET threads = 1; SELECT 42 AS n").unwrap().unwrap();
    assert_eq!(result.to_rows().unwrap()[0]["n"], json!(42));

    let result = session.execute("SELECT 1 AS n; SELECT 2 AS n;").unwrap().unwrap();
    assert_eq!(result.to_rows().unwrap()[0]["n"], json!(2));

    assert!(session
        .execute("CREATE TEMP TABLE b (x INTEGER); INSERT INTO b VALUES (1)")
        .unwrap()
        .is_none());
}

#[test]
fn test_script_with_bindings() {
    let session = session();
    let query = sql!(
        "CREATE TEMP TABLE picked AS SELECT * FROM $users WHERE name <> $skip; \
         SELECT count(*) AS n FROM picked",
        users = users(),
        skip = "a;b",
    )
    .unwrap();
    assert_eq!(single_value(&session, &query, "n"), json!(3));
}

#[test]
fn test_execution_error() {
    let session = session();
    let err = session.execute("SELECT * FROM missing_table").unwrap_err();
    assert!(matches!(err, QueryError::ExecutionFailed(_)));
}

#[test]
fn test_invalid_binding_type() {
    let session = session();
    let query = sql!("SELECT $x", x = json!([1, 2, 3])).unwrap();
    assert!(matches!(
        session.query(&query),
        Err(QueryError::InvalidBindingType { .. })
    ));
}

#[test]
fn test_options_run_on_every_connection() {
    init_tracing();
    let session = DuckDbEngine::session(
        SessionConfig::new().with_options("CREATE TABLE seed AS SELECT 42 AS answer;"),
    );

    let query = Query::new("SELECT answer FROM seed");
    assert_eq!(single_value(&session, &query, "answer"), json!(42));
    assert_eq!(single_value(&session, &query, "answer"), json!(42));
}

#[test]
fn test_invalid_options_fail_to_connect() {
    init_tracing();
    let session = DuckDbEngine::session(SessionConfig::new().with_options("THIS IS NOT SQL"));
    assert!(matches!(
        session.execute("SELECT 1"),
        Err(QueryError::ConnectionFailed(_))
    ));
}

#[test]
fn test_file_location_persists_between_connections() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.duckdb");
    let session = DuckDbEngine::session(SessionConfig::new().with_location(path.as_path()));

    session
        .execute("CREATE TABLE events AS SELECT range AS id FROM range(5)")
        .unwrap();

    let count = Query::new("SELECT count(*) AS n FROM events");
    assert_eq!(single_value(&session, &count, "n"), json!(5));

    let with_table = sql!("SELECT count(*) AS n FROM $t", t = users()).unwrap();
    assert_eq!(single_value(&session, &with_table, "n"), json!(3));

    let leftovers = Query::new(
        "SELECT count(*) AS n FROM duckdb_tables() WHERE table_name LIKE 'df_%'",
    );
    assert_eq!(single_value(&session, &leftovers, "n"), json!(0));
}

#[test]
fn test_read_only_engine() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.duckdb");

    DuckDbEngine::session(SessionConfig::new().with_location(path.as_path()))
        .execute("CREATE TABLE t AS SELECT 1 AS x")
        .unwrap();

    let read_only = ezdb_query::Session::new(
        DuckDbEngine::new().read_only(),
        SessionConfig::new().with_location(path.as_path()),
    );
    assert!(read_only.execute("SELECT x FROM t").unwrap().is_some());
    assert!(matches!(
        read_only.execute("INSERT INTO t VALUES (2)"),
        Err(QueryError::ExecutionFailed(_))
    ));

    let in_memory = ezdb_query::Session::new(DuckDbEngine::new().read_only(), SessionConfig::new());
    assert!(matches!(
        in_memory.execute("SELECT 1"),
        Err(QueryError::ConnectionFailed(_))
    ));
}

#[test]
fn test_path_binding_reads_file() {
    let session = session();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    std::fs::write(&path, "id,name\n1,ann\n2,bob\n").unwrap();

    let query = sql!(
        "SELECT count(*) AS n FROM read_csv($path, header = true)",
        path = StoragePath::from(path),
    )
    .unwrap();
    assert_eq!(single_value(&session, &query, "n"), json!(2));
}

#[test]
fn test_scoped_connection() {
    let session = session();

    let result = session
        .with_connection(|conn| -> Result<_> {
            conn.execute_batch("CREATE TABLE t AS SELECT 7 AS x")?;
            conn.execute("SELECT x FROM t")
        })
        .unwrap()
        .unwrap();
    assert_eq!(result.to_rows().unwrap()[0]["x"], json!(7));

    let err = session
        .with_connection(|conn| -> anyhow::Result<()> {
            conn.execute_batch("SELECT * FROM nowhere")?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn test_connection_guard() {
    let session = session();
    let mut conn = session.connect().unwrap();

    conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2);")
        .unwrap();
    let rows = conn.execute("SELECT sum(x) AS s FROM t").unwrap().unwrap();
    assert_eq!(rows.row_count(), 1);

    let count: i64 = conn
        .inner()
        .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);

    conn.close().unwrap();
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let session = session();
    let table = users();
    let mut conn = session.connect().unwrap();

    conn.register(&table.alias(), &table).unwrap();
    let err = conn.register(&table.alias(), &table).unwrap_err();
    assert!(matches!(err, QueryError::RegistrationFailed { ref alias, .. } if *alias == table.alias()));
}
