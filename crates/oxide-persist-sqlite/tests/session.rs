//! End-to-end tests of sessions against SQLite.
//!
//! Every test derives its tables from `#[derive(Storable)]` types, writes
//! instances through a [`Session`] and reads them back.

use oxide_persist_core::ast::{NumberExpr, OrderDirection, Select, SqlType, StringExpr};
use oxide_persist_core::catalog::{EntityReference, SchemaRegistry, Site};
use oxide_persist_core::codec::Decoder;
use oxide_persist_core::dialect::RenderedSql;
use oxide_persist_core::identifier::{ColumnName, TableName};
use oxide_persist_core::session::{Connection, Session};
use oxide_persist_core::value::SqlValue;
use oxide_persist_core::{Dependents, PersistConfig, PersistError, Ref};
use oxide_persist_derive::Storable;
use oxide_persist_sqlite::SqliteConnection;

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "owners")]
struct Owner {
    #[column(primary_key)]
    id: i64,
    #[column(unique, sql_type = "string64")]
    name: String,
}

fn non_negative(column: &ColumnName) -> oxide_persist_core::BooleanExpr {
    NumberExpr::column(column.clone()).gt_eq(NumberExpr::integer(0))
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "pets")]
struct Pet {
    #[column(primary_key)]
    id: i64,
    #[column(on_delete = "cascade")]
    owner: Ref<Owner>,
    #[column(name = "nick")]
    nickname: Option<String>,
    #[column(check = non_negative)]
    legs: i16,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "points")]
struct Point {
    #[column(primary_key)]
    x: i32,
    #[column(primary_key)]
    y: i32,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "routes")]
struct Route {
    #[column(primary_key)]
    id: i64,
    label: String,
    stops: Dependents<Point>,
}

#[derive(Debug, Clone, PartialEq, Storable)]
#[table(name = "wide")]
struct Wide {
    #[column(primary_key)]
    id: i64,
    flag: bool,
    tiny: i8,
    small: i16,
    big: i128,
    ratio: f32,
    precise: f64,
    initial: char,
    digest: [u8; 16],
    payload: Vec<u8>,
    note: Option<String>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn open(registry: &SchemaRegistry) -> Session<'_, SqliteConnection> {
    init_tracing();
    SqliteConnection::in_memory()
        .await
        .unwrap()
        .into_session(registry)
}

fn raw(sql: &str) -> RenderedSql {
    RenderedSql {
        sql: sql.to_string(),
        parameters: Vec::new(),
    }
}

async fn count(session: &mut Session<'_, SqliteConnection>, table: &str) -> i64 {
    let connection = session.connection_mut();
    let statement = connection
        .prepare(&raw(&format!("SELECT COUNT(*) FROM {table}")))
        .await
        .unwrap();
    let mut rows = connection.query(statement).await.unwrap();
    rows.move_to_first_row().unwrap();
    rows.decode_integer64().unwrap()
}

fn ann() -> Owner {
    Owner {
        id: 1,
        name: "Ann".into(),
    }
}

fn pet(id: i64, nickname: Option<&str>, legs: i16) -> Pet {
    Pet {
        id,
        owner: Ref::to(&ann()).unwrap(),
        nickname: nickname.map(String::from),
        legs,
    }
}

// =============================================================================
// Test: Keyed types and references
// =============================================================================

#[tokio::test]
async fn test_referenced_tables_are_created() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;

    assert_eq!(session.create_tables::<Pet>().await.unwrap(), 2);
    assert_eq!(session.create_tables::<Pet>().await.unwrap(), 2);
    assert_eq!(count(&mut session, "owners").await, 0);
    assert_eq!(count(&mut session, "pets").await, 0);
}

#[tokio::test]
async fn test_insert_select_update_delete() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Pet>().await.unwrap();

    session.insert(&ann()).await.unwrap();
    let rex = pet(10, Some("Rex"), 4);
    let tweety = pet(11, None, 2);
    assert_eq!(session.insert_all(&[rex.clone(), tweety.clone()]).await.unwrap(), 2);

    let pets: Vec<Pet> = session.select_all().await.unwrap();
    assert_eq!(pets, vec![rex.clone(), tweety.clone()]);

    let renamed = Pet {
        nickname: Some("Max".into()),
        ..rex
    };
    assert_eq!(session.update(&renamed).await.unwrap(), 1);
    assert_eq!(session.delete(&tweety).await.unwrap(), 1);

    let pets: Vec<Pet> = session.select_all().await.unwrap();
    assert_eq!(pets, vec![renamed]);
}

#[tokio::test]
async fn test_select_where_binds_filter_values() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Pet>().await.unwrap();
    session.insert(&ann()).await.unwrap();
    session
        .insert_all(&[pet(1, Some("Rex"), 4), pet(2, Some("Rio"), 2), pet(3, None, 4)])
        .await
        .unwrap();

    let legs = ColumnName::new("legs").unwrap();
    let filter = NumberExpr::column(legs).gt(NumberExpr::parameter(SqlType::Integer16).unwrap());
    let pets: Vec<Pet> = session
        .select_where(filter, vec![SqlValue::Int16(3)])
        .await
        .unwrap();
    assert_eq!(pets.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);

    let nick = ColumnName::new("nick").unwrap();
    let filter = StringExpr::column(nick).like(StringExpr::parameter(SqlType::String).unwrap());
    let pets: Vec<Pet> = session
        .select_where(filter, vec![SqlValue::Text("R%".into())])
        .await
        .unwrap();
    assert_eq!(pets.len(), 2);

    let filter = NumberExpr::column(ColumnName::new("id").unwrap())
        .eq(NumberExpr::parameter(SqlType::Integer64).unwrap());
    assert!(matches!(
        session.select_where::<Pet>(filter, Vec::new()).await,
        Err(PersistError::MalformedNode(_))
    ));
}

#[tokio::test]
async fn test_constraints_are_enforced() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Pet>().await.unwrap();
    session.insert(&ann()).await.unwrap();

    let stray = Pet {
        owner: Ref::from_key(99_i64),
        ..pet(1, None, 4)
    };
    assert!(matches!(
        session.insert(&stray).await,
        Err(PersistError::QueryExecutionFailed(_))
    ));
    assert!(matches!(
        session.insert(&pet(2, None, -1)).await,
        Err(PersistError::QueryExecutionFailed(_))
    ));
    let twin = Owner {
        id: 2,
        name: "Ann".into(),
    };
    assert!(matches!(
        session.insert(&twin).await,
        Err(PersistError::QueryExecutionFailed(_))
    ));
}

#[tokio::test]
async fn test_deleting_owner_cascades() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Pet>().await.unwrap();
    session.insert(&ann()).await.unwrap();
    session.insert(&pet(1, None, 4)).await.unwrap();

    session.delete(&ann()).await.unwrap();
    assert_eq!(count(&mut session, "pets").await, 0);
}

// =============================================================================
// Test: Dependent collections
// =============================================================================

fn route() -> Route {
    Route {
        id: 7,
        label: "loop".into(),
        stops: Dependents(vec![
            Point { x: 0, y: 0 },
            Point { x: 5, y: 1 },
            Point { x: 0, y: 0 },
        ]),
    }
}

#[tokio::test]
async fn test_dependents_round_trip_in_order() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    assert_eq!(session.create_tables::<Route>().await.unwrap(), 2);

    let empty = Route {
        id: 8,
        label: "empty".into(),
        stops: Dependents::default(),
    };
    session.insert_all(&[route(), empty.clone()]).await.unwrap();
    assert_eq!(count(&mut session, "routes_stops").await, 3);

    let routes: Vec<Route> = session.select_all().await.unwrap();
    assert_eq!(routes, vec![route(), empty]);
}

#[tokio::test]
async fn test_update_replaces_dependents() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Route>().await.unwrap();
    session.insert(&route()).await.unwrap();

    let shorter = Route {
        label: "short".into(),
        stops: Dependents(vec![Point { x: 9, y: 9 }]),
        ..route()
    };
    assert_eq!(session.update(&shorter).await.unwrap(), 1);
    let routes: Vec<Route> = session.select_all().await.unwrap();
    assert_eq!(routes, vec![shorter.clone()]);

    session.delete(&shorter).await.unwrap();
    assert!(session.select_all::<Route>().await.unwrap().is_empty());
    assert_eq!(count(&mut session, "routes_stops").await, 0);
}

// =============================================================================
// Test: Value fidelity
// =============================================================================

#[tokio::test]
async fn test_every_scalar_survives_storage() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Wide>().await.unwrap();

    let rows = vec![
        Wide {
            id: 1,
            flag: true,
            tiny: i8::MIN,
            small: i16::MAX,
            big: i128::MAX,
            ratio: 0.5,
            precise: -2.25,
            initial: 'é',
            digest: [0xab; 16],
            payload: vec![0, 1, 2, 255],
            note: Some(String::from("first")),
        },
        Wide {
            id: 2,
            flag: false,
            tiny: 0,
            small: -1,
            big: i128::MIN,
            ratio: -8.0,
            precise: 1e300,
            initial: ' ',
            digest: [0; 16],
            payload: Vec::new(),
            note: None,
        },
    ];
    session.insert_all(&rows).await.unwrap();
    assert_eq!(session.select_all::<Wide>().await.unwrap(), rows);
}

// =============================================================================
// Test: Batching and transactions
// =============================================================================

#[tokio::test]
async fn test_insert_all_in_batches() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await.with_batch_size(3).unwrap();
    session.create_tables::<Point>().await.unwrap();

    let points: Vec<Point> = (0..10).map(|i| Point { x: i, y: -i }).collect();
    assert_eq!(session.insert_all(&points).await.unwrap(), 10);
    assert_eq!(session.select_all::<Point>().await.unwrap(), points);
}

#[tokio::test]
async fn test_large_batches_stay_under_variable_limit() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await.with_batch_size(20_000).unwrap();
    session.create_tables::<Point>().await.unwrap();

    // 20_000 rows of two columns would bind 40_000 variables at once.
    let points: Vec<Point> = (0..20_000).map(|i| Point { x: i, y: 0 }).collect();
    assert_eq!(session.insert_all(&points).await.unwrap(), 20_000);
    assert_eq!(count(&mut session, "points").await, 20_000);
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Point>().await.unwrap();

    session.begin().await.unwrap();
    session.insert(&Point { x: 1, y: 1 }).await.unwrap();
    session.rollback().await.unwrap();
    assert!(session.select_all::<Point>().await.unwrap().is_empty());

    session.begin().await.unwrap();
    session.insert(&Point { x: 2, y: 2 }).await.unwrap();
    session.commit().await.unwrap();
    assert_eq!(
        session.select_all::<Point>().await.unwrap(),
        vec![Point { x: 2, y: 2 }]
    );
}

// =============================================================================
// Test: Sites and configuration
// =============================================================================

fn account(key: i64) -> Site {
    Site::default().with_entity(EntityReference {
        table: TableName::new("accounts").unwrap(),
        column: ColumnName::new("id").unwrap(),
        key,
    })
}

#[tokio::test]
async fn test_entity_scope_isolates_rows() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await.with_site(account(7));
    session
        .execute_sql(&raw("CREATE TABLE accounts (id INTEGER PRIMARY KEY)"))
        .await
        .unwrap();
    session
        .execute_sql(&raw("INSERT INTO accounts (id) VALUES (7), (8)"))
        .await
        .unwrap();
    session.create_tables::<Point>().await.unwrap();
    session
        .insert_all(&[Point { x: 1, y: 1 }, Point { x: 2, y: 2 }])
        .await
        .unwrap();

    let mut other = session
        .into_connection()
        .into_session(&registry)
        .with_site(account(8));
    assert!(other.select_all::<Point>().await.unwrap().is_empty());
    other.insert(&Point { x: 3, y: 3 }).await.unwrap();
    assert_eq!(count(&mut other, "points").await, 3);
    assert_eq!(
        other.select_all::<Point>().await.unwrap(),
        vec![Point { x: 3, y: 3 }]
    );

    let mut session = other.into_connection().into_session(&registry).with_site(account(7));
    assert_eq!(session.select_all::<Point>().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_session_from_config() {
    init_tracing();
    let registry = SchemaRegistry::new();
    let config = PersistConfig::from_json_str(r#"{ "dialect": "sqlite", "batch_size": 2 }"#).unwrap();
    let connection = SqliteConnection::in_memory().await.unwrap();
    let mut session = Session::from_config(connection, &registry, &config).unwrap();
    assert_eq!(session.dialect().name(), "sqlite");

    session.create_tables::<Point>().await.unwrap();
    let points: Vec<Point> = (0..5).map(|i| Point { x: i, y: i }).collect();
    assert_eq!(session.insert_all(&points).await.unwrap(), 5);
}

#[tokio::test]
async fn test_file_database_persists_across_connections() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("pets.db").display());

    let registry = SchemaRegistry::new();
    let mut session = SqliteConnection::connect(&url)
        .await
        .unwrap()
        .into_session(&registry);
    session.create_tables::<Pet>().await.unwrap();
    session.insert(&ann()).await.unwrap();
    session.insert(&pet(1, Some("Rex"), 4)).await.unwrap();
    session.close().await.unwrap();

    let registry = SchemaRegistry::new();
    let mut session = SqliteConnection::connect(&url)
        .await
        .unwrap()
        .into_session(&registry);
    session.create_tables::<Pet>().await.unwrap();
    let pets = session.select_all::<Pet>().await;
    let pets = session.close_after(pets).await.unwrap();
    assert_eq!(pets, vec![pet(1, Some("Rex"), 4)]);
}

// =============================================================================
// Test: Expressions evaluated by SQLite
// =============================================================================

#[tokio::test]
async fn test_single_operand_variadics_keep_every_row() {
    let registry = SchemaRegistry::new();
    let mut session = open(&registry).await;
    session.create_tables::<Point>().await.unwrap();
    session
        .insert_all(&[Point { x: 1, y: 4 }, Point { x: 2, y: 7 }])
        .await
        .unwrap();

    let x = || NumberExpr::column(ColumnName::new("x").unwrap());
    let y = NumberExpr::column(ColumnName::new("y").unwrap());
    let select = Select::new(TableName::new("points").unwrap())
        .project(NumberExpr::greatest(vec![y]).unwrap(), None)
        .project(NumberExpr::coalesce(vec![x()]).unwrap(), None)
        .order_by(x(), OrderDirection::Asc);
    let rendered = session.render(&select).unwrap();
    assert_eq!(rendered.sql, "SELECT (Y), (X) FROM POINTS ORDER BY X ASC");

    let connection = session.connection_mut();
    let statement = connection.prepare(&rendered).await.unwrap();
    let mut rows = connection.query(statement).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.move_to_next_row().unwrap());
    assert_eq!(rows.decode_integer32().unwrap(), 4);
    assert_eq!(rows.decode_integer32().unwrap(), 1);
    assert!(rows.move_to_next_row().unwrap());
    assert_eq!(rows.decode_integer32().unwrap(), 7);
    assert_eq!(rows.decode_integer32().unwrap(), 2);
}
