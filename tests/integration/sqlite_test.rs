//! End-to-end provisioning against a SQLite database file.

use events_provision::db::DriverConnector;
use events_provision::dispatch::Dispatcher;
use events_provision::invocation::{invoke, Envelope, InvocationParams};
use events_provision::statements::EventsTable;
use serde_json::json;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::str::FromStr;
use tempfile::TempDir;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("events.db").display())
}

fn params(url: &str, mode: &str) -> InvocationParams {
    serde_json::from_value(json!({
        "__bx_creds": { "local": { "dsn": url } },
        "mode": mode
    }))
    .unwrap()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(DriverConnector::default(), EventsTable::default())
}

async fn open(url: &str) -> SqliteConnection {
    SqliteConnectOptions::from_str(url)
        .unwrap()
        .connect()
        .await
        .unwrap()
}

async fn table_exists(url: &str) -> bool {
    let mut conn = open(url).await;
    let count: (i64,) =
        sqlx::query_as("select count(*) from sqlite_master where type = 'table' and name = 'events'")
            .fetch_one(&mut conn)
            .await
            .unwrap();
    conn.close().await.unwrap();
    count.0 == 1
}

#[tokio::test]
async fn test_setup_creates_events_table() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    let envelope = invoke(&params(&url, "setup"), &dispatcher()).await;
    let Envelope::Result(result) = envelope else {
        panic!("expected result envelope, got {envelope:?}");
    };
    // The sequence seed runs alongside the create but is not reported.
    assert_eq!(result.rows_affected, None);

    let mut conn = open(&url).await;
    let columns: Vec<(i64, String, String, i64, Option<String>, i64)> =
        sqlx::query_as("pragma table_info(events)")
            .fetch_all(&mut conn)
            .await
            .unwrap();
    conn.close().await.unwrap();

    let names: Vec<&str> = columns.iter().map(|c| c.1.as_str()).collect();
    assert_eq!(
        names,
        ["eid", "shortname", "location", "begindate", "enddate", "contact"]
    );
    assert!(columns.iter().all(|c| c.3 == 1), "every column is not null");
    assert_eq!(columns[1].2, "varchar(20)");
    assert_eq!(columns[2].2, "varchar(60)");
    assert_eq!(columns[5].2, "varchar(255)");
}

#[tokio::test]
async fn test_setup_twice_returns_dberror() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let dispatcher = dispatcher();

    assert!(!invoke(&params(&url, "setup"), &dispatcher).await.is_error());

    let envelope = invoke(&params(&url, "setup"), &dispatcher).await;
    let Envelope::Dberror(payload) = envelope else {
        panic!("expected dberror envelope");
    };
    assert_eq!(payload.kind, "statement");
    assert!(payload.message.contains("already exists"));
}

#[tokio::test]
async fn test_sampledata_inserts_two_rows_from_eid_1000() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let dispatcher = dispatcher();

    assert!(!invoke(&params(&url, "setup"), &dispatcher).await.is_error());
    let envelope = invoke(&params(&url, "sampledata"), &dispatcher).await;
    let Envelope::Result(result) = envelope else {
        panic!("expected result envelope");
    };
    assert_eq!(result.rows_affected, Some(2));

    let mut conn = open(&url).await;
    let rows: Vec<(i64, String, String, String, String, String)> = sqlx::query_as(
        "select eid, shortname, location, begindate, enddate, contact from events order by eid",
    )
    .fetch_all(&mut conn)
    .await
    .unwrap();
    conn.close().await.unwrap();

    assert_eq!(
        rows,
        vec![
            (
                1000,
                "Think 2019".to_string(),
                "San Francisco".to_string(),
                "2019-02-12 00:00:00".to_string(),
                "2019-02-15 23:59:00".to_string(),
                "https://www.ibm.com/events/think/".to_string(),
            ),
            (
                1001,
                "IDUG2019".to_string(),
                "Charlotte".to_string(),
                "2019-06-02 00:00:00".to_string(),
                "2019-06-06 23:59:00".to_string(),
                "http://www.idug.org".to_string(),
            ),
        ]
    );
}

#[tokio::test]
async fn test_cleanup_drops_table() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let dispatcher = dispatcher();

    assert!(!invoke(&params(&url, "setup"), &dispatcher).await.is_error());
    assert!(table_exists(&url).await);

    assert!(!invoke(&params(&url, "cleanup"), &dispatcher).await.is_error());
    assert!(!table_exists(&url).await);
}

#[tokio::test]
async fn test_cleanup_without_table_returns_dberror() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    let envelope = invoke(&params(&url, "cleanup"), &dispatcher()).await;
    assert!(envelope.is_error());
}

#[tokio::test]
async fn test_unknown_mode_leaves_schema_untouched() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let dispatcher = dispatcher();

    assert!(!invoke(&params(&url, "setup"), &dispatcher).await.is_error());

    let envelope = invoke(&params(&url, "bogus"), &dispatcher).await;
    let Envelope::Dberror(payload) = envelope else {
        panic!("expected dberror envelope");
    };
    assert_eq!(payload.kind, "mode");
    assert!(table_exists(&url).await);
}
