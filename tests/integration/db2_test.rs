//! Db2 integration tests.
//!
//! These create and drop the events table, so point DB2_DSN at a scratch
//! database where no events table exists yet.

use events_provision::credentials::ConnectionDescriptor;
use events_provision::db::{DatabaseBackend, DriverConnector};
use events_provision::dispatch::Dispatcher;
use events_provision::error::ProvisionError;
use events_provision::mode::Mode;
use events_provision::statements::EventsTable;

/// Helper to get the test connection string from the environment.
fn get_test_descriptor() -> Option<ConnectionDescriptor> {
    std::env::var("DB2_DSN").ok().map(ConnectionDescriptor::new)
}

fn dispatcher() -> Dispatcher {
    let driver = std::env::var("EVENTS_ODBC_DRIVER")
        .unwrap_or_else(|_| events_provision::db::DEFAULT_ODBC_DRIVER.to_string());
    Dispatcher::new(DriverConnector::new(driver), EventsTable::default())
        .with_backend(Some(DatabaseBackend::Db2))
}

#[tokio::test]
async fn test_db2_lifecycle() {
    let Some(descriptor) = get_test_descriptor() else {
        eprintln!("Skipping test: DB2_DSN not set");
        return;
    };
    let dispatcher = dispatcher();

    dispatcher.run(&descriptor, Mode::Setup).await.unwrap();

    let again = dispatcher.run(&descriptor, Mode::Setup).await.unwrap_err();
    assert!(matches!(again, ProvisionError::Statement { .. }));

    let seeded = dispatcher.run(&descriptor, Mode::SampleData).await.unwrap();
    assert_eq!(seeded.rows_affected, Some(2));

    dispatcher.run(&descriptor, Mode::Cleanup).await.unwrap();

    let missing = dispatcher.run(&descriptor, Mode::Cleanup).await.unwrap_err();
    assert!(matches!(missing, ProvisionError::Statement { .. }));
}

#[tokio::test(flavor = "current_thread")]
async fn test_db2_unreachable_host() {
    if get_test_descriptor().is_none() {
        eprintln!("Skipping test: DB2_DSN not set");
        return;
    }

    let descriptor = ConnectionDescriptor::new(
        "DATABASE=bludb;HOSTNAME=invalid.host.that.does.not.exist.local;PORT=50001;PROTOCOL=TCPIP;UID=u;PWD=p;Security=SSL",
    );
    let err = dispatcher()
        .run(&descriptor, Mode::Setup)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Connection { .. }));
}
