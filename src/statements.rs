//! The fixed SQL statements run against the events table.
//!
//! The Db2 text is what existing consumers of the table were created with and
//! must not drift. SQLite gets an equivalent table for local runs.

use crate::db::DatabaseBackend;
use crate::error::{ProvisionError, Result};
use crate::mode::Mode;

/// Unqualified table name.
pub const TABLE_NAME: &str = "events";

/// First value handed out by the `eid` identity column.
pub const FIRST_EID: i64 = 1000;

/// A row inserted by the sampledata mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEvent {
    pub shortname: &'static str,
    pub location: &'static str,
    pub begindate: &'static str,
    pub enddate: &'static str,
    pub contact: &'static str,
}

pub const SAMPLE_EVENTS: [SampleEvent; 2] = [
    SampleEvent {
        shortname: "Think 2019",
        location: "San Francisco",
        begindate: "2019-02-12 00:00:00",
        enddate: "2019-02-15 23:59:00",
        contact: "https://www.ibm.com/events/think/",
    },
    SampleEvent {
        shortname: "IDUG2019",
        location: "Charlotte",
        begindate: "2019-06-02 00:00:00",
        enddate: "2019-06-06 23:59:00",
        contact: "http://www.idug.org",
    },
];

/// The events table, optionally qualified by a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsTable {
    schema: Option<String>,
}

impl EventsTable {
    /// Creates the table reference. The schema must be a plain identifier.
    pub fn new(schema: Option<&str>) -> Result<Self> {
        let schema = match schema.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) if is_identifier(s) => Some(s.to_string()),
            Some(s) => {
                return Err(ProvisionError::config(format!(
                    "invalid table schema '{s}': expected letters, digits or underscores"
                )))
            }
        };
        Ok(Self { schema })
    }

    /// Returns the table name as used in statements.
    pub fn qualified_name(&self) -> String {
        self.qualify(TABLE_NAME)
    }

    fn qualify(&self, name: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{name}"),
            None => name.to_string(),
        }
    }

    /// Returns the statement for `mode` in the dialect of `backend`.
    pub fn statement(&self, mode: Mode, backend: DatabaseBackend) -> String {
        match mode {
            Mode::Setup => self.create_table(backend),
            Mode::SampleData => self.insert_samples(),
            Mode::Cleanup => format!("drop table {};", self.qualified_name()),
        }
    }

    fn create_table(&self, backend: DatabaseBackend) -> String {
        let table = self.qualified_name();
        match backend {
            DatabaseBackend::Db2 => format!(
                "create table {table} \
                 (eid int not null generated always as identity (start with {FIRST_EID}, increment by 1),\
                 shortname varchar(20) not null,\
                 location varchar(60) not null,\
                 begindate timestamp not null,\
                 enddate timestamp not null,\
                 contact varchar(255) not null);"
            ),
            // AUTOINCREMENT continues after the sqlite_sequence value.
            DatabaseBackend::Sqlite => format!(
                "create table {table} \
                 (eid integer primary key autoincrement not null,\
                 shortname varchar(20) not null,\
                 location varchar(60) not null,\
                 begindate timestamp not null,\
                 enddate timestamp not null,\
                 contact varchar(255) not null);\
                 insert into {sequence} (name, seq) values ('{TABLE_NAME}', {seed});",
                sequence = self.qualify("sqlite_sequence"),
                seed = FIRST_EID - 1,
            ),
        }
    }

    fn insert_samples(&self) -> String {
        let rows = SAMPLE_EVENTS
            .iter()
            .map(|e| {
                format!(
                    "('{}','{}','{}','{}','{}')",
                    e.shortname, e.location, e.begindate, e.enddate, e.contact
                )
            })
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "insert into {}(shortname,location,begindate,enddate,contact) values{rows};",
            self.qualified_name()
        )
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
