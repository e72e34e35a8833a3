use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;

use crate::model::{CallInstruction, CallTarget, Function};
use crate::results::AnalysisSnapshot;

/// Minimum schema version we know how to read.
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 1;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Error type for analysis-results database operations.
#[derive(Debug, Error)]
pub enum ResultsError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was written with a schema we cannot read.
    #[error(
        "Unsupported results schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    /// The database content violates the results model.
    #[error("malformed analysis results: {0}")]
    Malformed(String),
}

/// Convenience result type for results-database operations.
pub type ResultsResult<T> = Result<T, ResultsError>;

/// SQLite-backed store of persisted analysis results.
///
/// Written by the analysis pass (or an importer) and read by reports.
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    /// Open (or create) a results database for writing and ensure the schema exists.
    pub fn create(path: &Path) -> ResultsResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an existing results database read-only.
    pub fn open_read_only(path: &Path) -> ResultsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let version = current_schema_version(&conn)?;
        if version == 0 {
            return Err(ResultsError::Malformed("database has no results schema".into()));
        }
        check_supported(version)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_function(&self, function: &Function) -> ResultsResult<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO functions (address, name)
            VALUES (?1, ?2)
            "#,
            params![function.address as i64, function.name],
        )?;
        Ok(())
    }

    /// Insert a call instruction with its target encoded as `(kind, value)`.
    pub fn insert_call(
        &self,
        function_address: u64,
        address: u64,
        target_kind: &str,
        target_value: Option<&str>,
        has_string_args: bool,
        annotation: &str,
    ) -> ResultsResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO call_instructions
                (function_address, address, target_kind, target_value, has_string_args, annotation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                function_address as i64,
                address as i64,
                target_kind,
                target_value,
                if has_string_args { 1 } else { 0 },
                annotation
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List all functions (ordered by address).
    pub fn list_functions(&self) -> ResultsResult<Vec<Function>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT address, name
            FROM functions
            ORDER BY address
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let address: i64 = row.get(0)?;
            Ok(Function { address: address as u64, name: row.get(1)? })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// List all call instructions, ordered by containing function then address.
    pub fn list_calls(&self) -> ResultsResult<Vec<CallInstruction>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT function_address, address, target_kind, target_value, has_string_args, annotation
            FROM call_instructions
            ORDER BY function_address, address, id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let function_address: i64 = row.get(0)?;
            let address: i64 = row.get(1)?;
            let kind: String = row.get(2)?;
            let value: Option<String> = row.get(3)?;
            let has_string_args: i64 = row.get(4)?;
            Ok(CallInstruction {
                function_address: function_address as u64,
                address: address as u64,
                target: CallTarget::decode(&kind, value.as_deref()),
                has_string_args: has_string_args != 0,
                annotation: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Load everything into an in-memory snapshot, validating references.
    pub fn load_snapshot(&self) -> ResultsResult<AnalysisSnapshot> {
        AnalysisSnapshot::new(self.list_functions()?, self.list_calls()?)
    }
}

fn check_supported(version: i32) -> ResultsResult<()> {
    if !(MIN_SUPPORTED_SCHEMA_VERSION..=CURRENT_SCHEMA_VERSION).contains(&version) {
        return Err(ResultsError::UnsupportedSchemaVersion {
            found: version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: functions + call_instructions
fn apply_migrations(conn: &Connection) -> ResultsResult<()> {
    let current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(ResultsError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS functions (
                address INTEGER PRIMARY KEY,
                name    TEXT
            );

            CREATE TABLE IF NOT EXISTS call_instructions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                function_address INTEGER NOT NULL,
                address          INTEGER NOT NULL,
                target_kind      TEXT NOT NULL,
                target_value     TEXT,
                has_string_args  INTEGER NOT NULL DEFAULT 0,
                annotation       TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_calls_function
                ON call_instructions (function_address, address);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> ResultsResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
