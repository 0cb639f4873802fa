use async_trait::async_trait;
use rusqlite::{Connection as RusqliteConnection, params_from_iter};
use std::time::Duration;
use tracing::debug;

use crate::error::DbError;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::metadata::DatabaseMetadata;
use crate::udbc::result::ExecResult;
use crate::udbc::statement::PreparedStatement;
use crate::udbc::value::{Row, Value};
use crate::udbc_sqlite::value_codec::{from_sqlite_value, to_sqlite_value};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single SQLite connection. Calls run inline on the caller's task; SQLite
/// statements are local and short.
pub struct SqliteConnection {
    conn: RusqliteConnection,
    metadata: DatabaseMetadata,
}

impl SqliteConnection {
    pub fn open(path: &str) -> Result<Self, DbError> {
        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory()
        } else {
            RusqliteConnection::open(path)
        }
        .map_err(|e| DbError::Connection(format!("failed to open SQLite database '{path}': {e}")))?;

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| DbError::Connection(format!("failed to enable foreign keys: {e}")))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| DbError::Connection(format!("failed to set busy timeout: {e}")))?;

        debug!(path, "SQLite connection opened");
        Ok(Self {
            conn,
            metadata: DatabaseMetadata {
                driver_name: "rusqlite".to_string(),
                driver_version: env!("CARGO_PKG_VERSION").to_string(),
                product_name: DatabaseType::Sqlite.product_name().to_string(),
                product_version: rusqlite::version().to_string(),
            },
        })
    }

    fn params(stmt: &PreparedStatement) -> Result<Vec<rusqlite::types::Value>, DbError> {
        Ok(stmt.bound_params()?.into_iter().map(to_sqlite_value).collect())
    }

    /// With named key columns the insert is rewritten to `RETURNING` them;
    /// otherwise the rowid is read when an INSERT added at least one row.
    fn execute_returning(&self, stmt: &PreparedStatement) -> Result<ExecResult, DbError> {
        let params = Self::params(stmt)?;
        let columns = stmt.generated_key_columns();
        if columns.is_empty() {
            let mut prepared = self.conn.prepare(stmt.sql()).map_err(prepare_error)?;
            let rows = prepared.execute(params_from_iter(params))? as u64;
            // last_insert_rowid() is per connection and survives earlier
            // statements, so it only counts for an insert that added rows
            let generated_key = (rows > 0 && is_insert(stmt.sql()))
                .then(|| Value::I64(self.conn.last_insert_rowid()));
            return Ok(ExecResult {
                rows_affected: rows,
                generated_key,
            });
        }

        let sql = format!(
            "{} RETURNING {}",
            stmt.sql().trim_end().trim_end_matches(';'),
            columns
                .iter()
                .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut prepared = self.conn.prepare(&sql).map_err(prepare_error)?;
        let mut rows = prepared.query(params_from_iter(params))?;
        let mut rows_affected = 0;
        let mut generated_key = None;
        while let Some(row) = rows.next()? {
            rows_affected += 1;
            if generated_key.is_none() {
                generated_key = Some(from_sqlite_value(row.get_ref(0)?)).filter(|v| !v.is_null());
            }
        }
        Ok(ExecResult {
            rows_affected,
            generated_key,
        })
    }
}

/// `INSERT ...` or `REPLACE ...`, the statements that set `last_insert_rowid()`.
fn is_insert(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

/// `SQLITE_ERROR` while compiling a statement is a malformed statement or
/// an unknown table/column.
fn prepare_error(e: rusqlite::Error) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ffi::ErrorCode::Unknown => {
            DbError::Syntax(e.to_string())
        }
        _ => DbError::from(e),
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    async fn execute(&mut self, stmt: &PreparedStatement) -> Result<ExecResult, DbError> {
        if stmt.returns_generated_keys() {
            return self.execute_returning(stmt);
        }
        let params = Self::params(stmt)?;
        let mut prepared = self.conn.prepare(stmt.sql()).map_err(prepare_error)?;
        let rows = prepared.execute(params_from_iter(params))?;
        Ok(ExecResult::rows(rows as u64))
    }

    async fn query(&mut self, stmt: &PreparedStatement) -> Result<Vec<Row>, DbError> {
        let params = Self::params(stmt)?;
        let mut prepared = self.conn.prepare(stmt.sql()).map_err(prepare_error)?;
        let names: Vec<String> = prepared.column_names().into_iter().map(String::from).collect();
        let mut rows = prepared.query(params_from_iter(params))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut mapped = Row::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                mapped.insert(name.clone(), from_sqlite_value(row.get_ref(i)?));
            }
            out.push(mapped);
        }
        Ok(out)
    }

    async fn ping(&mut self) -> Result<(), DbError> {
        self.conn
            .query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| DbError::Connection(e.to_string()))
    }

    async fn begin(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn
            .close()
            .map_err(|(_, e)| DbError::Connection(e.to_string()))
    }
}
