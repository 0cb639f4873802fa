//! Statement construction and execution shared by [`session::Session`] and
//! [`crate::transaction::Transaction`].
//!
//! Builders run before a connection is checked out, so a binding mistake
//! never costs a round trip.

pub mod batch;
pub mod session;

use crate::error::DbError;
use crate::pool::PooledConnection;
use crate::udbc::deserializer::from_row;
use crate::udbc::result::{ExecResult, UpdateCount};
use crate::udbc::serializer::to_params;
use crate::udbc::statement::PreparedStatement;
use crate::udbc::value::Row;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

pub(crate) fn literal(sql: &str) -> Result<PreparedStatement, DbError> {
    let stmt = PreparedStatement::new(sql);
    match stmt.placeholder_count() {
        0 => Ok(stmt),
        n => Err(DbError::Binding(format!(
            "literal statement has {n} placeholder(s) and no parameters: {sql}"
        ))),
    }
}

pub(crate) fn parameterized<P>(sql: &str, params: &P) -> Result<PreparedStatement, DbError>
where
    P: Serialize + ?Sized,
{
    PreparedStatement::with_params(sql, to_params(params)?)
}

pub(crate) fn built<F>(sql: &str, f: F) -> Result<PreparedStatement, DbError>
where
    F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
{
    let mut stmt = PreparedStatement::new(sql);
    f(&mut stmt)?;
    stmt.check_bindings()?;
    Ok(stmt)
}

pub(crate) fn literal_batch<S: AsRef<str>>(sqls: &[S]) -> Result<Vec<PreparedStatement>, DbError> {
    sqls.iter().map(|sql| literal(sql.as_ref())).collect()
}

pub(crate) fn params_batch<P: Serialize>(sql: &str, rows: &[P]) -> Result<Vec<PreparedStatement>, DbError> {
    rows.iter().map(|row| parameterized(sql, row)).collect()
}

pub(crate) async fn run_update(
    conn: &mut PooledConnection,
    stmt: &PreparedStatement,
) -> Result<ExecResult, DbError> {
    let start = Instant::now();
    let result = conn.execute(stmt).await;
    conn.observe(&result);
    debug!(
        "Preparing update: sql={}, params={:?}, elapsed_ms={}, affected={:?}, error={:?}",
        stmt.sql(),
        stmt.bound_params().unwrap_or_default(),
        start.elapsed().as_millis(),
        result.as_ref().ok().map(|r| r.rows_affected),
        result.as_ref().err().map(|e| e.to_string())
    );
    result
}

pub(crate) async fn run_batch(
    conn: &mut PooledConnection,
    stmts: &[PreparedStatement],
) -> Result<Vec<UpdateCount>, DbError> {
    let start = Instant::now();
    let result = conn.execute_batch(stmts).await;
    conn.observe(&result);
    debug!(
        "Preparing batch: sql={}, entries={}, elapsed_ms={}, counts={:?}, error={:?}",
        stmts.first().map(|s| s.sql()).unwrap_or_default(),
        stmts.len(),
        start.elapsed().as_millis(),
        result.as_ref().ok(),
        result.as_ref().err().map(|e| e.to_string())
    );
    result
}

pub(crate) async fn run_query<R: DeserializeOwned>(
    conn: &mut PooledConnection,
    stmt: &PreparedStatement,
) -> Result<Vec<R>, DbError> {
    let start = Instant::now();
    let result = conn.query(stmt).await;
    conn.observe(&result);
    debug!(
        "Preparing query: sql={}, params={:?}, elapsed_ms={}, rows={:?}, error={:?}",
        stmt.sql(),
        stmt.bound_params().unwrap_or_default(),
        start.elapsed().as_millis(),
        result.as_ref().ok().map(Vec::len),
        result.as_ref().err().map(|e| e.to_string())
    );
    map_rows(result?)
}

fn map_rows<R: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<R>, DbError> {
    rows.iter().map(from_row::<R>).collect()
}

/// At most one row; more is an error rather than a silent pick.
pub(crate) fn at_most_one<R>(mut rows: Vec<R>, sql: &str) -> Result<Option<R>, DbError> {
    match rows.len() {
        0 | 1 => Ok(rows.pop()),
        n => Err(DbError::Database(format!(
            "expected at most one row but got {n}: {sql}"
        ))),
    }
}
