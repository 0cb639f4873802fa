use crate::error::DbError;
use crate::executor::batch::{BatchSetter, build_entries};
use crate::executor::session::{into_key, key_statement};
use crate::executor::{
    at_most_one, built, literal, literal_batch, parameterized, params_batch, run_batch, run_query,
    run_update,
};
use crate::pool::PooledConnection;
use crate::udbc::result::{GeneratedKey, UpdateCount};
use crate::udbc::statement::PreparedStatement;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A transaction pinned to one checked-out connection.
///
/// Finish it with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropping it unfinished discards the connection instead of returning it to
/// the pool, which ends the transaction on the server without committing.
pub struct Transaction {
    conn: PooledConnection,
    finished: bool,
}

impl Transaction {
    pub(crate) async fn begin(mut conn: PooledConnection) -> Result<Self, DbError> {
        let result = conn.begin().await;
        conn.observe(&result);
        result?;
        debug!("transaction started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    pub async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        let stmt = literal(sql)?;
        Ok(run_update(&mut self.conn, &stmt).await?.rows_affected)
    }

    pub async fn execute_params<P>(&mut self, sql: &str, params: &P) -> Result<u64, DbError>
    where
        P: Serialize + ?Sized,
    {
        let stmt = parameterized(sql, params)?;
        Ok(run_update(&mut self.conn, &stmt).await?.rows_affected)
    }

    pub async fn execute_with<F>(&mut self, sql: &str, f: F) -> Result<u64, DbError>
    where
        F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
    {
        let stmt = built(sql, f)?;
        Ok(run_update(&mut self.conn, &stmt).await?.rows_affected)
    }

    pub async fn execute_for_key<F>(&mut self, sql: &str, f: F) -> Result<GeneratedKey, DbError>
    where
        F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
    {
        let stmt = key_statement(sql, f)?;
        into_key(run_update(&mut self.conn, &stmt).await?, sql)
    }

    pub async fn batch_execute<S: AsRef<str>>(&mut self, sqls: &[S]) -> Result<Vec<UpdateCount>, DbError> {
        let stmts = literal_batch(sqls)?;
        self.batch(&stmts).await
    }

    pub async fn batch_execute_params<P: Serialize>(
        &mut self,
        sql: &str,
        rows: &[P],
    ) -> Result<Vec<UpdateCount>, DbError> {
        let stmts = params_batch(sql, rows)?;
        self.batch(&stmts).await
    }

    pub async fn batch_execute_with<B>(&mut self, sql: &str, setter: &B) -> Result<Vec<UpdateCount>, DbError>
    where
        B: BatchSetter + ?Sized,
    {
        let stmts = build_entries(sql, setter)?;
        self.batch(&stmts).await
    }

    pub async fn query<R, P>(&mut self, sql: &str, params: &P) -> Result<Vec<R>, DbError>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let stmt = parameterized(sql, params)?;
        run_query(&mut self.conn, &stmt).await
    }

    pub async fn query_one<R, P>(&mut self, sql: &str, params: &P) -> Result<Option<R>, DbError>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        at_most_one(self.query(sql, params).await?, sql)
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        let result = self.conn.commit().await;
        self.finish(result, "committed")
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        let result = self.conn.rollback().await;
        self.finish(result, "rolled back")
    }

    async fn batch(&mut self, stmts: &[PreparedStatement]) -> Result<Vec<UpdateCount>, DbError> {
        if stmts.is_empty() {
            return Ok(Vec::new());
        }
        run_batch(&mut self.conn, stmts).await
    }

    // A failed commit or rollback leaves the server state unknown, so the
    // connection is left unfinished and discarded on drop.
    fn finish(&mut self, result: Result<(), DbError>, outcome: &str) -> Result<(), DbError> {
        self.conn.observe(&result);
        if result.is_ok() {
            self.finished = true;
            debug!("transaction {outcome}");
        }
        result
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            self.conn.mark_broken();
            warn!("transaction dropped without commit or rollback, discarding its connection");
        }
    }
}
