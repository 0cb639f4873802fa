use crate::error::DbError;
use crate::executor::batch::{BatchSetter, build_entries};
use crate::executor::{
    at_most_one, built, literal, literal_batch, parameterized, params_batch, run_batch, run_query,
    run_update,
};
use crate::pool::ConnectionPool;
use crate::transaction::Transaction;
use crate::udbc::result::{ExecResult, GeneratedKey, UpdateCount};
use crate::udbc::statement::PreparedStatement;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Executes statements against a [`ConnectionPool`].
///
/// Every call checks out one connection and returns it before completing,
/// whether it succeeded or not. Calls are independent: there is no implicit
/// transaction, use [`Session::begin`] for that.
#[derive(Clone)]
pub struct Session {
    pool: ConnectionPool,
}

impl Session {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Executes literal SQL and returns the affected-row count.
    pub async fn execute(&self, sql: &str) -> Result<u64, DbError> {
        let stmt = literal(sql)?;
        Ok(self.update(&stmt).await?.rows_affected)
    }

    /// Binds `params` positionally. Tuples, arrays, `Vec`s and single
    /// scalars are accepted.
    pub async fn execute_params<P>(&self, sql: &str, params: &P) -> Result<u64, DbError>
    where
        P: Serialize + ?Sized,
    {
        let stmt = parameterized(sql, params)?;
        Ok(self.update(&stmt).await?.rows_affected)
    }

    /// Lets `f` bind the statement by index.
    pub async fn execute_with<F>(&self, sql: &str, f: F) -> Result<u64, DbError>
    where
        F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
    {
        let stmt = built(sql, f)?;
        Ok(self.update(&stmt).await?.rows_affected)
    }

    /// Like [`execute_with`](Self::execute_with), also returning the key the
    /// statement generated. Key columns named by `f` through
    /// [`PreparedStatement::return_generated_keys`] are honoured; otherwise
    /// the driver's native auto-increment key is read.
    pub async fn execute_for_key<F>(&self, sql: &str, f: F) -> Result<GeneratedKey, DbError>
    where
        F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
    {
        let stmt = key_statement(sql, f)?;
        into_key(self.update(&stmt).await?, sql)
    }

    /// Executes each literal statement in order on one connection.
    pub async fn batch_execute<S: AsRef<str>>(&self, sqls: &[S]) -> Result<Vec<UpdateCount>, DbError> {
        let stmts = literal_batch(sqls)?;
        self.batch(&stmts).await
    }

    /// Executes `sql` once per parameter row.
    pub async fn batch_execute_params<P: Serialize>(
        &self,
        sql: &str,
        rows: &[P],
    ) -> Result<Vec<UpdateCount>, DbError> {
        let stmts = params_batch(sql, rows)?;
        self.batch(&stmts).await
    }

    /// Executes `sql` once per entry of `setter`.
    pub async fn batch_execute_with<B>(&self, sql: &str, setter: &B) -> Result<Vec<UpdateCount>, DbError>
    where
        B: BatchSetter + ?Sized,
    {
        let stmts = build_entries(sql, setter)?;
        self.batch(&stmts).await
    }

    /// Runs a query and maps each row onto `R` by column label.
    pub async fn query<R, P>(&self, sql: &str, params: &P) -> Result<Vec<R>, DbError>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let stmt = parameterized(sql, params)?;
        let mut conn = self.pool.acquire().await?;
        run_query(&mut conn, &stmt).await
    }

    /// Returns the only row, `None` when there is none, and an error when
    /// the query produced several.
    pub async fn query_one<R, P>(&self, sql: &str, params: &P) -> Result<Option<R>, DbError>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        at_most_one(self.query(sql, params).await?, sql)
    }

    /// Checks out a connection and starts a transaction on it. The
    /// connection stays checked out until the transaction is finished.
    pub async fn begin(&self) -> Result<Transaction, DbError> {
        Transaction::begin(self.pool.acquire().await?).await
    }

    async fn update(&self, stmt: &PreparedStatement) -> Result<ExecResult, DbError> {
        let mut conn = self.pool.acquire().await?;
        run_update(&mut conn, stmt).await
    }

    async fn batch(&self, stmts: &[PreparedStatement]) -> Result<Vec<UpdateCount>, DbError> {
        if stmts.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.acquire().await?;
        run_batch(&mut conn, stmts).await
    }
}

pub(crate) fn key_statement<F>(sql: &str, f: F) -> Result<PreparedStatement, DbError>
where
    F: FnOnce(&mut PreparedStatement) -> Result<(), DbError>,
{
    let mut stmt = built(sql, f)?;
    if !stmt.returns_generated_keys() {
        stmt.return_generated_keys(Vec::<String>::new());
    }
    Ok(stmt)
}

pub(crate) fn into_key(result: ExecResult, sql: &str) -> Result<GeneratedKey, DbError> {
    match result.generated_key {
        Some(key) => Ok(GeneratedKey {
            rows_affected: result.rows_affected,
            key,
        }),
        None => Err(DbError::NoGeneratedKey(format!(
            "statement produced no key: {sql}"
        ))),
    }
}
