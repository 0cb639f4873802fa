use crate::error::DbError;
use crate::udbc::metadata::DatabaseMetadata;
use crate::udbc::result::{ExecResult, UpdateCount};
use crate::udbc::statement::PreparedStatement;
use crate::udbc::value::Row;
use async_trait::async_trait;

/// One physical database connection.
///
/// Statements reaching a connection have already passed
/// [`PreparedStatement::check_bindings`].
#[async_trait]
pub trait Connection: Send {
    fn metadata(&self) -> &DatabaseMetadata;

    /// Executes a statement. Statements without parameters may be sent as
    /// literal text. The generated key is fetched only when the statement
    /// asked for it.
    async fn execute(&mut self, stmt: &PreparedStatement) -> Result<ExecResult, DbError>;

    /// Executes the entries in order. The default runs them one by one and,
    /// on failure, reports the counts of the entries that completed.
    async fn execute_batch(
        &mut self,
        stmts: &[PreparedStatement],
    ) -> Result<Vec<UpdateCount>, DbError> {
        let mut counts = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match self.execute(stmt).await {
                Ok(r) => counts.push(UpdateCount::Rows(r.rows_affected)),
                Err(e) => {
                    return Err(DbError::Batch {
                        counts,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(counts)
    }

    async fn query(&mut self, stmt: &PreparedStatement) -> Result<Vec<Row>, DbError>;

    async fn ping(&mut self) -> Result<(), DbError>;

    // ---------- transaction ----------
    async fn begin(&mut self) -> Result<(), DbError>;
    async fn commit(&mut self) -> Result<(), DbError>;
    async fn rollback(&mut self) -> Result<(), DbError>;

    async fn close(self: Box<Self>) -> Result<(), DbError>;
}
