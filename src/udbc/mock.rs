//! In-memory driver used by unit tests. It records what reaches the
//! "database" so tests can assert on connection counts and I/O.

use crate::error::DbError;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc::metadata::DatabaseMetadata;
use crate::udbc::result::{ExecResult, UpdateCount};
use crate::udbc::statement::PreparedStatement;
use crate::udbc::value::{Row, Value};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MockState {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub executed: AtomicUsize,
    pub fail_connect: AtomicBool,
    /// Pings fail while set.
    pub dead: AtomicBool,
    /// Batches are answered with `SuccessNoInfo` entries.
    pub batch_no_info: AtomicBool,
    pub next_key: AtomicI64,
    pub log: Mutex<Vec<String>>,
}

impl MockState {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

pub struct MockDriver {
    pub state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn r#type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(DbError::Connection("connection refused".into()));
        }
        let id = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            id,
            state: self.state.clone(),
            metadata: DatabaseMetadata {
                driver_name: "mock".into(),
                driver_version: "0.0.0".into(),
                product_name: "MockDB".into(),
                product_version: "1".into(),
            },
        }))
    }
}

pub struct MockConnection {
    pub id: usize,
    state: Arc<MockState>,
    metadata: DatabaseMetadata,
}

impl MockConnection {
    fn record(&self, entry: String) {
        self.state.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    async fn execute(&mut self, stmt: &PreparedStatement) -> Result<ExecResult, DbError> {
        let params = stmt.bound_params()?;
        self.state.executed.fetch_add(1, Ordering::SeqCst);
        self.record(format!("{}#{}", stmt.sql(), self.id));
        if stmt.sql().starts_with("broken") {
            return Err(DbError::Connection("server has gone away".into()));
        }
        if stmt.sql().starts_with("bad") {
            return Err(DbError::Syntax(stmt.sql().to_string()));
        }
        let generated_key = (stmt.returns_generated_keys() && stmt.sql().starts_with("insert"))
            .then(|| Value::I64(self.state.next_key.fetch_add(1, Ordering::SeqCst) + 1));
        Ok(ExecResult {
            rows_affected: params.len().max(1) as u64,
            generated_key,
        })
    }

    async fn execute_batch(
        &mut self,
        stmts: &[PreparedStatement],
    ) -> Result<Vec<UpdateCount>, DbError> {
        if self.state.batch_no_info.load(Ordering::SeqCst) {
            self.state.executed.fetch_add(1, Ordering::SeqCst);
            return Ok(vec![UpdateCount::SuccessNoInfo; stmts.len()]);
        }
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

    async fn query(&mut self, stmt: &PreparedStatement) -> Result<Vec<Row>, DbError> {
        let params = stmt.bound_params()?;
        self.state.executed.fetch_add(1, Ordering::SeqCst);
        Ok(params
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                [
                    ("id".to_string(), Value::I64(i as i64 + 1)),
                    ("name".to_string(), v.clone()),
                ]
                .into_iter()
                .collect()
            })
            .collect())
    }

    async fn ping(&mut self) -> Result<(), DbError> {
        if self.state.dead.load(Ordering::SeqCst) {
            Err(DbError::Connection("ping failed".into()))
        } else {
            Ok(())
        }
    }

    async fn begin(&mut self) -> Result<(), DbError> {
        self.record(format!("BEGIN#{}", self.id));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.record(format!("COMMIT#{}", self.id));
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.record(format!("ROLLBACK#{}", self.id));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
