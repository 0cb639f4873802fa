pub mod error;
pub mod executor;
pub mod models;
pub mod pool;
pub mod transaction;
pub mod udbc;
#[cfg(feature = "mysql")]
pub mod udbc_mysql;
#[cfg(feature = "sqlite")]
pub mod udbc_sqlite;

pub use error::DbError;
pub use executor::batch::{BatchSetter, FnBatchSetter, batch_setter};
pub use executor::session::Session;
pub use models::db_config::PoolOptions;
pub use models::db_type::DatabaseType;
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use transaction::Transaction;
pub use udbc::{DatabaseMetadata, ExecResult, GeneratedKey, PreparedStatement, Row, UpdateCount, Value};
