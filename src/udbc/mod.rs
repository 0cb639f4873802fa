//! Driver boundary: the capability set every database driver provides, plus
//! the value, statement and result types that cross it.

pub mod connection;
pub mod deserializer;
pub mod driver;
pub mod metadata;
#[cfg(test)]
pub(crate) mod mock;
pub mod result;
pub mod serializer;
pub mod statement;
pub mod value;

pub use connection::Connection;
pub use driver::Driver;
pub use metadata::DatabaseMetadata;
pub use result::{ExecResult, GeneratedKey, UpdateCount};
pub use statement::PreparedStatement;
pub use value::{Row, Value};
