use crate::error::DbError;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use async_trait::async_trait;

/// Opens physical connections for one configured database.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn r#type(&self) -> DatabaseType;

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError>;
}
