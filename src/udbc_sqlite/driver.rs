use crate::error::DbError;
use crate::models::db_config::PoolOptions;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc_sqlite::connection::SqliteConnection;
use async_trait::async_trait;

const SQLITE_DRIVER: &str = "rusqlite";
const MEMORY: &str = ":memory:";

/// Opens one `rusqlite::Connection` per pooled connection.
///
/// Accepts `sqlite://path`, `sqlite:path` and `sqlite::memory:`. Every
/// in-memory connection is a separate database, so pools over `:memory:`
/// should be sized to one connection.
pub struct SqliteDriver {
    path: String,
}

impl SqliteDriver {
    pub fn new(options: &PoolOptions) -> Result<Self, DbError> {
        let path = parse_path(&options.url)?;
        Ok(Self { path })
    }
}

fn parse_path(url: &str) -> Result<String, DbError> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .ok_or_else(|| DbError::InvalidDatabaseUrl(format!("not a sqlite URL: {url}")))?;
    // query options such as ?mode=rwc are not interpreted
    let path = rest.split('?').next().unwrap_or_default();
    match path {
        "" => Err(DbError::InvalidDatabaseUrl(format!("missing database path: {url}"))),
        MEMORY | "memory" => Ok(MEMORY.to_string()),
        path => Ok(path.to_string()),
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        SQLITE_DRIVER
    }

    fn r#type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        Ok(Box::new(SqliteConnection::open(&self.path)?))
    }
}
