use crate::error::DbError;
use crate::models::db_config::PoolOptions;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc_mysql::connection::MysqlConnection;
use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder};

const MYSQL_DRIVER: &str = "mysql_async";

/// Opens one `mysql_async::Conn` per pooled connection; pooling itself is
/// done by [`crate::pool::ConnectionPool`].
pub struct MysqlDriver {
    opts: Opts,
}

impl MysqlDriver {
    pub fn new(options: &PoolOptions) -> Result<Self, DbError> {
        let url = options.url.replacen("mariadb://", "mysql://", 1);
        let opts = Opts::from_url(&url).map_err(|e| DbError::InvalidDatabaseUrl(e.to_string()))?;
        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(user) = &options.username {
            builder = builder.user(Some(user.as_str()));
        }
        if let Some(pass) = &options.password {
            builder = builder.pass(Some(pass.as_str()));
        }
        Ok(Self {
            opts: Opts::from(builder),
        })
    }
}

#[async_trait]
impl Driver for MysqlDriver {
    fn name(&self) -> &str {
        MYSQL_DRIVER
    }

    fn r#type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        let conn = Conn::new(self.opts.clone()).await.map_err(|e| match DbError::from(e) {
            // whatever stops the handshake means no usable connection
            DbError::Database(msg) | DbError::Syntax(msg) => DbError::Connection(msg),
            other => other,
        })?;
        Ok(Box::new(MysqlConnection::open(conn).await?))
    }
}
