use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Params, Row as MyRow};

use crate::error::DbError;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::metadata::DatabaseMetadata;
use crate::udbc::result::ExecResult;
use crate::udbc::statement::PreparedStatement;
use crate::udbc::value::{Row, Value};
use crate::udbc_mysql::value_codec::{from_mysql_value, to_mysql_value};

pub struct MysqlConnection {
    conn: Conn,
    metadata: DatabaseMetadata,
}

impl MysqlConnection {
    /// Wraps an established connection and reads the server identity.
    pub async fn open(mut conn: Conn) -> Result<Self, DbError> {
        let version: Option<String> = conn.query_first("SELECT VERSION()").await?;
        let version = version.unwrap_or_else(|| {
            let (major, minor, patch) = conn.server_version();
            format!("{major}.{minor}.{patch}")
        });
        let product_name = if version.to_ascii_lowercase().contains("mariadb") {
            "MariaDB"
        } else {
            DatabaseType::MySql.product_name()
        };
        Ok(Self {
            conn,
            metadata: DatabaseMetadata {
                driver_name: "mysql_async".to_string(),
                driver_version: env!("CARGO_PKG_VERSION").to_string(),
                product_name: product_name.to_string(),
                product_version: version,
            },
        })
    }

    fn params(stmt: &PreparedStatement) -> Result<Params, DbError> {
        let values = stmt.bound_params()?;
        Ok(if values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(values.into_iter().map(to_mysql_value).collect())
        })
    }

    fn map_row(row: MyRow) -> Row {
        let columns = row.columns_ref();
        (0..row.len())
            .map(|i| {
                let name = columns
                    .get(i)
                    .map(|c| c.name_str().to_string())
                    .unwrap_or_else(|| i.to_string());
                let value = row.as_ref(i).map_or(Value::Null, from_mysql_value);
                (name, value)
            })
            .collect()
    }
}

#[async_trait]
impl Connection for MysqlConnection {
    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    async fn execute(&mut self, stmt: &PreparedStatement) -> Result<ExecResult, DbError> {
        match Self::params(stmt)? {
            // literal statements go over the text protocol, as-is
            Params::Empty => self.conn.query_drop(stmt.sql()).await?,
            params => self.conn.exec_drop(stmt.sql(), params).await?,
        }
        let generated_key = if stmt.returns_generated_keys() {
            self.conn
                .last_insert_id()
                .filter(|id| *id > 0)
                .map(|id| Value::I64(id as i64))
        } else {
            None
        };
        Ok(ExecResult {
            rows_affected: self.conn.affected_rows(),
            generated_key,
        })
    }

    async fn query(&mut self, stmt: &PreparedStatement) -> Result<Vec<Row>, DbError> {
        // always the binary protocol, which keeps numeric and temporal
        // columns typed instead of returning every column as text
        let rows: Vec<MyRow> = self.conn.exec(stmt.sql(), Self::params(stmt)?).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn ping(&mut self) -> Result<(), DbError> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), DbError> {
        self.conn.query_drop("BEGIN").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.conn.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.conn.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.disconnect().await?;
        Ok(())
    }
}
