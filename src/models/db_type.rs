use crate::error::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    MySql,
    Sqlite,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySql => "mysql",
            DatabaseType::Sqlite => "sqlite",
        }
    }

    /// Product name reported by connection metadata.
    pub fn product_name(&self) -> &'static str {
        match self {
            DatabaseType::MySql => "MySQL",
            DatabaseType::Sqlite => "SQLite",
        }
    }

    /// Resolves the database type from a connection URL's scheme.
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::InvalidDatabaseUrl(format!("missing scheme: {url}")))?;
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::MySql),
            "sqlite" => Ok(DatabaseType::Sqlite),
            other => Err(DbError::UnsupportedDatabaseType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(
            DatabaseType::from_url("mysql://root:pw@localhost:3306/demo").unwrap(),
            DatabaseType::MySql
        );
        assert_eq!(
            DatabaseType::from_url("sqlite::memory:").unwrap(),
            DatabaseType::Sqlite
        );
        assert!(matches!(
            DatabaseType::from_url("postgres://localhost/db"),
            Err(DbError::UnsupportedDatabaseType(s)) if s == "postgres"
        ));
        assert!(matches!(
            DatabaseType::from_url("localhost"),
            Err(DbError::InvalidDatabaseUrl(_))
        ));
    }
}
