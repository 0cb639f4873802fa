//! Bounded connection pool.
//!
//! A semaphore with `max_open_conns` permits bounds check-outs; each
//! [`PooledConnection`] owns one permit for as long as it is held. Idle
//! connections are kept in a LIFO stack. A physical connection is only
//! opened when a permit was obtained and the idle stack is empty, so the
//! number of open connections never exceeds `max_open_conns`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::models::db_config::PoolOptions;
use crate::models::db_type::DatabaseType;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc::metadata::DatabaseMetadata;
#[cfg(feature = "mysql")]
use crate::udbc_mysql::driver::MysqlDriver;
#[cfg(feature = "sqlite")]
use crate::udbc_sqlite::driver::SqliteDriver;

/// A cloneable handle to a shared pool of physical connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    driver: Arc<dyn Driver>,
    options: PoolOptions,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    permits: Arc<Semaphore>,
    size: AtomicUsize,
    closed: AtomicBool,
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max: usize,
    /// Open physical connections, idle or checked out.
    pub size: usize,
    pub idle: usize,
    pub in_use: usize,
}

impl ConnectionPool {
    /// Builds a pool for the database named by `options.url`. No connection
    /// is opened until the first [`acquire`](Self::acquire).
    pub fn connect(options: PoolOptions) -> Result<Self, DbError> {
        options.validate()?;
        let driver: Arc<dyn Driver> = match DatabaseType::from_url(&options.url)? {
            #[cfg(feature = "mysql")]
            DatabaseType::MySql => Arc::new(MysqlDriver::new(&options)?),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Arc::new(SqliteDriver::new(&options)?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(DbError::UnsupportedDatabaseType(format!(
                    "{} (feature not enabled)",
                    other.as_str()
                )));
            }
        };
        Self::with_driver(driver, options)
    }

    /// Builds a pool over an arbitrary driver.
    pub fn with_driver(driver: Arc<dyn Driver>, options: PoolOptions) -> Result<Self, DbError> {
        options.validate()?;
        debug!(
            driver = driver.name(),
            db_type = driver.r#type().as_str(),
            max_open_conns = options.max_open_conns,
            "connection pool created"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(options.max_open_conns)),
                idle: Mutex::new(Vec::with_capacity(options.max_open_conns)),
                size: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                driver,
                options,
            }),
        })
    }

    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    pub fn database_type(&self) -> DatabaseType {
        self.inner.driver.r#type()
    }

    /// Checks out a connection, waiting at most the configured acquire
    /// timeout for one to become free.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(DbError::PoolExhausted("pool is closed".into()));
        }

        let start = Instant::now();
        let timeout = inner.options.acquire_timeout_duration();
        let permit = tokio::time::timeout(timeout, inner.permits.clone().acquire_owned())
            .await
            .map_err(|_| {
                DbError::PoolExhausted(format!(
                    "timed out after {}ms waiting for one of {} connection(s)",
                    timeout.as_millis(),
                    inner.options.max_open_conns
                ))
            })?
            .map_err(|_| DbError::PoolExhausted("pool is closed".into()))?;

        while let Some(mut conn) = inner.pop_idle() {
            if inner.options.test_on_borrow {
                if let Err(e) = conn.ping().await {
                    inner.size.fetch_sub(1, Ordering::AcqRel);
                    warn!(error = %e, "idle connection failed validation, discarding");
                    continue;
                }
            }
            debug!(wait_ms = start.elapsed().as_millis() as u64, "reusing idle connection");
            return Ok(PooledConnection::new(conn, inner.clone(), permit));
        }

        // The permit is released on the error path when it goes out of scope.
        let conn = inner.driver.connect().await?;
        let size = inner.size.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            driver = inner.driver.name(),
            size,
            wait_ms = start.elapsed().as_millis() as u64,
            "opened physical connection"
        );
        Ok(PooledConnection::new(conn, inner.clone(), permit))
    }

    /// Returns a connection to the pool. Equivalent to dropping it.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Driver and product identity of the underlying database.
    pub async fn metadata(&self) -> Result<DatabaseMetadata, DbError> {
        let conn = self.acquire().await?;
        Ok(conn.metadata().clone())
    }

    pub fn status(&self) -> PoolStatus {
        let idle = self.inner.lock_idle().len();
        let size = self.inner.size.load(Ordering::Acquire);
        PoolStatus {
            max: self.inner.options.max_open_conns,
            size,
            idle,
            in_use: size.saturating_sub(idle),
        }
    }

    /// Closes idle connections and refuses further check-outs. Connections
    /// still checked out are discarded when released.
    pub async fn close(&self) -> Result<(), DbError> {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.permits.close();

        let idle = std::mem::take(&mut *self.inner.lock_idle());
        let mut first_err = None;
        for conn in idle {
            self.inner.size.fetch_sub(1, Ordering::AcqRel);
            if let Err(e) = conn.close().await {
                warn!(error = %e, "failed to close idle connection");
                first_err.get_or_insert(e);
            }
        }
        info!(driver = self.inner.driver.name(), "connection pool closed");
        first_err.map_or(Ok(()), Err)
    }
}

impl PoolInner {
    fn lock_idle(&self) -> MutexGuard<'_, Vec<Box<dyn Connection>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop_idle(&self) -> Option<Box<dyn Connection>> {
        self.lock_idle().pop()
    }

    fn put_back(&self, conn: Box<dyn Connection>, broken: bool) {
        if broken || self.closed.load(Ordering::Acquire) {
            let size = self.size.fetch_sub(1, Ordering::AcqRel).saturating_sub(1);
            if broken {
                warn!(size, "discarding broken connection");
            } else {
                debug!(size, "discarding connection released after close");
            }
            return;
        }
        self.lock_idle().push(conn);
    }
}

/// A checked-out connection. Dropping it returns the connection to the
/// pool, or discards it when it was marked broken.
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    broken: bool,
    pool: Arc<PoolInner>,
    // released after `conn` is back on the idle stack
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl PooledConnection {
    fn new(conn: Box<dyn Connection>, pool: Arc<PoolInner>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            conn: Some(conn),
            broken: false,
            pool,
            _permit: permit,
        }
    }

    /// Marks the physical connection unusable; it is discarded on release
    /// and a replacement is opened by a later acquire.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Marks the connection broken when `result` is a connection failure.
    pub(crate) fn observe<T>(&mut self, result: &Result<T, DbError>) {
        if let Err(e) = result {
            if e.is_connection_error() {
                self.broken = true;
            }
        }
    }
}

impl std::ops::Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_deref()
            .expect("BUG: PooledConnection used after release")
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_deref_mut()
            .expect("BUG: PooledConnection used after release")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn, self.broken);
        }
    }
}
