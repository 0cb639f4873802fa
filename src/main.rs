use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use usql::{ConnectionPool, DatabaseType, PoolOptions, Session, batch_setter};

#[derive(Deserialize, Debug)]
struct Role {
    role_id: i64,
    role_name: String,
    deleted: i32,
}

const SQLITE_DDL: [&str; 4] = [
    "DROP TABLE IF EXISTS sys_role",
    "CREATE TABLE sys_role (role_id INTEGER PRIMARY KEY, role_name TEXT NOT NULL, deleted INTEGER NOT NULL DEFAULT 0)",
    "DROP TABLE IF EXISTS ana_group",
    "CREATE TABLE ana_group (group_id INTEGER PRIMARY KEY AUTOINCREMENT, user_id INTEGER NOT NULL, group_name TEXT NOT NULL)",
];

const MYSQL_DDL: [&str; 4] = [
    "DROP TABLE IF EXISTS sys_role",
    "CREATE TABLE sys_role (role_id BIGINT PRIMARY KEY, role_name VARCHAR(64) NOT NULL, deleted INT NOT NULL DEFAULT 0)",
    "DROP TABLE IF EXISTS ana_group",
    "CREATE TABLE ana_group (group_id BIGINT AUTO_INCREMENT PRIMARY KEY, user_id BIGINT NOT NULL, group_name VARCHAR(64) NOT NULL)",
];

/// Walks through every execution shape against `DATABASE_URL`
/// (default `sqlite://usql-demo.db`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = if std::env::var_os("DATABASE_URL").is_some() {
        PoolOptions::from_env()?
    } else {
        PoolOptions::new("sqlite://usql-demo.db")
    };
    let pool = ConnectionPool::connect(options)?;
    let metadata = pool.metadata().await?;
    info!(
        driver = %metadata.driver_name,
        product = %metadata.product_name,
        version = %metadata.product_version,
        "connected"
    );

    let session = Session::new(pool.clone());
    let ddl = match pool.database_type() {
        DatabaseType::MySql => MYSQL_DDL,
        DatabaseType::Sqlite => SQLITE_DDL,
    };
    session.batch_execute(&ddl).await?;

    let n = session
        .execute("insert into sys_role values (100, 'literal insert', 0)")
        .await?;
    info!(affected = n, "literal insert");

    let n = session
        .execute_params("insert into sys_role values (?, ?, ?)", &(200, "placeholder insert", 0))
        .await?;
    info!(affected = n, "parameterized insert");

    let n = session
        .execute_with("insert into sys_role values (?, ?, ?)", |ps| {
            ps.bind(1, 300i64)?.bind(2, "builder insert")?.bind(3, 0i32)?;
            Ok(())
        })
        .await?;
    info!(affected = n, "builder insert");

    let key = session
        .execute_for_key("insert into ana_group (user_id, group_name) values (?, ?)", |ps| {
            ps.bind(1, 100i64)?.bind(2, "demo group")?;
            ps.return_generated_keys(["group_id"]);
            Ok(())
        })
        .await?;
    info!(affected = key.rows_affected, key = ?key.key, "insert returning key");

    let counts = session
        .batch_execute(&["insert into sys_role values (101, 'batch 1', 0), (102, 'batch 2', 0)"])
        .await?;
    info!(?counts, "literal batch");

    let counts = session
        .batch_execute_params(
            "insert into sys_role values (?, ?, ?)",
            &[(201, "row 1", 0), (202, "row 2", 0)],
        )
        .await?;
    info!(?counts, "parameterized batch");

    let names = ["setter 1", "setter 2"];
    let setter = batch_setter(names.len(), |ps, i| {
        ps.bind(1, 301 + i as i64)?.bind(2, names[i])?.bind(3, 0i32)?;
        Ok(())
    });
    let counts = session
        .batch_execute_with("insert into sys_role values (?, ?, ?)", &setter)
        .await?;
    info!(?counts, "setter batch");

    let mut tx = session.begin().await?;
    tx.execute_params("delete from sys_role where role_id >= ?", &300).await?;
    tx.rollback().await?;

    let roles: Vec<Role> = session
        .query("select role_id, role_name, deleted from sys_role order by role_id", &())
        .await?;
    for role in &roles {
        info!(id = role.role_id, name = %role.role_name, deleted = role.deleted, "role");
    }

    pool.close().await?;
    Ok(())
}
