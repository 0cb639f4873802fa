#![cfg(feature = "sqlite")]

use serde::Deserialize;
use std::time::Duration;
use tempfile::TempDir;
use usql::{ConnectionPool, DbError, PoolOptions, Session, UpdateCount, batch_setter};

struct Fixture {
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
    session: Session,
}

async fn fixture(max_open_conns: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("usql.db").display());
    let options = PoolOptions::new(url)
        .max_open_conns(max_open_conns)
        .acquire_timeout(Duration::from_secs(2));
    let session = Session::new(ConnectionPool::connect(options).unwrap());
    session
        .batch_execute(&[
            "CREATE TABLE sys_role (role_id INTEGER PRIMARY KEY, role_name TEXT NOT NULL, deleted INTEGER NOT NULL DEFAULT 0)",
            "CREATE TABLE ana_group (group_id INTEGER PRIMARY KEY AUTOINCREMENT, user_id INTEGER NOT NULL, group_name TEXT NOT NULL)",
        ])
        .await
        .unwrap();
    Fixture { _dir: dir, session }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Role {
    role_id: i64,
    role_name: String,
    deleted: i32,
}

#[derive(Deserialize)]
struct Count {
    n: i64,
}

async fn role_count(session: &Session) -> i64 {
    session
        .query_one::<Count, _>("select count(*) as n from sys_role", &())
        .await
        .unwrap()
        .map(|c| c.n)
        .unwrap_or_default()
}

#[tokio::test]
async fn insert_with_literal_sql() {
    let f = fixture(2).await;
    let n = f
        .session
        .execute("insert into sys_role values (100, 'literal insert', 0)")
        .await
        .unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn insert_with_placeholders() {
    let f = fixture(2).await;
    let n = f
        .session
        .execute_params("insert into sys_role values (?, ?, ?)", &(100, "placeholder insert", 0))
        .await
        .unwrap();
    assert_eq!(n, 1);

    let role: Option<Role> = f
        .session
        .query_one("select * from sys_role where role_id = ?", &100)
        .await
        .unwrap();
    assert_eq!(
        role,
        Some(Role {
            role_id: 100,
            role_name: "placeholder insert".into(),
            deleted: 0
        })
    );
}

#[tokio::test]
async fn insert_with_statement_builder() {
    let f = fixture(2).await;
    let n = f
        .session
        .execute_with("insert into sys_role values (?, ?, ?)", |ps| {
            ps.bind(1, 100i32)?;
            ps.bind(2, "builder insert")?;
            ps.bind(3, 0i32)?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn literal_and_parameterized_inserts_agree() {
    let f = fixture(2).await;
    let literal = f
        .session
        .execute("insert into sys_role values (1, 'a', 0)")
        .await
        .unwrap();
    let bound = f
        .session
        .execute_params("insert into sys_role values (?, ?, ?)", &(2, "a", 0))
        .await
        .unwrap();
    assert_eq!(literal, bound);
}

#[tokio::test]
async fn insert_returns_auto_increment_key() {
    let f = fixture(2).await;
    let key = f
        .session
        .execute_for_key("insert into ana_group (user_id, group_name) values (?, ?)", |ps| {
            ps.bind(1, 100i32)?.bind(2, "named key column")?;
            ps.return_generated_keys(["group_id"]);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(key.rows_affected, 1);
    let first = key.key_as_i64().unwrap();
    assert!(first > 0);

    let key = f
        .session
        .execute_for_key("insert into ana_group (user_id, group_name) values (?, ?)", |ps| {
            ps.bind(1, 100i32)?.bind(2, "native key")?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(key.key_as_i64(), Some(first + 1));
}

#[tokio::test]
async fn key_is_returned_after_insert_into_another_table_on_same_connection() {
    let f = fixture(1).await;
    f.session
        .execute("insert into sys_role values (1, 'first role', 0)")
        .await
        .unwrap();

    let key = f
        .session
        .execute_for_key("insert into ana_group (user_id, group_name) values (?, ?)", |ps| {
            ps.bind(1, 1i32)?.bind(2, "first group")?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(key.rows_affected, 1);
    assert_eq!(key.key_as_i64(), Some(1));
    assert_eq!(f.session.pool().status().size, 1);
}

#[tokio::test]
async fn key_is_returned_inside_transaction_after_earlier_inserts() {
    let f = fixture(1).await;
    let mut tx = f.session.begin().await.unwrap();
    tx.execute_params("insert into sys_role values (?, ?, ?)", &(1, "tx role", 0))
        .await
        .unwrap();
    let key = tx
        .execute_for_key("insert into ana_group (user_id, group_name) values (?, ?)", |ps| {
            ps.bind(1, 1i32)?.bind(2, "tx group")?;
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(key.key_as_i64(), Some(1));

    let key = tx
        .execute_for_key("insert into ana_group (user_id, group_name) values (2, 'second')", |_| Ok(()))
        .await
        .unwrap();
    assert_eq!(key.key_as_i64(), Some(2));
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn update_without_insert_has_no_key() {
    let f = fixture(1).await;
    let err = f
        .session
        .execute_for_key("update ana_group set group_name = ?", |ps| {
            ps.bind(1, "renamed")?;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NoGeneratedKey(_)), "{err}");
}

#[tokio::test]
async fn batch_with_literal_sql() {
    let f = fixture(2).await;
    let counts = f
        .session
        .batch_execute(&["insert into sys_role values (101, 'batch 1', 0), (102, 'batch 2', 0)"])
        .await
        .unwrap();
    assert_eq!(counts, vec![UpdateCount::Rows(2)]);
    assert_eq!(role_count(&f.session).await, 2);
}

#[tokio::test]
async fn batch_with_placeholders() {
    let f = fixture(2).await;
    let counts = f
        .session
        .batch_execute_params(
            "insert into sys_role values (?, ?, ?)",
            &[(101, "batch 1", 0), (102, "batch 2", 0)],
        )
        .await
        .unwrap();
    assert_eq!(counts.len(), 2);
    assert!(counts.iter().all(|c| c.rows().unwrap_or_default() > 0));
}

#[tokio::test]
async fn batch_with_setter() {
    let f = fixture(2).await;
    let setter = batch_setter(2, |ps, i| {
        match i {
            0 => ps.bind(1, 101i32)?.bind(2, "setter 1")?,
            _ => ps.bind(1, 102i32)?.bind(2, "setter 2")?,
        };
        ps.bind(3, 0i32)?;
        Ok(())
    });
    let counts = f
        .session
        .batch_execute_with("insert into sys_role values (?, ?, ?)", &setter)
        .await
        .unwrap();
    assert_eq!(counts, vec![UpdateCount::Rows(1); 2]);

    let roles: Vec<Role> = f
        .session
        .query("select * from sys_role order by role_id", &())
        .await
        .unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.role_name.as_str()).collect();
    assert_eq!(names, ["setter 1", "setter 2"]);
}

#[tokio::test]
async fn failing_batch_entry_reports_completed_counts() {
    let f = fixture(1).await;
    let err = f
        .session
        .batch_execute_params(
            "insert into sys_role values (?, ?, ?)",
            &[(1, "first", 0), (1, "duplicate", 0), (2, "never run", 0)],
        )
        .await
        .unwrap_err();
    match err {
        DbError::Batch { counts, source } => {
            assert_eq!(counts, vec![UpdateCount::Rows(1)]);
            assert!(matches!(*source, DbError::ConstraintViolation(_)), "{source}");
        }
        other => panic!("unexpected error: {other}"),
    }
    // no implicit transaction: the first entry stays
    assert_eq!(role_count(&f.session).await, 1);
}

#[tokio::test]
async fn duplicate_key_is_a_constraint_violation() {
    let f = fixture(1).await;
    f.session
        .execute("insert into sys_role values (100, 'a', 0)")
        .await
        .unwrap();
    let err = f
        .session
        .execute("insert into sys_role values (100, 'b', 0)")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)), "{err}");
}

#[tokio::test]
async fn malformed_sql_is_a_syntax_error() {
    let f = fixture(1).await;
    let err = f.session.execute("insert into sys_role valuez (1)").await.unwrap_err();
    assert!(matches!(err, DbError::Syntax(_)), "{err}");

    // the connection survives statement errors
    assert_eq!(f.session.pool().status().size, 1);
}

#[tokio::test]
async fn binding_mismatch_is_rejected_before_execution() {
    let f = fixture(1).await;
    let err = f
        .session
        .execute_params("insert into sys_role values (?, ?, ?)", &(1, "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)), "{err}");

    let err = f
        .session
        .execute_with("insert into sys_role values (?, ?, ?)", |ps| {
            ps.bind(1, 1i32)?.bind(3, 0i32)?;
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)), "{err}");
    assert_eq!(role_count(&f.session).await, 0);
}

#[tokio::test]
async fn sequential_calls_on_single_connection_pool_never_block() {
    let f = fixture(1).await;
    for id in 0..20 {
        f.session
            .execute_params("insert into sys_role values (?, ?, 0)", &(id, "cycle"))
            .await
            .unwrap();
    }
    let status = f.session.pool().status();
    assert_eq!(status.size, 1);
    assert_eq!(status.in_use, 0);
    assert_eq!(role_count(&f.session).await, 20);
}

#[tokio::test]
async fn committed_transaction_is_visible() {
    let f = fixture(2).await;
    let mut tx = f.session.begin().await.unwrap();
    tx.execute_params("insert into sys_role values (?, ?, ?)", &(1, "tx", 0))
        .await
        .unwrap();
    let key = tx
        .execute_for_key("insert into ana_group (user_id, group_name) values (1, 'tx group')", |_| Ok(()))
        .await
        .unwrap();
    assert!(key.key_as_i64().unwrap() > 0);
    tx.commit().await.unwrap();

    assert_eq!(role_count(&f.session).await, 1);
}

#[tokio::test]
async fn rolled_back_transaction_leaves_no_rows() {
    let f = fixture(2).await;
    let mut tx = f.session.begin().await.unwrap();
    tx.batch_execute_params("insert into sys_role values (?, ?, ?)", &[(1, "a", 0), (2, "b", 0)])
        .await
        .unwrap();
    let inside: Vec<Role> = tx.query("select * from sys_role", &()).await.unwrap();
    assert_eq!(inside.len(), 2);
    tx.rollback().await.unwrap();

    assert_eq!(role_count(&f.session).await, 0);
}

#[tokio::test]
async fn dropped_transaction_is_not_committed() {
    let f = fixture(1).await;
    {
        let mut tx = f.session.begin().await.unwrap();
        tx.execute("insert into sys_role values (1, 'lost', 0)").await.unwrap();
    }
    assert_eq!(f.session.pool().status().size, 0);
    assert_eq!(role_count(&f.session).await, 0);
}

#[tokio::test]
async fn query_one_rejects_multiple_rows() {
    let f = fixture(1).await;
    f.session
        .execute("insert into sys_role values (1, 'a', 0), (2, 'b', 0)")
        .await
        .unwrap();
    assert!(
        f.session
            .query_one::<Role, _>("select * from sys_role", &())
            .await
            .is_err()
    );
    let none: Option<Role> = f
        .session
        .query_one("select * from sys_role where role_id = ?", &99)
        .await
        .unwrap();
    assert!(none.is_none());
}
