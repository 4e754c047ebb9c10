mod common;

use common::{AuditEntry, MockDatabase, User};
use sqlinq_data::{col, BatchInsertOptions, BatchUpdateOptions, ErrorKind, Repository, Value};

fn users(n: i64) -> Vec<User> {
    (1..=n).map(|i| User::new(i, &format!("user{i}"), 20 + i)).collect()
}

#[tokio::test]
async fn test_batch_insert_splits_into_windows() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    let affected = repo
        .batch_insert(&users(5), &BatchInsertOptions::new().batch_size(2))
        .await
        .unwrap();
    assert_eq!(affected, 5);

    let log = db.log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].sql, "INSERT INTO users (name, age) VALUES (?, ?), (?, ?)");
    assert_eq!(log[2].sql, "INSERT INTO users (name, age) VALUES (?, ?)");
    assert_eq!(log[2].args, vec![Value::from("user5"), Value::Int(25)]);
}

#[tokio::test]
async fn test_batch_insert_caps_window_at_param_budget() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    // 10 params * 80% / 2 fields = 4 rows per statement
    let options = BatchInsertOptions::new().batch_size(1000).param_budget(10);
    repo.batch_insert(&users(9), &options).await.unwrap();

    let sizes: Vec<usize> = db.log().iter().map(|r| r.args.len() / 2).collect();
    assert_eq!(sizes, vec![4, 4, 1]);
}

#[tokio::test]
async fn test_batch_insert_empty_is_noop() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    assert_eq!(repo.batch_insert(&[], &BatchInsertOptions::new()).await.unwrap(), 0);
    assert!(db.log().is_empty());
}

#[tokio::test]
async fn test_batch_insert_rejects_zero_batch_size() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    let err = repo
        .batch_insert(&users(3), &BatchInsertOptions::new().batch_size(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(db.log().is_empty());
}

#[tokio::test]
async fn test_batch_insert_reports_failing_window_offset() {
    let db = MockDatabase::new();
    db.fail_execute_at(1);
    let repo = Repository::<User>::new(db.shared());

    let err = repo
        .batch_insert(&users(5), &BatchInsertOptions::new().batch_size(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.batch_offset(), Some(2));
    // the third window is never sent
    assert_eq!(db.log().len(), 2);
}

#[tokio::test]
async fn test_batch_update_statement_shape() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    let affected = repo
        .batch_update(&users(2), &BatchUpdateOptions::new())
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let log = db.log();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0].sql,
        "UPDATE users SET name = CASE id WHEN ? THEN ? WHEN ? THEN ? END, \
         age = CASE id WHEN ? THEN ? WHEN ? THEN ? END WHERE id IN (?, ?)"
    );
    assert_eq!(
        log[0].args,
        vec![
            Value::Int(1),
            Value::from("user1"),
            Value::Int(2),
            Value::from("user2"),
            Value::Int(1),
            Value::Int(21),
            Value::Int(2),
            Value::Int(22),
            Value::Int(1),
            Value::Int(2),
        ]
    );
}

#[tokio::test]
async fn test_batch_update_selected_fields_and_extra_filter() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    let options = BatchUpdateOptions::new()
        .fields(["age"])
        .batch_size(2)
        .additional_where(col("name").ne("root"));
    repo.batch_update(&users(3), &options).await.unwrap();

    let sql = db.sql();
    assert_eq!(sql.len(), 2);
    assert_eq!(
        sql[0],
        "UPDATE users SET age = CASE id WHEN ? THEN ? WHEN ? THEN ? END WHERE id IN (?, ?) AND name != ?"
    );
    assert_eq!(
        sql[1],
        "UPDATE users SET age = CASE id WHEN ? THEN ? END WHERE id IN (?) AND name != ?"
    );
}

#[tokio::test]
async fn test_batch_update_rejects_key_only_fields() {
    let db = MockDatabase::new();
    let repo = Repository::<User>::new(db.shared());

    let err = repo
        .batch_update(&users(2), &BatchUpdateOptions::new().fields(["id"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_batch_update_failure_offset() {
    let db = MockDatabase::new();
    db.fail_execute_at(2);
    let repo = Repository::<User>::new(db.shared());

    let err = repo
        .batch_update(&users(7), &BatchUpdateOptions::new().batch_size(3))
        .await
        .unwrap_err();
    assert_eq!(err.batch_offset(), Some(6));
}

#[tokio::test]
async fn test_batch_update_without_key_is_configuration_error() {
    let db = MockDatabase::new();
    let repo = Repository::<AuditEntry>::new(db.shared());
    let entries = vec![AuditEntry {
        event: "login".into(),
        at: 1,
    }];

    let err = repo
        .batch_update(&entries, &BatchUpdateOptions::new().fields(["event"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(db.log().is_empty());

    // an explicit key makes the same entity updatable
    let affected = repo
        .batch_update(&entries, &BatchUpdateOptions::new().key("at").fields(["event"]))
        .await
        .unwrap();
    assert_eq!(affected, 1);
}
