mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{user_row, Flag, MockDatabase, User};
use sqlinq_data::log::{QueryEvent, QueryLogger};
use sqlinq_data::prelude::*;
use sqlinq_data::{CancelReason, Cancellation, DataConfig, Dialect, ErrorKind, Row};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingLogger {
    events: Mutex<Vec<(String, bool)>>,
}

impl QueryLogger for RecordingLogger {
    fn log(&self, event: &QueryEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.sql.to_string(), event.error.is_some()));
    }
}

#[tokio::test]
async fn test_find_by_key_and_table_override() {
    let db = MockDatabase::new();
    db.push_rows(vec![user_row(3, "carol", 41)]);
    db.push_scalar("count", 0);
    let users = Repository::<User>::new(db.shared());

    let found = users.find_by_key(3).await.unwrap();
    assert_eq!(found, Some(User::new(3, "carol", 41)));

    let archived = users.clone().with_table("users_2024");
    assert_eq!(archived.table(), "users_2024");
    assert_eq!(archived.count().await.unwrap(), 0);

    assert_eq!(
        db.sql(),
        vec![
            "SELECT id, name, age FROM users WHERE id = ? LIMIT 1".to_string(),
            "SELECT COUNT(*) FROM users_2024".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_update_matches_on_key() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());

    users.update(&User::new(7, "dave", 50)).await.unwrap();
    let log = db.log();
    assert_eq!(log[0].sql, "UPDATE users SET name = ?, age = ? WHERE id = ?");
    assert_eq!(log[0].args, vec![Value::from("dave"), Value::Int(50), Value::Int(7)]);
}

#[tokio::test]
async fn test_update_fields_by_id_and_ids() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());

    users
        .update_fields_by_id(5, Assignments::new().set("age", 31))
        .await
        .unwrap();
    let none = users
        .update_fields_by_ids(Vec::<i64>::new(), Assignments::new().set("age", 1))
        .await
        .unwrap();
    assert_eq!(none, 0);
    users
        .update_fields_by_ids([1, 2], Assignments::new().set_raw("age", "age + ?", [1]))
        .await
        .unwrap();

    assert_eq!(
        db.sql(),
        vec![
            "UPDATE users SET age = ? WHERE id = ?".to_string(),
            "UPDATE users SET age = age + ? WHERE id IN (?, ?)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_mass_mutations_refuse_empty_conditions() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());

    let err = users.batch_delete(Cond::all([])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let err = users
        .update_by_condition(Cond::all([]), &User::new(1, "x", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let err = users
        .update_fields_by_condition(Cond::raw("  ", Vec::<i64>::new()), Assignments::new().set("age", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(db.log().is_empty());

    users.batch_delete(col("age").lt(18)).await.unwrap();
    assert_eq!(db.sql(), vec!["DELETE FROM users WHERE age < ?".to_string()]);
}

#[tokio::test]
async fn test_create_returning_id_uses_last_insert_id() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());

    let mut user = User::new(0, "erin", 22);
    let id = users.create_returning_id(&mut user).await.unwrap();
    assert_eq!(id, 100);
    assert_eq!(user.id, 100);
}

#[tokio::test]
async fn test_create_returning_id_on_postgres_reads_returning_row() {
    let db = MockDatabase::with_dialect(Dialect::Postgres);
    db.push_rows(vec![Row::from_pairs([("id", 7)])]);
    let users = Repository::<User>::new(db.shared());

    let mut user = User::new(0, "erin", 22);
    assert_eq!(users.create_returning_id(&mut user).await.unwrap(), 7);
    assert_eq!(user.id, 7);
    assert_eq!(db.sql(), vec!["INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id".to_string()]);
}

#[tokio::test]
async fn test_create_returning_id_rejects_key_that_does_not_fit() {
    let db = MockDatabase::with_dialect(Dialect::Postgres);
    db.push_rows(vec![Row::from_pairs([("id", 1000)])]);
    let flags = Repository::<Flag>::new(db.shared());

    let mut flag = Flag {
        id: 0,
        name: "beta".into(),
    };
    let err = flags.create_returning_id(&mut flag).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert_eq!(flag.id, 0);
}

#[tokio::test]
async fn test_batch_create_is_a_single_statement() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());

    let rows: Vec<User> = (0..3).map(|i| User::new(0, "u", i)).collect();
    assert_eq!(users.batch_create(&rows).await.unwrap(), 3);
    assert_eq!(db.log().len(), 1);
}

#[tokio::test]
async fn test_config_applies_policy_and_batch_defaults() {
    let db = MockDatabase::new();
    let config = DataConfig::from_yaml_str("identifier_policy: quote\nbatch:\n  batch_size: 2\n").unwrap();
    let users = Repository::<User>::new(db.shared()).with_config(&config);

    assert_eq!(users.insert_options().batch_size, 2);
    assert_eq!(users.to_sql().unwrap().sql, r#"SELECT "id", "name", "age" FROM "users""#);
}

#[tokio::test]
async fn test_logger_sees_every_statement() {
    let db = MockDatabase::new();
    db.fail_execute_at(1);
    let logger = Arc::new(RecordingLogger::default());
    let users = Repository::<User>::new(db.shared()).with_logger(logger.clone());

    users.create(&User::new(0, "a", 1)).await.unwrap();
    users.create(&User::new(0, "b", 2)).await.unwrap_err();

    let events = logger.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert!(!events[0].1);
    assert!(events[1].1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_slow_statement() {
    let db = MockDatabase::new().with_delay(Duration::from_secs(10));
    let users = Repository::<User>::new(db.shared()).with_timeout(Duration::from_millis(50));

    let err = users.find_all().await.unwrap_err();
    assert!(matches!(err, DataError::Cancelled(CancelReason::Deadline)));
}

#[tokio::test]
async fn test_fired_token_cancels_before_sending() {
    let db = MockDatabase::new();
    let token = CancellationToken::new();
    token.cancel();
    let users = Repository::<User>::new(db.shared()).with_cancellation(Cancellation::none().token(token));

    let err = users.create(&User::new(0, "a", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(db.log().is_empty());
}

#[tokio::test]
async fn test_trait_facets_delegate() {
    async fn total<R: ReadRepository<User>>(repo: &R) -> u64 {
        repo.count().await.unwrap()
    }

    let db = MockDatabase::new();
    db.push_scalar("count", 4);
    let users = Repository::<User>::new(db.shared());
    assert_eq!(total(&users).await, 4);
}
