mod common;

use common::{user_row, MockDatabase, User};
use sqlinq_data::{DataError, ErrorKind, Projectable, Repository, UnitOfWork, UnitOfWorkState};

#[tokio::test]
async fn test_run_in_transaction_commits_and_routes_through_tx() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());
    let users = &users;
    let uow = UnitOfWork::new(db.shared());

    let affected = uow
        .run_in_transaction(|tx| async move {
            let scoped = users.with_unit_of_work(&tx);
            scoped.create(&User::new(0, "alice", 30)).await
        })
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(uow.status().await, UnitOfWorkState::Closed);

    let log = db.log();
    let steps: Vec<(&str, bool)> = log.iter().map(|r| (r.sql.as_str(), r.in_tx)).collect();
    assert_eq!(
        steps,
        vec![
            ("BEGIN", false),
            ("INSERT INTO users (name, age) VALUES (?, ?)", true),
            ("COMMIT", true),
        ]
    );
}

#[tokio::test]
async fn test_error_in_body_rolls_back() {
    let db = MockDatabase::new();
    let uow = UnitOfWork::new(db.shared());

    let err = uow
        .run_in_transaction(|_tx| async { Err::<(), _>(DataError::configuration("boom")) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(db.sql(), vec!["BEGIN".to_string(), "ROLLBACK".to_string()]);
}

#[tokio::test]
async fn test_failed_rollback_keeps_original_error() {
    let db = MockDatabase::new();
    db.fail_rollback();
    let uow = UnitOfWork::new(db.shared());

    let err = uow
        .run_in_transaction(|_tx| async { Err::<(), _>(DataError::configuration("boom")) })
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::RollbackFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_panic_in_body_rolls_back_and_resumes() {
    let db = MockDatabase::new();
    let uow = UnitOfWork::new(db.shared());

    let task = {
        let uow = uow.clone();
        tokio::spawn(async move {
            uow.run_in_transaction(|_tx| async {
                if uow_should_panic() {
                    panic!("boom");
                }
                Ok::<(), DataError>(())
            })
            .await
        })
    };
    let joined = task.await;
    assert!(joined.unwrap_err().is_panic());
    assert_eq!(db.sql(), vec!["BEGIN".to_string(), "ROLLBACK".to_string()]);
    assert_eq!(uow.status().await, UnitOfWorkState::Closed);
}

fn uow_should_panic() -> bool {
    true
}

#[tokio::test]
async fn test_lifecycle_violations_are_invalid_state() {
    let db = MockDatabase::new();
    let uow = UnitOfWork::new(db.shared());

    assert_eq!(uow.commit().await.unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(uow.status().await, UnitOfWorkState::Unattached);

    uow.begin().await.unwrap();
    assert_eq!(uow.begin().await.unwrap_err().kind(), ErrorKind::InvalidState);
    uow.commit().await.unwrap();

    // closed is terminal
    assert_eq!(uow.begin().await.unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(uow.rollback().await.unwrap_err().kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_attached_repository_fails_after_close() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());
    let uow = UnitOfWork::new(db.shared());
    let scoped = users.with_unit_of_work(&uow);

    // not begun yet
    let err = scoped.create(&User::new(0, "a", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    uow.begin().await.unwrap();
    scoped.create(&User::new(0, "a", 1)).await.unwrap();
    uow.commit().await.unwrap();

    let err = scoped.find_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_with_unit_of_work_leaves_original_untouched() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());
    let uow = UnitOfWork::new(db.shared());
    uow.begin().await.unwrap();

    let scoped = users.with_unit_of_work(&uow);
    assert!(users.unit_of_work().is_none());
    assert!(scoped.unit_of_work().unwrap().same_as(&uow));

    users.create(&User::new(0, "direct", 1)).await.unwrap();
    scoped.create(&User::new(0, "scoped", 2)).await.unwrap();
    uow.rollback().await.unwrap();

    let routed: Vec<bool> = db
        .log()
        .into_iter()
        .filter(|r| r.sql.starts_with("INSERT"))
        .map(|r| r.in_tx)
        .collect();
    assert_eq!(routed, vec![false, true]);
}

#[tokio::test]
async fn test_single_row_reads_use_query_one_inside_transaction() {
    let db = MockDatabase::new();
    let users = Repository::<User>::new(db.shared());
    let uow = UnitOfWork::new(db.shared());
    uow.begin().await.unwrap();
    let scoped = users.with_unit_of_work(&uow);

    db.push_rows(vec![user_row(1, "alice", 30), user_row(2, "bob", 31)]);
    let first = scoped.query().first_or_default().await.unwrap();
    assert_eq!(first, Some(User::new(1, "alice", 30)));

    db.push_scalar("name", "alice");
    let name: String = scoped.query().select(["name"]).scan().await.unwrap();
    assert_eq!(name, "alice");
    uow.commit().await.unwrap();

    assert_eq!(db.single_row_queries(), 2);
    let log = db.log();
    assert_eq!(log[1].sql, "SELECT id, name, age FROM users LIMIT 1");
    assert_eq!(log[2].sql, "SELECT name FROM users LIMIT 1");
    assert!(log[1].in_tx && log[2].in_tx);
}
