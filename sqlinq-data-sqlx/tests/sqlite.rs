use std::sync::Arc;

use sqlinq_data::prelude::*;
use sqlinq_data::{Database, DataError, Statement, UnitOfWork};
use sqlinq_data_sqlx::SqlxDatabase;
use sqlx::Sqlite;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Entity)]
#[entity(table = "people")]
struct Person {
    #[column(generated)]
    id: i64,
    name: String,
    age: i64,
    #[column(name = "mail")]
    email: Option<String>,
}

impl Person {
    fn new(name: &str, age: i64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            age,
            email: None,
        }
    }
}

/// A fresh file-backed database with the `people` table. The directory
/// must outlive the pool.
async fn setup() -> (TempDir, Arc<SqlxDatabase<Sqlite>>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let db = SqlxDatabase::<Sqlite>::connect(&url).await.unwrap();
    db.execute(&Statement::new(
        "CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER NOT NULL, mail TEXT)",
        vec![],
    ))
    .await
    .unwrap();
    (dir, Arc::new(db))
}

#[tokio::test]
async fn test_create_and_query() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());

    people.create(&Person::new("alice", 30)).await.unwrap();
    people.create(&Person::new("bob", 25)).await.unwrap();

    let adults = people.query().filter(col("age").gte(28)).to_list().await.unwrap();
    assert_eq!(adults.len(), 1);
    assert_eq!(adults[0].name, "alice");
    assert_eq!(adults[0].email, None);
    assert!(adults[0].id > 0);

    assert_eq!(people.count().await.unwrap(), 2);
    assert_eq!(people.query().average("age").await.unwrap(), Some(27.5));
}

#[tokio::test]
async fn test_paging_over_sqlite() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());

    let rows: Vec<Person> = (1..=25).map(|i| Person::new(&format!("p{i:02}"), i)).collect();
    assert_eq!(people.batch_insert(&rows, &BatchInsertOptions::new().batch_size(10)).await.unwrap(), 25);

    let page = people.query().order_by(["age"]).to_paged_list(2, 10, None).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    let ages: Vec<i64> = page.items.iter().map(|p| p.age).collect();
    assert_eq!(ages, (11..=20).collect::<Vec<_>>());

    let last = people.find_page(&Pageable::new(3, 10).sorted("age desc")).await.unwrap();
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.items[0].age, 5);
    assert!(!last.has_next());
}

#[tokio::test]
async fn test_transaction_commit_and_rollback_visibility() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());
    let people = &people;

    UnitOfWork::new(db.clone())
        .run_in_transaction(|tx| async move {
            people.with_unit_of_work(&tx).create(&Person::new("kept", 40)).await
        })
        .await
        .unwrap();
    assert_eq!(people.count().await.unwrap(), 1);

    let err = UnitOfWork::new(db.clone())
        .run_in_transaction(|tx| async move {
            people.with_unit_of_work(&tx).create(&Person::new("dropped", 41)).await?;
            Err::<(), _>(DataError::configuration("abort"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Configuration(_)));

    let names: Vec<String> = people.query().select(["name"]).to_vec().await.unwrap();
    assert_eq!(names, vec!["kept".to_string()]);
}

#[tokio::test]
async fn test_batch_update_and_grouping() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());

    for (name, age) in [("ann", 30), ("ann", 31), ("ben", 40)] {
        people.create(&Person::new(name, age)).await.unwrap();
    }
    let mut all = people.query().order_by(["id"]).to_list().await.unwrap();
    for p in &mut all {
        p.age += 1;
    }
    let updated = people
        .batch_update(&all, &BatchUpdateOptions::new().fields(["age"]))
        .await
        .unwrap();
    assert_eq!(updated, 3);

    let counts = people.query().group_by("name").count().await.unwrap();
    assert_eq!(counts[&Value::from("ann")], 2);
    assert_eq!(counts[&Value::from("ben")], 1);

    let sums = people.query().group_by("name").sum("age").await.unwrap();
    assert_eq!(sums[&Value::from("ann")], 63.0);
}

#[tokio::test]
async fn test_create_returning_id_assigns_rowid() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());

    let mut first = Person::new("a", 1);
    let mut second = Person::new("b", 2);
    let id1 = people.create_returning_id(&mut first).await.unwrap();
    let id2 = people.create_returning_id(&mut second).await.unwrap();
    assert_eq!(first.id, id1);
    assert_eq!(id2, id1 + 1);

    let found = people.find_by_key(id2).await.unwrap().unwrap();
    assert_eq!(found, second);
}

#[tokio::test]
async fn test_decode_error_is_schema_error() {
    let (_dir, db) = setup().await;
    let people = Repository::<Person>::new(db.clone());
    people.create(&Person::new("alice", 30)).await.unwrap();

    let err = people.query().select(["name"]).scan::<i64>().await.unwrap_err();
    assert_eq!(err.kind(), sqlinq_data::ErrorKind::Schema);
}
