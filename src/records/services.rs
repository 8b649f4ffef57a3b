use std::collections::HashMap;

use sqlx::PgPool;
use time::Date;
use tracing::info;

use super::repo;
use super::repo_types::{Record, RecordDetails, RecordItem, RecordView};
use crate::error::{AppError, AppResult};

fn check_weight(weight: i32) -> AppResult<()> {
    if weight <= 0 {
        return Err(AppError::Validation("weight must be a positive number of grams".into()));
    }
    Ok(())
}

fn record_not_found() -> AppError {
    AppError::not_found("Record not found")
}

fn product_not_found(product_id: i64) -> AppError {
    AppError::not_found(format!("Product with ID {product_id} not found"))
}

async fn with_items(db: &PgPool, records: Vec<Record>) -> AppResult<Vec<RecordDetails>> {
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    let mut by_record: HashMap<i64, Vec<RecordItem>> = HashMap::new();
    for row in repo::items_for(db, &ids).await? {
        let (record_id, item) = row.into_item();
        by_record.entry(record_id).or_default().push(item);
    }

    Ok(records
        .into_iter()
        .map(|record| RecordDetails {
            products: by_record.remove(&record.id).unwrap_or_default(),
            record,
        })
        .collect())
}

/// Record and its product row are written in one transaction.
pub async fn create(db: &PgPool, user_id: i64, product_id: i64, weight: i32) -> AppResult<RecordDetails> {
    check_weight(weight)?;

    let mut tx = db.begin().await?;
    let product = repo::product_for_share(&mut tx, product_id)
        .await?
        .ok_or_else(|| product_not_found(product_id))?;

    let record = repo::insert_record(&mut tx, user_id).await?;
    repo::insert_item(&mut tx, record.id, product.id, weight).await?;
    tx.commit().await?;

    info!(record_id = record.id, user_id, product_id, weight, "record created");
    Ok(RecordDetails {
        record,
        products: vec![RecordItem { product, weight }],
    })
}

/// Records of other users are reported exactly like missing ones.
pub async fn get_by_id(db: &PgPool, record_id: i64, user_id: i64) -> AppResult<RecordDetails> {
    let record = repo::find_owned(db, record_id, user_id)
        .await?
        .ok_or_else(record_not_found)?;
    let mut details = with_items(db, vec![record]).await?;
    details.pop().ok_or_else(record_not_found)
}

pub async fn list_all(db: &PgPool, user_id: i64) -> AppResult<Vec<RecordDetails>> {
    let records = repo::list_by_user(db, user_id).await?;
    with_items(db, records).await
}

/// An empty day is an error, not an empty list.
pub async fn list_by_date(db: &PgPool, day: Date, user_id: i64) -> AppResult<Vec<RecordView>> {
    let views = repo::views_by_date(db, user_id, day).await?;
    if views.is_empty() {
        return Err(AppError::not_found(format!("No records found for {day}")));
    }
    Ok(views)
}

/// Swaps the record's single product row for the new product and weight.
pub async fn update(
    db: &PgPool,
    record_id: i64,
    product_id: i64,
    weight: i32,
    user_id: i64,
) -> AppResult<RecordDetails> {
    check_weight(weight)?;

    let mut tx = db.begin().await?;
    repo::owned_for_update(&mut tx, record_id, user_id)
        .await?
        .ok_or_else(record_not_found)?;
    let product = repo::product_for_share(&mut tx, product_id)
        .await?
        .ok_or_else(|| product_not_found(product_id))?;

    repo::delete_items(&mut tx, record_id).await?;
    repo::insert_item(&mut tx, record_id, product.id, weight).await?;
    let record = repo::touch(&mut tx, record_id).await?;
    tx.commit().await?;

    info!(record_id, user_id, product_id, weight, "record updated");
    Ok(RecordDetails {
        record,
        products: vec![RecordItem { product, weight }],
    })
}

/// Product rows go first, then the record, all or nothing.
pub async fn delete(db: &PgPool, record_id: i64, user_id: i64) -> AppResult<()> {
    let mut tx = db.begin().await?;
    repo::owned_for_update(&mut tx, record_id, user_id)
        .await?
        .ok_or_else(record_not_found)?;

    let items = repo::delete_items(&mut tx, record_id).await?;
    repo::delete_record(&mut tx, record_id).await?;
    tx.commit().await?;

    info!(record_id, user_id, items, "record deleted");
    Ok(())
}


/// Postgres-backed checks; run with `cargo test -- --ignored` and a `DATABASE_URL`.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::auth::repo::NewUser;
    use crate::auth::repo_types::User;
    use crate::products::repo as products;
    use time::OffsetDateTime;

    async fn seed_user(db: &PgPool, name: &str) -> User {
        User::create(
            db,
            NewUser {
                username: name,
                email: &format!("{name}@x.com"),
                hashed_password: "hash",
                weight: 80.0,
                height: 180,
                target_weight: 75.0,
                time_frame: 6,
            },
        )
        .await
        .unwrap()
    }

    async fn record_count(db: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM record")
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn item_count(db: &PgPool, record_id: i64) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM recordproduct WHERE records_id = $1")
            .bind(record_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn create_with_unknown_product_leaves_no_record(db: PgPool) {
        let user = seed_user(&db, "alice").await;

        let err = create(&db, user.id, 9999, 150).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(record_count(&db).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn create_then_get_returns_single_product(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();

        let created = create(&db, user.id, apple.id, 150).await.unwrap();
        assert_eq!(created.record.created, created.record.updated);

        let fetched = get_by_id(&db, created.record.id, user.id).await.unwrap();
        assert_eq!(fetched.products.len(), 1);
        assert_eq!(fetched.products[0].product, apple);
        assert_eq!(fetched.products[0].weight, 150);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn other_users_records_are_not_found(db: PgPool) {
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let rec = create(&db, alice.id, apple.id, 100).await.unwrap();

        assert!(matches!(get_by_id(&db, rec.record.id, bob.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            update(&db, rec.record.id, apple.id, 5, bob.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete(&db, rec.record.id, bob.id).await, Err(AppError::NotFound(_))));
        assert!(list_all(&db, bob.id).await.unwrap().is_empty());
        assert_eq!(item_count(&db, rec.record.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn update_replaces_rather_than_accumulates(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let pear = products::insert(&db, "Pear", "Fruit", 57, None).await.unwrap();
        let rec = create(&db, user.id, apple.id, 100).await.unwrap();

        update(&db, rec.record.id, pear.id, 200, user.id).await.unwrap();
        let last = update(&db, rec.record.id, apple.id, 300, user.id).await.unwrap();
        assert!(last.record.updated > rec.record.updated);

        let fetched = get_by_id(&db, rec.record.id, user.id).await.unwrap();
        assert_eq!(fetched.products.len(), 1);
        assert_eq!(fetched.products[0].product.id, apple.id);
        assert_eq!(fetched.products[0].weight, 300);
        assert_eq!(item_count(&db, rec.record.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn update_with_unknown_product_keeps_old_item(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let rec = create(&db, user.id, apple.id, 100).await.unwrap();

        let err = update(&db, rec.record.id, 9999, 10, user.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let fetched = get_by_id(&db, rec.record.id, user.id).await.unwrap();
        assert_eq!(fetched.products[0].weight, 100);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn delete_removes_record_and_items(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let rec = create(&db, user.id, apple.id, 100).await.unwrap();
        let today = OffsetDateTime::now_utc().date();

        delete(&db, rec.record.id, user.id).await.unwrap();

        assert_eq!(item_count(&db, rec.record.id).await, 0);
        assert!(matches!(get_by_id(&db, rec.record.id, user.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(list_by_date(&db, today, user.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(delete(&db, rec.record.id, user.id).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn list_by_date_matches_calendar_day(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, Some("static/apple.png"))
            .await
            .unwrap();
        let rec = create(&db, user.id, apple.id, 150).await.unwrap();
        let today = OffsetDateTime::now_utc().date();

        let views = list_by_date(&db, today, user.id).await.unwrap();
        assert_eq!(
            views,
            vec![RecordView {
                name: "Apple".into(),
                image: Some("static/apple.png".into()),
                product_calory: 52,
                weight: 150,
                record_id: rec.record.id,
            }]
        );

        let yesterday = today.previous_day().unwrap();
        assert!(matches!(list_by_date(&db, yesterday, user.id).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn list_all_carries_products(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let pear = products::insert(&db, "Pear", "Fruit", 57, None).await.unwrap();
        create(&db, user.id, apple.id, 100).await.unwrap();
        create(&db, user.id, pear.id, 200).await.unwrap();

        let all = list_all(&db, user.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.products.len() == 1));
        assert_eq!(all[1].products[0].product.name, "Pear");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn deleting_a_user_takes_their_records(db: PgPool) {
        let user = seed_user(&db, "alice").await;
        let apple = products::insert(&db, "Apple", "Fruit", 52, None).await.unwrap();
        let rec = create(&db, user.id, apple.id, 100).await.unwrap();

        crate::auth::services::delete(&db, user.id).await.unwrap();
        assert_eq!(record_count(&db).await, 0);
        assert_eq!(item_count(&db, rec.record.id).await, 0);
    }
}
