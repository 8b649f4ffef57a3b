use sqlx::{PgPool, Postgres, Transaction};
use time::Date;

use super::repo_types::{Record, RecordItemRow, RecordView};
use crate::products::repo_types::Product;

type Tx<'c> = Transaction<'c, Postgres>;

// ---- Writes (inside a transaction) ----

/// Locks the product against deletion until the transaction ends.
pub async fn product_for_share(tx: &mut Tx<'_>, product_id: i64) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, category, calories_per_100g, image_url
          FROM product
         WHERE id = $1
           FOR SHARE
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn insert_record(tx: &mut Tx<'_>, user_id: i64) -> sqlx::Result<Record> {
    sqlx::query_as::<_, Record>(
        r#"
        INSERT INTO record (user_id, created, updated)
        VALUES ($1, now(), now())
        RETURNING id, user_id, created, updated
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_item(
    tx: &mut Tx<'_>,
    record_id: i64,
    product_id: i64,
    weight: i32,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO recordproduct (records_id, product_id, weight) VALUES ($1, $2, $3)")
        .bind(record_id)
        .bind(product_id)
        .bind(weight)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Owner-scoped lookup that also locks the row for the rest of the transaction.
pub async fn owned_for_update(
    tx: &mut Tx<'_>,
    record_id: i64,
    user_id: i64,
) -> sqlx::Result<Option<Record>> {
    sqlx::query_as::<_, Record>(
        r#"
        SELECT id, user_id, created, updated
          FROM record
         WHERE id = $1 AND user_id = $2
           FOR UPDATE
        "#,
    )
    .bind(record_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn delete_items(tx: &mut Tx<'_>, record_id: i64) -> sqlx::Result<u64> {
    let done = sqlx::query("DELETE FROM recordproduct WHERE records_id = $1")
        .bind(record_id)
        .execute(&mut **tx)
        .await?;
    Ok(done.rows_affected())
}

pub async fn touch(tx: &mut Tx<'_>, record_id: i64) -> sqlx::Result<Record> {
    sqlx::query_as::<_, Record>(
        r#"
        UPDATE record
           SET updated = clock_timestamp()
         WHERE id = $1
        RETURNING id, user_id, created, updated
        "#,
    )
    .bind(record_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn delete_record(tx: &mut Tx<'_>, record_id: i64) -> sqlx::Result<u64> {
    let done = sqlx::query("DELETE FROM record WHERE id = $1")
        .bind(record_id)
        .execute(&mut **tx)
        .await?;
    Ok(done.rows_affected())
}

// ---- Queries ----

pub async fn find_owned(db: &PgPool, record_id: i64, user_id: i64) -> sqlx::Result<Option<Record>> {
    sqlx::query_as::<_, Record>(
        "SELECT id, user_id, created, updated FROM record WHERE id = $1 AND user_id = $2",
    )
    .bind(record_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn list_by_user(db: &PgPool, user_id: i64) -> sqlx::Result<Vec<Record>> {
    sqlx::query_as::<_, Record>(
        r#"
        SELECT id, user_id, created, updated
          FROM record
         WHERE user_id = $1
         ORDER BY created, id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Products of every record in `record_ids`, keyed by record id.
pub async fn items_for(db: &PgPool, record_ids: &[i64]) -> sqlx::Result<Vec<RecordItemRow>> {
    sqlx::query_as::<_, RecordItemRow>(
        r#"
        SELECT rp.records_id, rp.weight,
               p.id, p.name, p.category, p.calories_per_100g, p.image_url
          FROM recordproduct rp
          JOIN product p ON p.id = rp.product_id
         WHERE rp.records_id = ANY($1)
         ORDER BY rp.records_id, p.id
        "#,
    )
    .bind(record_ids)
    .fetch_all(db)
    .await
}

/// Matches on the UTC calendar day of `created`.
pub async fn views_by_date(db: &PgPool, user_id: i64, day: Date) -> sqlx::Result<Vec<RecordView>> {
    sqlx::query_as::<_, RecordView>(
        r#"
        SELECT p.name,
               p.image_url         AS image,
               p.calories_per_100g AS product_calory,
               rp.weight,
               r.id                AS record_id
          FROM record r
          JOIN recordproduct rp ON rp.records_id = r.id
          JOIN product p        ON p.id = rp.product_id
         WHERE r.user_id = $1
           AND (r.created AT TIME ZONE 'UTC')::date = $2
         ORDER BY r.created, r.id
        "#,
    )
    .bind(user_id)
    .bind(day)
    .fetch_all(db)
    .await
}
