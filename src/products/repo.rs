use sqlx::PgPool;

use super::repo_types::Product;

pub async fn insert(
    db: &PgPool,
    name: &str,
    category: &str,
    calories_per_100g: i32,
    image_url: Option<&str>,
) -> sqlx::Result<Product> {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO product (name, category, calories_per_100g, image_url)
        VALUES ($1, $2, $3, $4)
        RETURNING id, name, category, calories_per_100g, image_url
        "#,
    )
    .bind(name)
    .bind(category)
    .bind(calories_per_100g)
    .bind(image_url)
    .fetch_one(db)
    .await
}

pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<Product>> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, category, calories_per_100g, image_url FROM product ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, category, calories_per_100g, image_url FROM product WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Exact match against the stored, title-cased name; the lowest id wins on duplicates.
pub async fn find_by_name(db: &PgPool, name: &str) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, category, calories_per_100g, image_url
          FROM product
         WHERE name = $1
         ORDER BY id
         LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(db)
    .await
}

/// Replaces the scalar fields; `image_url` is only overwritten when `Some`.
pub async fn update(
    db: &PgPool,
    id: i64,
    name: &str,
    category: &str,
    calories_per_100g: i32,
    image_url: Option<&str>,
) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE product
           SET name = $2,
               category = $3,
               calories_per_100g = $4,
               image_url = COALESCE($5, image_url)
         WHERE id = $1
        RETURNING id, name, category, calories_per_100g, image_url
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category)
    .bind(calories_per_100g)
    .bind(image_url)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<bool> {
    let done = sqlx::query("DELETE FROM product WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(done.rows_affected() == 1)
}
