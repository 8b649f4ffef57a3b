use sqlx::PgPool;

use crate::auth::repo_types::User;

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, weight, height, target_weight, time_frame";

/// Fields a user may change about themselves; `None` leaves a column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<i32>,
    pub target_weight: Option<f64>,
    pub time_frame: Option<i32>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub hashed_password: &'a str,
    pub weight: f64,
    pub height: i32,
    pub target_weight: f64,
    pub time_frame: i32,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(r#"SELECT {USER_COLUMNS} FROM "user" WHERE id = $1"#))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE username = $1"#
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(r#"SELECT {USER_COLUMNS} FROM "user" WHERE email = $1"#))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO "user" (username, email, hashed_password, weight, height, target_weight, time_frame)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.hashed_password)
        .bind(new.weight)
        .bind(new.height)
        .bind(new.target_weight)
        .bind(new.time_frame)
        .fetch_one(db)
        .await
    }

    /// Applies only the fields present in `changes`.
    pub async fn update(db: &PgPool, id: i64, changes: &UserChanges) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE "user"
               SET username      = COALESCE($2, username),
                   email         = COALESCE($3, email),
                   weight        = COALESCE($4, weight),
                   height        = COALESCE($5, height),
                   target_weight = COALESCE($6, target_weight),
                   time_frame    = COALESCE($7, time_frame)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.weight)
        .bind(changes.height)
        .bind(changes.target_weight)
        .bind(changes.time_frame)
        .fetch_optional(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: i64, hashed_password: &str) -> sqlx::Result<bool> {
        let done = sqlx::query(r#"UPDATE "user" SET hashed_password = $2 WHERE id = $1"#)
            .bind(id)
            .bind(hashed_password)
            .execute(db)
            .await?;
        Ok(done.rows_affected() == 1)
    }

    /// Removes the account together with its records and their product rows.
    pub async fn delete_cascade(db: &PgPool, id: i64) -> sqlx::Result<bool> {
        let mut tx = db.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM recordproduct
             WHERE records_id IN (SELECT id FROM record WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM record WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let done = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if done.rows_affected() == 0 {
            // nothing to delete, dropping the tx rolls back
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
