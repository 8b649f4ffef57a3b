use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use super::dto::{RegisterRequest, UpdateUserRequest};
use super::password::{hash_password, validate_password, verify_password};
use super::repo::{NewUser, UserChanges};
use super::repo_types::User;
use crate::error::{AppError, AppResult};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_username(username: &str) -> AppResult<()> {
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "Username must be non-empty and contain no whitespace".into(),
        ));
    }
    Ok(())
}

fn check_positive(field: &str, value: f64) -> AppResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(AppError::Validation(format!("{field} must be a positive number")));
    }
    Ok(())
}

fn taken(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::Conflict("Username or email already registered".into()),
        other => other,
    }
}

/// Creates an account after every input check has passed.
pub async fn register(db: &PgPool, mut req: RegisterRequest) -> AppResult<User> {
    req.email = normalize_email(&req.email);
    req.username = req.username.trim().to_string();

    check_username(&req.username)?;
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    validate_password(&req.password)?;
    check_positive("weight", req.weight)?;
    check_positive("height", f64::from(req.height))?;
    check_positive("target_weight", req.target_weight)?;
    check_positive("time_frame", f64::from(req.time_frame))?;

    if User::find_by_email(db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if User::find_by_username(db, &req.username).await?.is_some() {
        warn!(username = %req.username, "username already taken");
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let hashed_password = hash_password(&req.password)?;
    let user = User::create(
        db,
        NewUser {
            username: &req.username,
            email: &req.email,
            hashed_password: &hashed_password,
            weight: req.weight,
            height: req.height,
            target_weight: req.target_weight,
            time_frame: req.time_frame,
        },
    )
    .await
    .map_err(taken)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Username/password check; both failure modes look the same to the caller.
pub async fn authenticate(db: &PgPool, username: &str, password: &str) -> AppResult<User> {
    let Some(user) = User::find_by_username(db, username.trim()).await? else {
        warn!(%username, "login unknown username");
        return Err(AppError::Unauthorized("Invalid authentication credentials".into()));
    };
    if !verify_password(password, &user.hashed_password)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid authentication credentials".into()));
    }
    Ok(user)
}

pub async fn update(db: &PgPool, user_id: i64, req: UpdateUserRequest) -> AppResult<User> {
    let username = req.username.map(|u| u.trim().to_string());
    if let Some(u) = &username {
        check_username(u)?;
    }
    let email = req.email.as_deref().map(normalize_email);
    if let Some(e) = &email {
        if !is_valid_email(e) {
            return Err(AppError::Validation("Invalid email".into()));
        }
    }
    if let Some(w) = req.weight {
        check_positive("weight", w)?;
    }
    if let Some(h) = req.height {
        check_positive("height", f64::from(h))?;
    }
    if let Some(t) = req.target_weight {
        check_positive("target_weight", t)?;
    }
    if let Some(t) = req.time_frame {
        check_positive("time_frame", f64::from(t))?;
    }

    let changes = UserChanges {
        username,
        email,
        weight: req.weight,
        height: req.height,
        target_weight: req.target_weight,
        time_frame: req.time_frame,
    };
    let user = User::update(db, user_id, &changes)
        .await
        .map_err(taken)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id, "user updated");
    Ok(user)
}

pub async fn change_password(db: &PgPool, user_id: i64, old: &str, new: &str) -> AppResult<()> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(old, &user.hashed_password)? {
        warn!(user_id, "change_password wrong old password");
        return Err(AppError::BadRequest("Old password is incorrect".into()));
    }
    validate_password(new)?;

    let hashed = hash_password(new)?;
    if !User::set_password(db, user_id, &hashed).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id, "password changed");
    Ok(())
}

pub async fn delete(db: &PgPool, user_id: i64) -> AppResult<()> {
    if !User::delete_cascade(db, user_id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id, "user deleted");
    Ok(())
}


/// Postgres-backed checks; run with `cargo test -- --ignored` and a `DATABASE_URL`.
#[cfg(test)]
mod db_tests {
    use super::*;
    use axum::extract::FromRef;
    use time::OffsetDateTime;

    use crate::auth::jwt::JwtKeys;
    use crate::state::AppState;

    fn alice() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "Alice@X.com".into(),
            weight: 70.0,
            height: 170,
            target_weight: 65.0,
            time_frame: 6,
            password: "Secret1!".into(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn register_token_and_log_a_meal(db: PgPool) {
        let state = AppState::with_pool(db.clone());

        let user = register(&db, alice()).await.unwrap();
        assert_eq!(user.email, "alice@x.com");
        assert_ne!(user.hashed_password, "Secret1!");

        let authed = authenticate(&db, "alice", "Secret1!").await.unwrap();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(&authed.username).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), "alice");

        let apple = crate::products::repo::insert(&db, "Apple", "Fruit", 52, None)
            .await
            .unwrap();
        let rec = crate::records::services::create(&db, user.id, apple.id, 150)
            .await
            .unwrap();

        let today = OffsetDateTime::now_utc().date();
        let views = crate::records::services::list_by_date(&db, today, user.id)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].record_id, rec.record.id);
        assert_eq!(views[0].product_calory, 52);
        assert_eq!(views[0].weight, 150);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn duplicate_email_or_username_conflicts(db: PgPool) {
        let first = register(&db, alice()).await.unwrap();

        let mut same_email = alice();
        same_email.username = "alice2".into();
        same_email.password = "Other2!x".into();
        assert!(matches!(register(&db, same_email).await, Err(AppError::Conflict(_))));

        let mut same_name = alice();
        same_name.email = "other@x.com".into();
        same_name.password = "Other2!x".into();
        assert!(matches!(register(&db, same_name).await, Err(AppError::Conflict(_))));

        let still = authenticate(&db, "alice", "Secret1!").await.unwrap();
        assert_eq!(still.id, first.id);
        assert_eq!(still.email, "alice@x.com");
        assert_eq!(still.hashed_password, first.hashed_password);
        assert!(User::find_by_username(&db, "alice2").await.unwrap().is_none());
        assert!(User::find_by_email(&db, "other@x.com").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn weak_password_creates_nothing(db: PgPool) {
        let mut req = alice();
        req.password = "secret".into();
        assert!(matches!(register(&db, req).await, Err(AppError::Validation(_))));
        assert!(User::find_by_username(&db, "alice").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn wrong_password_and_unknown_user_are_unauthorized(db: PgPool) {
        register(&db, alice()).await.unwrap();
        assert!(matches!(
            authenticate(&db, "alice", "Wrong1!!").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&db, "bob", "Secret1!").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn change_password_checks_old_then_policy(db: PgPool) {
        let user = register(&db, alice()).await.unwrap();

        let err = change_password(&db, user.id, "Nope1234!", "Better2!").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = change_password(&db, user.id, "Secret1!", "weak").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        change_password(&db, user.id, "Secret1!", "Better2!").await.unwrap();
        assert!(authenticate(&db, "alice", "Better2!").await.is_ok());
        assert!(authenticate(&db, "alice", "Secret1!").await.is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn partial_update_keeps_other_fields(db: PgPool) {
        let user = register(&db, alice()).await.unwrap();
        let updated = update(
            &db,
            user.id,
            UpdateUserRequest {
                weight: Some(68.5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.weight, 68.5);
        assert_eq!(updated.height, 170);
        assert_eq!(updated.username, "alice");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a postgres DATABASE_URL"]
    async fn delete_twice_is_not_found(db: PgPool) {
        let user = register(&db, alice()).await.unwrap();
        delete(&db, user.id).await.unwrap();
        assert!(matches!(delete(&db, user.id).await, Err(AppError::NotFound(_))));
    }
}
