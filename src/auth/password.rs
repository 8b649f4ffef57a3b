use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const PASSWORD_SPECIALS: &str = ".,;&?!";

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Checks the password policy, reporting the first rule that fails.
pub fn validate_password(plain: &str) -> Result<(), AppError> {
    let rule = if plain.chars().count() < MIN_PASSWORD_LEN {
        format!("Password must be at least {MIN_PASSWORD_LEN} characters long")
    } else if !plain.chars().any(|c| c.is_uppercase()) {
        "Password must contain at least one uppercase letter".to_string()
    } else if !plain.chars().any(|c| c.is_ascii_digit()) {
        "Password must contain at least one digit".to_string()
    } else if !plain.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        format!("Password must contain at least one of {PASSWORD_SPECIALS}")
    } else {
        return Ok(());
    };
    Err(AppError::Validation(rule))
}
