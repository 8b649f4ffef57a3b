use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User row in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // Argon2 hash, not exposed in JSON
    pub weight: f64,             // kg
    pub height: i32,             // cm
    pub target_weight: f64,      // kg
    pub time_frame: i32,         // months to reach target_weight
}
