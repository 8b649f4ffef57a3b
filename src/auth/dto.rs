use serde::{Deserialize, Serialize};

use super::repo_types::User;

fn default_time_frame() -> i32 {
    6
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub weight: f64,
    pub height: i32,
    pub target_weight: f64,
    #[serde(default = "default_time_frame")]
    pub time_frame: i32,
    pub password: String,
}

/// OAuth2 password-flow form posted to `/auth/token`.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<i32>,
    pub target_weight: Option<f64>,
    pub time_frame: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub weight: f64,
    pub height: i32,
    pub target_weight: f64,
    pub time_frame: i32,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            weight: u.weight,
            height: u.height,
            target_weight: u.target_weight,
            time_frame: u.time_frame,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}
