use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Signing and verification keys built from the startup configuration.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let JwtConfig {
            secret,
            algorithm,
            ttl_minutes,
        } = cfg;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: *algorithm,
            ttl: Duration::from_secs((*ttl_minutes).max(0) as u64 * 60),
        }
    }

    /// Issues a token whose subject is the username.
    pub fn sign(&self, username: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(%username, "jwt signed");
        Ok(token)
    }

    /// Returns the username carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::unauthorized()
        })?;
        if data.claims.sub.is_empty() {
            return Err(AppError::unauthorized());
        }
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str, algorithm: Algorithm) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            algorithm,
            ttl_minutes: 60 * 24,
        })
    }

    fn raw_token(keys: &JwtKeys, claims: &serde_json::Value) -> String {
        encode(&Header::new(keys.algorithm), claims, &keys.encoding).unwrap()
    }

    #[tokio::test]
    async fn keys_come_from_app_state() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.algorithm, Algorithm::HS256);
        assert_eq!(keys.ttl, Duration::from_secs(5 * 60));
    }

    #[test]
    fn sign_and_verify_returns_username() {
        let keys = keys("dev-secret", Algorithm::HS256);
        let token = keys.sign("alice").expect("sign");
        assert_eq!(keys.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn token_lives_for_the_configured_ttl() {
        let keys = keys("dev-secret", Algorithm::HS384);
        let token = keys.sign("alice").unwrap();

        let mut validation = Validation::new(Algorithm::HS384);
        validation.validate_exp = false;
        let claims = decode::<Claims>(&token, &keys.decoding, &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = keys("secret-a", Algorithm::HS256).sign("alice").unwrap();
        let err = keys("secret-b", Algorithm::HS256).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_token_with_other_algorithm() {
        let token = keys("same", Algorithm::HS512).sign("alice").unwrap();
        assert!(keys("same", Algorithm::HS256).verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let keys = keys("dev-secret", Algorithm::HS256);
        let past = OffsetDateTime::now_utc().unix_timestamp() - 3600;
        let token = raw_token(
            &keys,
            &serde_json::json!({ "sub": "alice", "iat": past - 60, "exp": past }),
        );
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn rejects_token_without_subject() {
        let keys = keys("dev-secret", Algorithm::HS256);
        let future = OffsetDateTime::now_utc().unix_timestamp() + 3600;
        let missing = raw_token(&keys, &serde_json::json!({ "iat": 0, "exp": future }));
        assert!(keys.verify(&missing).is_err());

        let empty = raw_token(&keys, &serde_json::json!({ "sub": "", "iat": 0, "exp": future }));
        assert!(keys.verify(&empty).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let keys = keys("dev-secret", Algorithm::HS256);
        assert!(keys.verify("invalid.token.here").is_err());
        assert!(keys.verify("").is_err());
    }
}
