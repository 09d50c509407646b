//! Identity: salted password hashes and opaque bearer sessions.
//!
//! Tokens are random opaque strings looked up in the session table; the
//! handlers only ever see an [`AuthUser`] resolved by the extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Session, User};
use crate::store::Store;

pub const TOKEN_TTL_HOURS: i64 = 24;

pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{salt}:{password}").as_bytes());
    format!("{digest:x}")
}

pub fn verify_password(user: &User, password: &str) -> bool {
    hash_password(password, &user.salt) == user.password_hash
}

pub fn issue_session(user_id: Uuid, now: DateTime<Utc>) -> Session {
    Session {
        token: format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ),
        user_id,
        expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
    }
}

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header against the session table. Absent, unknown, or expired tokens
/// reject with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<Store>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        store: &Arc<Store>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        let now = Utc::now();
        store
            .read(|db| {
                let session = db
                    .sessions
                    .iter()
                    .find(|s| s.token == token)
                    .ok_or(ApiError::Unauthorized)?;
                if session.expires_at <= now {
                    return Err(ApiError::Unauthorized);
                }
                let user = db.user(session.user_id).ok_or(ApiError::Unauthorized)?;
                Ok(AuthUser {
                    id: user.id,
                    name: user.name.clone(),
                    role: user.role.clone(),
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPreferences;

    fn user(password: &str) -> User {
        let salt = new_salt();
        User {
            id: Uuid::new_v4(),
            name: "kim".to_string(),
            phone: "010-1234".to_string(),
            password_hash: hash_password(password, &salt),
            salt,
            role: "user".to_string(),
            total_tasks_created: 0,
            total_tasks_completed: 0,
            total_hours_logged: 0.0,
            preferences: UserPreferences::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn verify_accepts_correct_password_only() {
        let u = user("hunter2");
        assert!(verify_password(&u, "hunter2"));
        assert!(!verify_password(&u, "hunter3"));
        assert!(!verify_password(&u, ""));
    }

    #[test]
    fn same_password_different_salt_differs() {
        let a = hash_password("pw", &new_salt());
        let b = hash_password("pw", &new_salt());
        assert_ne!(a, b);
    }

    #[test]
    fn sessions_expire_after_ttl() {
        let now = Utc::now();
        let s = issue_session(Uuid::new_v4(), now);
        assert_eq!(s.expires_at, now + Duration::hours(TOKEN_TTL_HOURS));
        assert!(s.token.len() >= 64);
    }
}
