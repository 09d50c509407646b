// --------------------------------------------------
// Handles identity endpoints.
//
// Responsibilities:
// - Register a new user (phone is the unique login identity)
// - Log in with phone + password
// Both return the same bearer-token envelope.
// --------------------------------------------------

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::error::ApiError;
use crate::models::{User, UserPreferences};
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_role: String,
    pub expire_at: DateTime<Utc>,
    pub token_type: String,
}

fn token_response(user: &User, token: String, expire_at: DateTime<Utc>) -> TokenResponse {
    TokenResponse {
        token,
        user_id: user.id,
        user_name: user.name.clone(),
        user_role: user.role.clone(),
        expire_at,
        token_type: "Bearer".to_string(),
    }
}

// -----------------------------
// POST /api/auth/register
// -----------------------------
pub async fn register(
    State(store): State<Arc<Store>>,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::Validation("name required".to_string()));
    }
    if input.phone.trim().is_empty() {
        return Err(ApiError::Validation("phone required".to_string()));
    }
    if input.password.len() < 4 {
        return Err(ApiError::Validation(
            "password must be at least 4 characters".to_string(),
        ));
    }

    let now = Utc::now();
    let response = store
        .write(|db| {
            if db.users.iter().any(|u| u.phone == input.phone) {
                return Err(ApiError::Validation("phone already registered".to_string()));
            }

            let salt = auth::new_salt();
            let user = User {
                id: Uuid::new_v4(),
                name: input.name.clone(),
                phone: input.phone.clone(),
                password_hash: auth::hash_password(&input.password, &salt),
                salt,
                role: input.role.clone().unwrap_or_else(|| "user".to_string()),
                total_tasks_created: 0,
                total_tasks_completed: 0,
                total_hours_logged: 0.0,
                preferences: UserPreferences::default(),
                created_at: now,
            };
            let session = auth::issue_session(user.id, now);
            let response = token_response(&user, session.token.clone(), session.expires_at);

            db.users.push(user);
            db.sessions.push(session);
            Ok(response)
        })
        .await?;

    tracing::info!(user = %response.user_id, "user registered");
    Ok((StatusCode::CREATED, Json(response)))
}

// -----------------------------
// POST /api/auth/login
// Unknown phone and bad password get the same rejection.
// -----------------------------
pub async fn login(
    State(store): State<Arc<Store>>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let response = store
        .write(|db| {
            let user = db
                .users
                .iter()
                .find(|u| u.phone == input.phone)
                .ok_or(ApiError::Unauthorized)?;
            if !auth::verify_password(user, &input.password) {
                return Err(ApiError::Unauthorized);
            }

            // Credentials checked; drop expired sessions while we hold the
            // lock anyway. The rejection paths above must not mutate.
            db.sessions.retain(|s| s.expires_at > now);

            let session = auth::issue_session(user.id, now);
            let response = token_response(user, session.token.clone(), session.expires_at);
            db.sessions.push(session);
            Ok(response)
        })
        .await?;

    tracing::info!(user = %response.user_id, "login");
    Ok(Json(response))
}
