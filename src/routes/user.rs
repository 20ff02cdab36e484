use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_email::Email;
use sqlx::PgPool;

use crate::db::user::{User, UserSummary};

use super::{auth::AuthService, utils::validate_auth_token};

// Profile and balances of the authenticated user
async fn get_me(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Token validation failed: {:?}", err);
            return Err((err, "Invalid token"));
        }
    };

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, full_name, password_hash, balance, vault, \
         created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await;

    match user {
        Ok(Some(user)) => Ok((StatusCode::OK, Json(user))),
        Ok(None) => {
            tracing::error!("User not found: {}", user_id);
            Err((StatusCode::NOT_FOUND, "User not found"))
        }
        Err(err) => {
            tracing::error!("Failed to load user {}: {err}", user_id);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to load user"))
        }
    }
}

// Everyone except the caller, for picking a recipient or reviewer
async fn list_recipients(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    let others = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, full_name FROM users WHERE id <> $1 ORDER BY username",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await;

    match others {
        Ok(others) => Ok((StatusCode::OK, Json(others))),
        Err(err) => {
            tracing::error!("Failed to list recipients: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list recipients",
            ))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(rename = "name")]
    pub new_name: String,
    #[serde(rename = "email")]
    pub new_email: Email,
}

async fn update_user(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(payload): Json<UpdateUser>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Token validation failed: {:?}", err);
            return Err((err, "Invalid token"));
        }
    };

    let mut query_builder = sqlx::QueryBuilder::new("UPDATE users SET ");
    query_builder
        .push("full_name = ")
        .push_bind(&payload.new_name)
        .push(", email = ")
        .push_bind(payload.new_email.as_str())
        .push(", updated_at = now() WHERE id = ")
        .push_bind(user_id);

    let query = query_builder.build();
    let result = query.execute(&pool).await;

    match result {
        Ok(_) => {
            tracing::info!("User updated successfully: {}", user_id);
            Ok((StatusCode::OK, "User updated successfully"))
        }
        Err(err) => {
            tracing::error!("Failed to update user: {:?}", err);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to update user"))
        }
    }
}

pub fn user_routes(service: Arc<AuthService>, db_pool: PgPool) -> Router {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/recipients", get(list_recipients))
        .route("/users/update", put(update_user))
        .with_state((service, db_pool))
}
