use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{sse::Event, IntoResponse, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::pg::{PgAccessGate, PgLedgerStore};
use crate::db::tx::Transaction;
use crate::engine::{
    cancel_transfer, confirm_transfer, create_transfer, ConfirmOptions, CreateTransfer,
    TransferError,
};

use super::{auth::AuthService, utils};

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub recipient_id: Uuid,
    pub reviewer_id: Uuid,
    pub amount: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub reassign_reviewer: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingReviews {
    pub pending: i64,
}

/// Business-rule violations map to field-level messages; storage faults stay
/// generic and get logged.
fn transfer_error_response(err: TransferError) -> (StatusCode, String) {
    let status = match &err {
        TransferError::InvalidAmount
        | TransferError::InsufficientBalance
        | TransferError::SelfTransfer
        | TransferError::ReviewerConflict => StatusCode::BAD_REQUEST,
        TransferError::ReviewerUnauthorized | TransferError::Unauthorized => StatusCode::FORBIDDEN,
        TransferError::NotFound => StatusCode::NOT_FOUND,
        TransferError::AlreadyReviewed => StatusCode::CONFLICT,
        TransferError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if err.is_business_rule() {
        (status, err.to_string())
    } else {
        tracing::error!("storage fault while processing transfer: {err}");
        (status, "Failed to process transaction".to_string())
    }
}

async fn create_transaction(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Json(transfer): Json<TransferRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Starting transaction creation process");

    let sender_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Invalid token: {err}");
            return Err((err, "Invalid token".to_string()));
        }
    };

    let store = PgLedgerStore::new(pool.clone());
    let gate = PgAccessGate::new(pool);

    let request = CreateTransfer {
        sender_id,
        receiver_id: transfer.recipient_id,
        reviewer_id: transfer.reviewer_id,
        amount: transfer.amount,
        title: transfer.title,
        description: transfer.description,
    };

    match create_transfer(&store, &gate, request).await {
        Ok(transaction) => Ok((StatusCode::CREATED, Json(transaction))),
        Err(err) => Err(transfer_error_response(err)),
    }
}

async fn confirm_transaction(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Path(transaction_id): Path<Uuid>,
    body: Option<Json<ConfirmRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let acting_user = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let options = ConfirmOptions {
        reassign_reviewer: body.map(|Json(req)| req.reassign_reviewer).unwrap_or(false),
    };

    let store = PgLedgerStore::new(pool.clone());
    let gate = PgAccessGate::new(pool);

    match confirm_transfer(&store, &gate, acting_user, transaction_id, options).await {
        Ok(transaction) => Ok((StatusCode::OK, Json(transaction))),
        Err(err) => Err(transfer_error_response(err)),
    }
}

async fn cancel_transaction(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let acting_user = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let store = PgLedgerStore::new(pool.clone());
    let gate = PgAccessGate::new(pool);

    match cancel_transfer(&store, &gate, acting_user, transaction_id).await {
        Ok(transaction) => Ok((StatusCode::OK, Json(transaction))),
        Err(err) => Err(transfer_error_response(err)),
    }
}

// return a specific transaction by its id, visible only to its participants
async fn get_transaction(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, title, content, amount, owner_id, receiver_id, review_by_id,
               status, reviewed, reviewed_at, created_at, updated_at
        FROM transactions
        WHERE id = $1 AND (owner_id = $2 OR receiver_id = $2 OR review_by_id = $2)
        "#,
    )
    .bind(transaction_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await;

    match transaction {
        Ok(Some(transaction)) => Ok((StatusCode::OK, Json(transaction))),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Transaction not found")),
        Err(err) => {
            tracing::error!("Failed to retrieve transaction: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve transaction",
            ))
        }
    }
}

// stream the caller's transfer history, sent or received
async fn list_transactions(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    let cursor = match sqlx::query_as::<_, Transaction>(
        "SELECT id, title, content, amount, owner_id, receiver_id, review_by_id, \
         status, reviewed, reviewed_at, created_at, updated_at \
         FROM transactions WHERE owner_id = $1 OR receiver_id = $1 \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::error!("Failed to retrieve transactions: {err}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve transactions",
            ));
        }
    };

    let stream = futures::stream::iter(cursor)
        .map(|transaction| Event::default().json_data(transaction));

    let sse = Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(2))
            .text("keep-alive-text"),
    );

    Ok(sse)
}

// how many transactions are waiting on the caller's review
async fn pending_reviews(
    headers: HeaderMap,
    State((service, pool)): State<(Arc<AuthService>, PgPool)>,
) -> Result<impl IntoResponse, (StatusCode, &'static str)> {
    let user_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token"));
        }
    };

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM transactions WHERE review_by_id = $1 AND status = 'PENDING'",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await;

    match count {
        Ok(pending) => Ok((StatusCode::OK, Json(PendingReviews { pending }))),
        Err(err) => {
            tracing::error!("Failed to count pending reviews: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to count pending reviews",
            ))
        }
    }
}

pub fn tx_route(service: Arc<AuthService>, pool: PgPool) -> Router {
    Router::new()
        .route("/tx/transfer", post(create_transaction))
        .route("/tx/confirm/:uid", post(confirm_transaction))
        .route("/tx/cancel/:uid", post(cancel_transaction))
        .route("/tx/get_tx/:uid", get(get_transaction))
        .route("/tx/list_txs", get(list_transactions))
        .route("/tx/pending_reviews", get(pending_reviews))
        .with_state((service, pool))
}
