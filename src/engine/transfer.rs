use uuid::Uuid;

use crate::db::store::{AccessGate, LedgerStore};
use crate::db::tx::{NewTransaction, Transaction};

use super::error::TransferError;
use super::policy::validate_transfer;
use super::REVIEW_OWN_PERMISSION;

/// Typed input for a transfer, converted once at the boundary.
#[derive(Debug, Clone)]
pub struct CreateTransfer {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub reviewer_id: Uuid,
    pub amount: i64,
    pub title: String,
    pub description: Option<String>,
}

/// Creates a transaction in the PENDING state. The sender is debited right
/// away; the hearts stay in flight until the reviewer confirms or cancels.
/// No row is touched when validation fails.
pub async fn create_transfer<S, G>(
    store: &S,
    gate: &G,
    req: CreateTransfer,
) -> Result<Transaction, TransferError>
where
    S: LedgerStore + ?Sized,
    G: AccessGate + ?Sized,
{
    let sender = store
        .find_user(req.sender_id)
        .await?
        .ok_or(TransferError::NotFound)?;
    let receiver = store
        .find_user(req.receiver_id)
        .await?
        .ok_or(TransferError::NotFound)?;
    let reviewer = store
        .find_user(req.reviewer_id)
        .await?
        .ok_or(TransferError::NotFound)?;

    let reviewer_is_permitted = gate
        .has_permission(reviewer.id, REVIEW_OWN_PERMISSION)
        .await?;

    validate_transfer(
        req.amount,
        &sender,
        &receiver,
        &reviewer,
        reviewer_is_permitted,
    )?;

    let transaction = store
        .insert_pending(&NewTransaction {
            title: req.title,
            content: req.description.unwrap_or_default(),
            amount: req.amount,
            owner_id: sender.id,
            receiver_id: receiver.id,
            review_by_id: reviewer.id,
        })
        .await?;

    tracing::info!(
        "created pending transaction {} for {} hearts from {} to {}",
        transaction.id,
        transaction.amount,
        sender.username,
        receiver.username
    );
    Ok(transaction)
}
