use uuid::Uuid;

use crate::db::store::{AccessGate, LedgerStore};
use crate::db::tx::{Settlement, Transaction};

use super::error::TransferError;
use super::REVIEW_ANY_PERMISSION;

/// Options for a confirm performed under admin override.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmOptions {
    /// Record the acting user as the reviewer instead of the one originally
    /// designated.
    pub reassign_reviewer: bool,
}

/// Confirms a pending transaction: credits the receiver's vault and flips
/// the status to SUCCESS. The sender was debited at creation time and is
/// never touched here.
pub async fn confirm_transfer<S, G>(
    store: &S,
    gate: &G,
    acting_user: Uuid,
    transaction_id: Uuid,
    options: ConfirmOptions,
) -> Result<Transaction, TransferError>
where
    S: LedgerStore + ?Sized,
    G: AccessGate + ?Sized,
{
    authorize_review(store, gate, acting_user, transaction_id).await?;

    let settled = store
        .settle_transaction(
            transaction_id,
            Settlement::Confirm {
                acting_user,
                reassign_reviewer: options.reassign_reviewer,
            },
        )
        .await?
        // The conditional flip hit zero rows: another reviewer got there
        // first, or the transaction was already terminal.
        .ok_or(TransferError::AlreadyReviewed)?;

    tracing::info!(
        "transaction {} confirmed by {}, {} hearts credited to receiver vault",
        settled.id,
        acting_user,
        settled.amount
    );
    Ok(settled)
}

/// Cancels a pending transaction: refunds the sender's balance and flips the
/// status to FAILED. The receiver is never touched on a cancel.
pub async fn cancel_transfer<S, G>(
    store: &S,
    gate: &G,
    acting_user: Uuid,
    transaction_id: Uuid,
) -> Result<Transaction, TransferError>
where
    S: LedgerStore + ?Sized,
    G: AccessGate + ?Sized,
{
    authorize_review(store, gate, acting_user, transaction_id).await?;

    let settled = store
        .settle_transaction(transaction_id, Settlement::Cancel { acting_user })
        .await?
        .ok_or(TransferError::AlreadyReviewed)?;

    tracing::info!(
        "transaction {} cancelled by {}, {} hearts refunded to sender",
        settled.id,
        acting_user,
        settled.amount
    );
    Ok(settled)
}

/// The acting user must be the reviewer of record, or hold the
/// administrative override grant. Terminal transactions are reported as
/// AlreadyReviewed here; the settle step re-checks under the same storage
/// transaction so racing reviewers cannot both apply.
async fn authorize_review<S, G>(
    store: &S,
    gate: &G,
    acting_user: Uuid,
    transaction_id: Uuid,
) -> Result<(), TransferError>
where
    S: LedgerStore + ?Sized,
    G: AccessGate + ?Sized,
{
    let transaction = store
        .find_transaction(transaction_id)
        .await?
        .ok_or(TransferError::NotFound)?;

    if transaction.status.is_terminal() {
        return Err(TransferError::AlreadyReviewed);
    }

    if transaction.review_by_id == acting_user {
        return Ok(());
    }

    if gate.has_permission(acting_user, REVIEW_ANY_PERMISSION).await? {
        return Ok(());
    }

    tracing::warn!(
        "user {} is not allowed to review transaction {}",
        acting_user,
        transaction_id
    );
    Err(TransferError::Unauthorized)
}
