use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub amount: i64,
    pub owner_id: Uuid,
    pub receiver_id: Uuid,
    pub review_by_id: Uuid,
    pub status: TransactionStatus,
    pub reviewed: bool,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

/// Row values for a transfer about to be created. The sender's debit and the
/// insert of this row happen in one storage transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub title: String,
    pub content: String,
    pub amount: i64,
    pub owner_id: Uuid,
    pub receiver_id: Uuid,
    pub review_by_id: Uuid,
}

/// How a pending transaction leaves the PENDING state. Carries everything
/// the store needs to apply the balance effect and the status flip in one
/// storage transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Credit the receiver's vault. `reassign_reviewer` swaps the reviewer
    /// of record for the acting user (admin override took the review over).
    Confirm {
        acting_user: Uuid,
        reassign_reviewer: bool,
    },
    /// Refund the sender's balance. The reviewer of record always becomes
    /// the acting user on a cancel.
    Cancel { acting_user: Uuid },
}
