use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::tx::{NewTransaction, Settlement, Transaction};
use super::user::User;

/// Infrastructure-level failure of the underlying store. Business-rule
/// violations never surface through this type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage fault: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("storage fault: {0}")]
    Other(String),
}

/// Persistence boundary for the transfer and review engines. Each method is
/// one atomic unit against the store: either every row effect it describes
/// persists, or none do.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Insert a PENDING transaction and debit the sender's balance by
    /// `amount`, together.
    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, StoreError>;

    /// Flip a PENDING transaction to its terminal state and apply the
    /// matching balance effect (credit the receiver's vault on confirm,
    /// refund the sender's balance on cancel), together. The flip is
    /// conditional on `status = PENDING`; returns `Ok(None)` when the row
    /// was already settled, so two racing reviewers cannot both apply.
    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> Result<Option<Transaction>, StoreError>;
}

/// Permission resolution, consumed by the engines and route handlers.
/// Permission strings follow the `action:entity:access` convention, where
/// the access portion may be a comma list (`update:transaction:any,own`).
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn has_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, StoreError>;
}
