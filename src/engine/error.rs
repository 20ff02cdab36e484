use thiserror::Error;

use crate::db::store::StoreError;

/// Errors from the transfer and review engines. Every variant except
/// `Storage` is a business-rule violation meant for a user-facing message;
/// `Storage` is an infrastructure fault and propagates to the caller.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Cannot transfer to the same user")]
    SelfTransfer,

    #[error("Reviewer must differ from sender and receiver")]
    ReviewerConflict,

    #[error("Reviewer is not allowed to review transactions")]
    ReviewerUnauthorized,

    #[error("You are not authorized to review this transaction")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Transaction was already reviewed")]
    AlreadyReviewed,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TransferError {
    /// True for the recoverable, user-presentable kinds; false for
    /// infrastructure faults.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, TransferError::Storage(_))
    }
}
