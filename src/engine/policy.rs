use crate::db::user::User;

use super::error::TransferError;

/// Pure pre-mutation checks for a proposed transfer. `reviewer_is_permitted`
/// is resolved by the caller through the access gate so this stays free of
/// side effects. Returns the first violated rule.
pub fn validate_transfer(
    amount: i64,
    sender: &User,
    receiver: &User,
    reviewer: &User,
    reviewer_is_permitted: bool,
) -> Result<(), TransferError> {
    if amount <= 0 {
        return Err(TransferError::InvalidAmount);
    }

    if sender.balance < amount {
        return Err(TransferError::InsufficientBalance);
    }

    if sender.id == receiver.id {
        return Err(TransferError::SelfTransfer);
    }

    if !reviewer_is_permitted {
        return Err(TransferError::ReviewerUnauthorized);
    }

    if reviewer.id == sender.id || reviewer.id == receiver.id {
        return Err(TransferError::ReviewerConflict);
    }

    Ok(())
}
