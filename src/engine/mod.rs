//! Transfer and review engines.
//!
//! A transfer moves hearts out of the sender's balance into a PENDING
//! transaction; the designated reviewer later confirms (crediting the
//! receiver's vault) or cancels (refunding the sender). Both transitions
//! are terminal.

pub mod error;
pub mod policy;
pub mod review;
pub mod transfer;

pub use error::TransferError;
pub use review::{cancel_transfer, confirm_transfer, ConfirmOptions};
pub use transfer::{create_transfer, CreateTransfer};

/// Grant a user must hold to be designated as a reviewer.
pub const REVIEW_OWN_PERMISSION: &str = "update:transaction:own";

/// Administrative override: review any transaction, not just assigned ones.
pub const REVIEW_ANY_PERMISSION: &str = "update:transaction:any";
