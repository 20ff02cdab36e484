use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use backend_recognition_system::db::store::{AccessGate, LedgerStore, StoreError};
use backend_recognition_system::db::tx::{
    NewTransaction, Settlement, Transaction, TransactionStatus,
};
use backend_recognition_system::db::user::User;

/// In-memory ledger with the same atomic semantics as the PostgreSQL store:
/// each trait method applies all of its row effects under one lock, and the
/// status flip on settle is conditional on the row still being PENDING.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    transactions: HashMap<Uuid, Transaction>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, balance: i64, vault: i64) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let user = User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: None,
            password_hash: String::new(),
            balance,
            vault,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().users.insert(id, user);
        id
    }

    pub fn balance_of(&self, id: Uuid) -> i64 {
        self.inner.lock().unwrap().users[&id].balance
    }

    pub fn vault_of(&self, id: Uuid) -> i64 {
        self.inner.lock().unwrap().users[&id].vault
    }

    pub fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.inner.lock().unwrap().transactions.get(&id).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.lock().unwrap().transactions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.lock().unwrap().transactions.get(&id).cloned())
    }

    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let sender = inner
            .users
            .get_mut(&new.owner_id)
            .ok_or_else(|| StoreError::Other(format!("no such user: {}", new.owner_id)))?;
        if sender.balance < new.amount {
            return Err(StoreError::Other(format!(
                "sender {} cannot cover amount {}",
                new.owner_id, new.amount
            )));
        }
        sender.balance -= new.amount;

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            content: new.content.clone(),
            amount: new.amount,
            owner_id: new.owner_id,
            receiver_id: new.receiver_id,
            review_by_id: new.review_by_id,
            status: TransactionStatus::Pending,
            reviewed: false,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        inner
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        let (amount, owner_id, receiver_id) = {
            let Some(transaction) = inner.transactions.get_mut(&id) else {
                return Ok(None);
            };
            if transaction.status != TransactionStatus::Pending {
                return Ok(None);
            }

            let now = Utc::now();
            transaction.reviewed = true;
            transaction.reviewed_at = Some(now);
            transaction.updated_at = now;
            match settlement {
                Settlement::Confirm {
                    acting_user,
                    reassign_reviewer,
                } => {
                    transaction.status = TransactionStatus::Success;
                    if reassign_reviewer {
                        transaction.review_by_id = acting_user;
                    }
                }
                Settlement::Cancel { acting_user } => {
                    transaction.status = TransactionStatus::Failed;
                    transaction.review_by_id = acting_user;
                }
            }
            (
                transaction.amount,
                transaction.owner_id,
                transaction.receiver_id,
            )
        };

        match settlement {
            Settlement::Confirm { .. } => {
                let receiver = inner
                    .users
                    .get_mut(&receiver_id)
                    .ok_or_else(|| StoreError::Other(format!("no such user: {receiver_id}")))?;
                receiver.vault += amount;
            }
            Settlement::Cancel { .. } => {
                let owner = inner
                    .users
                    .get_mut(&owner_id)
                    .ok_or_else(|| StoreError::Other(format!("no such user: {owner_id}")))?;
                owner.balance += amount;
            }
        }

        Ok(inner.transactions.get(&id).cloned())
    }
}

/// Access gate over a fixed set of grants.
#[derive(Default)]
pub struct StaticGate {
    grants: Mutex<HashSet<(Uuid, String)>>,
}

impl StaticGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: Uuid, permission: &str) {
        self.grants
            .lock()
            .unwrap()
            .insert((user_id, permission.to_string()));
    }
}

#[async_trait]
impl AccessGate for StaticGate {
    async fn has_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, StoreError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .contains(&(user_id, permission.to_string())))
    }
}
