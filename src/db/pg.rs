use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{AccessGate, LedgerStore, StoreError};
use super::tx::{NewTransaction, Settlement, Transaction};
use super::user::User;

const TRANSACTION_COLUMNS: &str = "id, title, content, amount, owner_id, receiver_id, \
     review_by_id, status, reviewed, reviewed_at, created_at, updated_at";

/// Ledger store backed by the PostgreSQL pool. Every multi-row effect runs
/// inside one database transaction.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, full_name, password_hash, balance, vault, \
             created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(transaction)
    }

    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The engine has already validated the balance; the guard here only
        // protects against a stale read between validation and commit.
        let debited = sqlx::query(
            "UPDATE users SET balance = balance - $1, updated_at = now() \
             WHERE id = $2 AND balance >= $1",
        )
        .bind(new.amount)
        .bind(new.owner_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::Other(format!(
                "sender {} cannot cover amount {}",
                new.owner_id, new.amount
            )));
        }

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions (title, content, amount, owner_id, receiver_id, review_by_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.amount)
        .bind(new.owner_id)
        .bind(new.receiver_id)
        .bind(new.review_by_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Conditional flip: zero rows means someone else settled first.
        let updated = match settlement {
            Settlement::Confirm {
                acting_user,
                reassign_reviewer,
            } => {
                sqlx::query_as::<_, Transaction>(&format!(
                    "UPDATE transactions SET status = 'SUCCESS', reviewed = TRUE, \
                     reviewed_at = now(), updated_at = now(), \
                     review_by_id = CASE WHEN $2 THEN $3 ELSE review_by_id END \
                     WHERE id = $1 AND status = 'PENDING' RETURNING {TRANSACTION_COLUMNS}"
                ))
                .bind(id)
                .bind(reassign_reviewer)
                .bind(acting_user)
                .fetch_optional(&mut *tx)
                .await?
            }
            Settlement::Cancel { acting_user } => {
                sqlx::query_as::<_, Transaction>(&format!(
                    "UPDATE transactions SET status = 'FAILED', reviewed = TRUE, \
                     reviewed_at = now(), updated_at = now(), review_by_id = $2 \
                     WHERE id = $1 AND status = 'PENDING' RETURNING {TRANSACTION_COLUMNS}"
                ))
                .bind(id)
                .bind(acting_user)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        let Some(transaction) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        match settlement {
            Settlement::Confirm { .. } => {
                sqlx::query("UPDATE users SET vault = vault + $1, updated_at = now() WHERE id = $2")
                    .bind(transaction.amount)
                    .bind(transaction.receiver_id)
                    .execute(&mut *tx)
                    .await?;
            }
            Settlement::Cancel { .. } => {
                sqlx::query(
                    "UPDATE users SET balance = balance + $1, updated_at = now() WHERE id = $2",
                )
                .bind(transaction.amount)
                .bind(transaction.owner_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(transaction))
    }
}

/// Resolves `action:entity:access` permission strings over the role tables.
pub struct PgAccessGate {
    pool: PgPool,
}

impl PgAccessGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessGate for PgAccessGate {
    async fn has_permission(&self, user_id: Uuid, permission: &str) -> Result<bool, StoreError> {
        let (action, entity, accesses) = parse_permission(permission)?;

        let granted = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                SELECT 1 FROM permissions p \
                JOIN role_permissions rp ON rp.permission_id = p.id \
                JOIN user_roles ur ON ur.role_id = rp.role_id \
                WHERE ur.user_id = $1 AND p.action = $2 AND p.entity = $3 \
                  AND p.access = ANY($4) \
            )",
        )
        .bind(user_id)
        .bind(action)
        .bind(entity)
        .bind(accesses)
        .fetch_one(&self.pool)
        .await?;
        Ok(granted)
    }
}

fn parse_permission(permission: &str) -> Result<(String, String, Vec<String>), StoreError> {
    let mut parts = permission.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(action), Some(entity), Some(access)) if !access.is_empty() => Ok((
            action.to_string(),
            entity.to_string(),
            access.split(',').map(str::to_string).collect(),
        )),
        _ => Err(StoreError::Other(format!(
            "malformed permission string: {permission}"
        ))),
    }
}
