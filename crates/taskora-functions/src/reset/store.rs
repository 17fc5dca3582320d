//! Storage seams of the reset flow
//!
//! Tokens and accounts live on the hosted platform in production
//! ([`BackendResetTokens`], [`BackendAccounts`]); the in-memory
//! implementations back tests and local runs.

use super::{ResetError, ResetTokenRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use taskora_core::types::row;
use taskora_core::{FilterDescriptor, QueryExecutor, QueryOptions};
use taskora_rest::RestBackend;

/// Table holding issued reset tokens
pub const RESET_TOKENS_TABLE: &str = "password_reset_tokens";

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert(&self, record: ResetTokenRecord) -> Result<(), ResetError>;

    async fn find(&self, token_hash: &str) -> Result<Option<ResetTokenRecord>, ResetError>;

    /// Atomically mark a token used
    ///
    /// Returns `false` when it was already used, so concurrent confirmations
    /// cannot both succeed.
    async fn consume(&self, token_hash: &str) -> Result<bool, ResetError>;
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_user_id(&self, email: &str) -> Result<Option<String>, ResetError>;

    async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ResetError>;
}

#[derive(Default)]
pub struct MemoryResetTokens {
    records: Mutex<HashMap<String, ResetTokenRecord>>,
}

impl MemoryResetTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResetTokenRecord> {
        self.records.lock().values().cloned().collect()
    }
}

#[async_trait]
impl ResetTokenStore for MemoryResetTokens {
    async fn insert(&self, record: ResetTokenRecord) -> Result<(), ResetError> {
        self.records
            .lock()
            .insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<ResetTokenRecord>, ResetError> {
        Ok(self.records.lock().get(token_hash).cloned())
    }

    async fn consume(&self, token_hash: &str) -> Result<bool, ResetError> {
        let mut records = self.records.lock();
        match records.get_mut(token_hash) {
            Some(record) if !record.used => {
                record.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Accounts keyed by email, with the last password set per user
#[derive(Default)]
pub struct MemoryAccounts {
    users: Mutex<HashMap<String, String>>,
    passwords: Mutex<HashMap<String, String>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(self, email: &str, user_id: &str) -> Self {
        self.users
            .lock()
            .insert(email.to_lowercase(), user_id.to_string());
        self
    }

    pub fn password_of(&self, user_id: &str) -> Option<String> {
        self.passwords.lock().get(user_id).cloned()
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccounts {
    async fn find_user_id(&self, email: &str) -> Result<Option<String>, ResetError> {
        Ok(self.users.lock().get(&email.to_lowercase()).cloned())
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ResetError> {
        self.passwords
            .lock()
            .insert(user_id.to_string(), password.to_string());
        Ok(())
    }
}

/// Tokens in [`RESET_TOKENS_TABLE`], read and written through the executor
pub struct BackendResetTokens {
    executor: Arc<QueryExecutor>,
}

impl BackendResetTokens {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ResetTokenStore for BackendResetTokens {
    async fn insert(&self, record: ResetTokenRecord) -> Result<(), ResetError> {
        let value = serde_json::to_value(&record).map_err(|e| ResetError::Store(e.to_string()))?;
        self.executor
            .insert(RESET_TOKENS_TABLE, vec![row(value)])
            .await?;
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<ResetTokenRecord>, ResetError> {
        let payload = self
            .executor
            .fetch(
                RESET_TOKENS_TABLE,
                QueryOptions::default()
                    .columns("token_hash, user_id, expires_at, used")
                    .filters(FilterDescriptor::new().eq("token_hash", token_hash))
                    .limit(1)
                    .use_cache(false),
            )
            .await
            .into_result()?;

        payload
            .rows
            .first()
            .map(|r| serde_json::from_value(Value::Object(r.clone())))
            .transpose()
            .map_err(|e| ResetError::Store(e.to_string()))
    }

    async fn consume(&self, token_hash: &str) -> Result<bool, ResetError> {
        // Conditional update: only an unused row matches
        let updated = self
            .executor
            .update(
                RESET_TOKENS_TABLE,
                &FilterDescriptor::new()
                    .eq("token_hash", token_hash)
                    .eq("used", false),
                row(json!({ "used": true })),
            )
            .await?;
        Ok(!updated.is_empty())
    }
}

/// Users table lookups plus the admin password call
pub struct BackendAccounts {
    executor: Arc<QueryExecutor>,
    admin: RestBackend,
}

impl BackendAccounts {
    /// `admin` must carry the service key
    pub fn new(executor: Arc<QueryExecutor>, admin: RestBackend) -> Self {
        Self { executor, admin }
    }
}

#[async_trait]
impl AccountDirectory for BackendAccounts {
    async fn find_user_id(&self, email: &str) -> Result<Option<String>, ResetError> {
        let payload = self
            .executor
            .fetch(
                "users",
                QueryOptions::default()
                    .columns("id")
                    .filters(FilterDescriptor::new().eq("email", email.to_lowercase()))
                    .limit(1)
                    .use_cache(false),
            )
            .await
            .into_result()?;

        Ok(payload
            .rows
            .first()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<(), ResetError> {
        self.admin.update_user_password(user_id, password).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reset::hash_token;
    use chrono::{Duration, Utc};
    use taskora_core::test_support::MemoryBackend;
    use taskora_core::QueryCache;

    fn record(token: &str) -> ResetTokenRecord {
        ResetTokenRecord {
            token_hash: hash_token(token),
            user_id: "u1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            used: false,
        }
    }

    #[tokio::test]
    async fn test_memory_consume_once() {
        let store = MemoryResetTokens::new();
        store.insert(record("t1")).await.unwrap();

        assert!(store.consume(&hash_token("t1")).await.unwrap());
        assert!(!store.consume(&hash_token("t1")).await.unwrap());
        assert!(!store.consume(&hash_token("unknown")).await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_store_round_trip() {
        let backend = MemoryBackend::new();
        let executor = Arc::new(QueryExecutor::new(
            Arc::new(backend.clone()),
            Arc::new(QueryCache::default()),
        ));
        let store = BackendResetTokens::new(executor);

        let issued = record("t1");
        store.insert(issued.clone()).await.unwrap();
        assert_eq!(store.find(&issued.token_hash).await.unwrap(), Some(issued.clone()));

        assert!(store.consume(&issued.token_hash).await.unwrap());
        assert!(!store.consume(&issued.token_hash).await.unwrap());
        assert!(store.find(&issued.token_hash).await.unwrap().unwrap().used);
        assert_eq!(backend.rows(RESET_TOKENS_TABLE).len(), 1);
    }
}
