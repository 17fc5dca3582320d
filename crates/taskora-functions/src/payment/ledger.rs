//! Balance ledger
//!
//! Crediting and recording the transaction happen as one step keyed by the
//! external payment id, so a payment can never be credited twice.

use super::PaymentError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use taskora_core::{FilterDescriptor, QueryExecutor, QueryOptions};

/// Stored procedure performing the credit and the transaction insert
pub const CREDIT_FUNCTION: &str = "credit_payment";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentCredit {
    pub payment_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CreditOutcome {
    /// False when the payment id was already recorded
    pub credited: bool,
    pub balance: f64,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Credit `credit.amount` unless `credit.payment_id` is already recorded
    async fn credit_once(&self, credit: &PaymentCredit) -> Result<CreditOutcome, PaymentError>;
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<String, f64>,
    transactions: HashMap<String, PaymentCredit>,
}

/// Ledger held in memory under a single lock
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_balance(self, user_id: &str, balance: f64) -> Self {
        self.state
            .lock()
            .balances
            .insert(user_id.to_string(), balance);
        self
    }

    pub fn balance_of(&self, user_id: &str) -> f64 {
        self.state
            .lock()
            .balances
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn credit_once(&self, credit: &PaymentCredit) -> Result<CreditOutcome, PaymentError> {
        let mut state = self.state.lock();
        if state.transactions.contains_key(&credit.payment_id) {
            let balance = state
                .balances
                .get(&credit.user_id)
                .copied()
                .unwrap_or_default();
            return Ok(CreditOutcome {
                credited: false,
                balance,
            });
        }

        let balance = state.balances.entry(credit.user_id.clone()).or_default();
        *balance += credit.amount;
        let balance = *balance;
        state
            .transactions
            .insert(credit.payment_id.clone(), credit.clone());

        Ok(CreditOutcome {
            credited: true,
            balance,
        })
    }
}

/// Ledger on the hosted platform via [`CREDIT_FUNCTION`]
///
/// The procedure runs in one database transaction and answers
/// `{ "credited": bool, "balance": number }`.
pub struct RpcLedger {
    executor: Arc<QueryExecutor>,
}

impl RpcLedger {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Current balance read from the users table
    pub async fn balance(&self, user_id: &str) -> Result<f64, PaymentError> {
        let payload = self
            .executor
            .fetch(
                "users",
                QueryOptions::default()
                    .columns("balance")
                    .filters(FilterDescriptor::new().eq("id", user_id))
                    .limit(1)
                    .use_cache(false),
            )
            .await
            .into_result()?;

        Ok(payload
            .rows
            .first()
            .and_then(|r| r.get("balance"))
            .and_then(Value::as_f64)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn credit_once(&self, credit: &PaymentCredit) -> Result<CreditOutcome, PaymentError> {
        let result = self
            .executor
            .rpc(
                CREDIT_FUNCTION,
                json!({
                    "p_payment_id": credit.payment_id,
                    "p_user_id": credit.user_id,
                    "p_amount": credit.amount,
                    "p_currency": credit.currency,
                }),
                &["users", "transactions"],
            )
            .await?;

        serde_json::from_value(result).map_err(|e| PaymentError::Ledger(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskora_core::test_support::memory::Tables;
    use taskora_core::test_support::MemoryBackend;
    use taskora_core::types::row;
    use taskora_core::{BackendError, BackendResult, QueryCache};

    fn credit(payment_id: &str, amount: f64) -> PaymentCredit {
        PaymentCredit {
            payment_id: payment_id.to_string(),
            user_id: "u1".to_string(),
            amount,
            currency: "ARS".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_ledger_credits_once() {
        let ledger = MemoryLedger::new().with_balance("u1", 100.0);

        let first = ledger.credit_once(&credit("p1", 50.0)).await.unwrap();
        let second = ledger.credit_once(&credit("p1", 50.0)).await.unwrap();

        assert_eq!(first, CreditOutcome { credited: true, balance: 150.0 });
        assert_eq!(second, CreditOutcome { credited: false, balance: 150.0 });
        assert_eq!(ledger.transaction_count(), 1);
    }

    /// Procedure stand-in with the same contract as the database function
    fn credit_procedure(tables: &mut Tables, args: Value) -> BackendResult<Value> {
        let payment_id = args["p_payment_id"].clone();
        let user_id = args["p_user_id"].clone();
        let amount = args["p_amount"].as_f64().unwrap_or_default();

        let transactions = tables.entry("transactions".to_string()).or_default();
        let recorded = transactions.iter().any(|t| t["external_id"] == payment_id);
        if !recorded {
            transactions.push(row(json!({
                "external_id": payment_id,
                "user_id": user_id,
                "amount": amount,
            })));
        }

        let users = tables.entry("users".to_string()).or_default();
        let user = users
            .iter_mut()
            .find(|u| u["id"] == user_id)
            .ok_or_else(|| BackendError::status(404, "user not found"))?;
        let mut balance = user["balance"].as_f64().unwrap_or_default();
        if !recorded {
            balance += amount;
            user.insert("balance".to_string(), json!(balance));
        }
        Ok(json!({ "credited": !recorded, "balance": balance }))
    }

    #[tokio::test]
    async fn test_rpc_ledger_invalidates_balance_reads() {
        let backend = MemoryBackend::new()
            .with_table("users", vec![row(json!({ "id": "u1", "balance": 10.0 }))]);
        backend.register_rpc(CREDIT_FUNCTION, credit_procedure);
        let executor = Arc::new(QueryExecutor::new(
            Arc::new(backend.clone()),
            Arc::new(QueryCache::default()),
        ));
        let ledger = RpcLedger::new(executor.clone());

        assert!(executor.fetch("users", QueryOptions::default()).await.is_ok());
        let outcome = ledger.credit_once(&credit("p9", 5.0)).await.unwrap();
        assert_eq!(outcome, CreditOutcome { credited: true, balance: 15.0 });
        assert_eq!(executor.cache().stats().entries, 0);

        let again = ledger.credit_once(&credit("p9", 5.0)).await.unwrap();
        assert!(!again.credited);
        assert_eq!(ledger.balance("u1").await.unwrap(), 15.0);
    }
}
