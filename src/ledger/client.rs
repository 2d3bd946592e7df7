//! JSON-RPC client for the ledger node
//!
//! Contract reads go through the node's loan-contract facade (`lend_*`
//! methods) which returns loan records as positional tuples. Account state
//! needed for transaction assembly uses the standard node methods
//! (`eth_getTransactionCount`, `eth_gasPrice`), whose results are hex
//! quantity strings.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::model::Loan;
use crate::identity::Address;

/// Errors from the ledger node.
///
/// `Unavailable` covers transport failures and timeouts; `Malformed` covers
/// responses the node produced but this service cannot interpret. Both are
/// surfaced to HTTP callers as a retryable service error, never as an
/// authorization denial.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger node unreachable: {0}")]
    Unavailable(String),

    #[error("Malformed ledger response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Unavailable(err.to_string())
    }
}

/// Read surface of the loan ledger.
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// Fetch a single loan record.
    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>, LedgerError>;

    /// Fetch all loans where the given address participates.
    async fn get_user_loans(
        &self,
        address: &Address,
        is_borrower: bool,
        is_request_only: bool,
    ) -> Result<Vec<Loan>, LedgerError>;

    /// Fetch every loan on the contract. Used only by the reminder
    /// scheduler; a single bulk read, no per-loan network calls.
    async fn get_all_loans(&self) -> Result<Vec<Loan>, LedgerError>;

    /// Current transaction count for an account (the next nonce).
    async fn transaction_count(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Current network gas price in smallest units.
    async fn gas_price(&self) -> Result<u128, LedgerError>;
}

/// JSON-RPC implementation of [`LoanLedger`].
pub struct JsonRpcLedger {
    rpc_url: String,
    contract_address: String,
    client: Client,
}

impl JsonRpcLedger {
    pub fn new(rpc_url: String, contract_address: String, timeout: Duration) -> Self {
        Self {
            rpc_url,
            contract_address,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?
            .json::<Value>()
            .await?;

        if let Some(err) = resp.get("error") {
            return Err(LedgerError::Unavailable(format!(
                "RPC error from {}: {:?}",
                method, err
            )));
        }

        resp.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed(format!("No result in {} response", method)))
    }

    fn decode_loan_list(result: &Value) -> Result<Vec<Loan>, LedgerError> {
        let rows = result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("Expected a loan array".to_string()))?;

        rows.iter()
            .map(|row| {
                let tuple = row.as_array().ok_or_else(|| {
                    LedgerError::Malformed("Loan entry is not a tuple".to_string())
                })?;
                Loan::from_tuple(tuple)
            })
            .collect()
    }
}

/// Parse a hex quantity string (`"0x1b4"`) as returned by node-level methods.
fn parse_quantity(value: &Value, what: &str) -> Result<u128, LedgerError> {
    let raw = value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("{} is not a quantity string", what)))?;
    let hex = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Malformed(format!("{} is missing the 0x prefix", what)))?;
    u128::from_str_radix(hex, 16)
        .map_err(|_| LedgerError::Malformed(format!("{} is not valid hex", what)))
}

#[async_trait]
impl LoanLedger for JsonRpcLedger {
    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>, LedgerError> {
        let result = self
            .rpc("lend_getLoan", json!([self.contract_address, loan_id]))
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let tuple = result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("Loan record is not a tuple".to_string()))?;
        Loan::from_tuple(tuple).map(Some)
    }

    async fn get_user_loans(
        &self,
        address: &Address,
        is_borrower: bool,
        is_request_only: bool,
    ) -> Result<Vec<Loan>, LedgerError> {
        let result = self
            .rpc(
                "lend_getUserLoans",
                json!([
                    self.contract_address,
                    address.as_str(),
                    is_borrower,
                    is_request_only
                ]),
            )
            .await?;

        Self::decode_loan_list(&result)
    }

    async fn get_all_loans(&self) -> Result<Vec<Loan>, LedgerError> {
        let result = self
            .rpc("lend_getAllLoans", json!([self.contract_address]))
            .await?;

        Self::decode_loan_list(&result)
    }

    async fn transaction_count(&self, address: &Address) -> Result<u64, LedgerError> {
        let result = self
            .rpc(
                "eth_getTransactionCount",
                json!([address.as_str(), "pending"]),
            )
            .await?;

        parse_quantity(&result, "transaction count").map(|n| n as u64)
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        let result = self.rpc("eth_gasPrice", json!([])).await?;
        parse_quantity(&result, "gas price")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x0"), "q").unwrap(), 0);
        assert_eq!(parse_quantity(&json!("0x1b4"), "q").unwrap(), 436);
        assert!(parse_quantity(&json!("1b4"), "q").is_err());
        assert!(parse_quantity(&json!(436), "q").is_err());
        assert!(parse_quantity(&json!("0xzz"), "q").is_err());
    }

    #[test]
    fn test_decode_loan_list_rejects_non_array() {
        assert!(JsonRpcLedger::decode_loan_list(&json!("nope")).is_err());
        assert!(JsonRpcLedger::decode_loan_list(&json!([{"not": "a tuple"}])).is_err());
        assert!(JsonRpcLedger::decode_loan_list(&json!([])).unwrap().is_empty());
    }
}
