//! Unsigned transaction assembly
//!
//! An authorized loan action becomes an unsigned transaction: nonce and gas
//! price come from fresh node reads, the gas limit is a fixed ceiling, and
//! the value field carries the loan amount for the payable calls. The
//! service never signs; the payload goes back to the caller for external
//! signing and broadcast.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{LedgerError, LoanLedger};
use crate::identity::Address;

/// A call against the loan contract, parameters in contract order.
#[derive(Debug, Clone)]
pub enum ContractCall {
    RequestLoan {
        lender: Address,
        amount: u128,
        collateral: String,
        due_date: DateTime<Utc>,
    },
    ApproveLoan {
        loan_id: u64,
    },
    RejectLoan {
        loan_id: u64,
    },
    RepayLoan {
        loan_id: u64,
    },
    RequestDueDateRenegotiation {
        loan_id: u64,
        new_due_date: DateTime<Utc>,
    },
    ApproveDueDateRenegotiation {
        loan_id: u64,
    },
}

impl ContractCall {
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::RequestLoan { .. } => "requestLoan",
            ContractCall::ApproveLoan { .. } => "approveLoan",
            ContractCall::RejectLoan { .. } => "rejectLoan",
            ContractCall::RepayLoan { .. } => "repayLoan",
            ContractCall::RequestDueDateRenegotiation { .. } => "requestDueDateRenegotiation",
            ContractCall::ApproveDueDateRenegotiation { .. } => "approveDueDateRenegotiation",
        }
    }

    /// Positional parameters, exactly the contract's declared order.
    pub fn params(&self) -> Vec<Value> {
        match self {
            ContractCall::RequestLoan {
                lender,
                amount,
                collateral,
                due_date,
            } => vec![
                json!(lender.as_str()),
                json!(amount.to_string()),
                json!(collateral),
                json!(due_date.timestamp()),
            ],
            ContractCall::ApproveLoan { loan_id }
            | ContractCall::RejectLoan { loan_id }
            | ContractCall::RepayLoan { loan_id }
            | ContractCall::ApproveDueDateRenegotiation { loan_id } => {
                vec![json!(loan_id)]
            }
            ContractCall::RequestDueDateRenegotiation {
                loan_id,
                new_due_date,
            } => vec![json!(loan_id), json!(new_due_date.timestamp())],
        }
    }
}

/// An unsigned transaction payload, complete except for the signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: String,
    pub nonce: u64,
    pub gas: u64,
    /// Quantities are serialized as decimal strings.
    pub gas_price: String,
    pub value: String,
    pub call: CallPayload,
}

/// The contract call carried in the transaction body.
#[derive(Debug, Clone, Serialize)]
pub struct CallPayload {
    pub method: String,
    pub params: Vec<Value>,
}

/// Assembles unsigned transactions from authorized contract calls.
pub struct TxBuilder {
    ledger: Arc<dyn LoanLedger>,
    contract_address: String,
    gas_limit: u64,
}

impl TxBuilder {
    pub fn new(ledger: Arc<dyn LoanLedger>, contract_address: String, gas_limit: u64) -> Self {
        Self {
            ledger,
            contract_address,
            gas_limit,
        }
    }

    /// Build an unsigned transaction for `caller`. `value` is the payable
    /// amount: the loan amount when approving or repaying, zero otherwise.
    pub async fn build(
        &self,
        caller: &Address,
        call: ContractCall,
        value: u128,
    ) -> Result<UnsignedTransaction, LedgerError> {
        let nonce = self.ledger.transaction_count(caller).await?;
        let gas_price = self.ledger.gas_price().await?;

        Ok(UnsignedTransaction {
            from: caller.clone(),
            to: self.contract_address.clone(),
            nonce,
            gas: self.gas_limit,
            gas_price: gas_price.to_string(),
            value: value.to_string(),
            call: CallPayload {
                method: call.method().to_string(),
                params: call.params(),
            },
        })
    }
}
