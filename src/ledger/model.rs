//! Loan records as stored by the ledger contract
//!
//! The contract returns a loan as a positional 11-element tuple; the field
//! order is part of the contract surface and must not change:
//! `[loanId, borrower, lender, amount, collateral, status,
//!   renegotiationPending, dueDate, lastModifiedAt, proposedDueDate,
//!   createdAt]`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::LedgerError;
use crate::identity::Address;

/// On-ledger loan status.
///
/// Numeric values match the contract's enum discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Repaid,
    Rejected,
}

impl LoanStatus {
    pub fn from_discriminant(value: u64) -> Result<Self, LedgerError> {
        match value {
            0 => Ok(LoanStatus::Pending),
            1 => Ok(LoanStatus::Approved),
            2 => Ok(LoanStatus::Repaid),
            3 => Ok(LoanStatus::Rejected),
            other => Err(LedgerError::Malformed(format!(
                "Unknown loan status discriminant: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Approved => "Approved",
            LoanStatus::Repaid => "Repaid",
            LoanStatus::Rejected => "Rejected",
        }
    }
}

/// A loan record read from the ledger. Never persisted locally.
#[derive(Debug, Clone)]
pub struct Loan {
    pub loan_id: u64,
    pub borrower: Address,
    pub lender: Address,
    /// Amount in the ledger's smallest unit.
    pub amount: u128,
    pub collateral: String,
    pub status: LoanStatus,
    pub renegotiation_pending: bool,
    pub due_date: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    /// Meaningful only while `renegotiation_pending` is set.
    pub proposed_due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Decode a loan from the contract's positional tuple.
    pub fn from_tuple(values: &[Value]) -> Result<Self, LedgerError> {
        if values.len() != 11 {
            return Err(LedgerError::Malformed(format!(
                "Loan tuple has {} fields, expected 11",
                values.len()
            )));
        }

        Ok(Loan {
            loan_id: field_u64(&values[0], "loanId")?,
            borrower: field_address(&values[1], "borrowerAddress")?,
            lender: field_address(&values[2], "lenderAddress")?,
            amount: field_amount(&values[3], "amount")?,
            collateral: field_string(&values[4], "collateral")?,
            status: LoanStatus::from_discriminant(field_u64(&values[5], "status")?)?,
            renegotiation_pending: field_bool(&values[6], "renegotiationPending")?,
            due_date: field_timestamp(&values[7], "dueDate")?,
            last_modified_at: field_timestamp(&values[8], "lastModifiedAt")?,
            proposed_due_date: field_timestamp(&values[9], "proposedDueDate")?,
            created_at: field_timestamp(&values[10], "createdAt")?,
        })
    }
}

fn field_u64(value: &Value, name: &str) -> Result<u64, LedgerError> {
    value
        .as_u64()
        .ok_or_else(|| LedgerError::Malformed(format!("Field '{}' is not an unsigned integer", name)))
}

fn field_bool(value: &Value, name: &str) -> Result<bool, LedgerError> {
    value
        .as_bool()
        .ok_or_else(|| LedgerError::Malformed(format!("Field '{}' is not a boolean", name)))
}

fn field_string(value: &Value, name: &str) -> Result<String, LedgerError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LedgerError::Malformed(format!("Field '{}' is not a string", name)))
}

fn field_address(value: &Value, name: &str) -> Result<Address, LedgerError> {
    let raw = field_string(value, name)?;
    Address::parse(&raw)
        .map_err(|e| LedgerError::Malformed(format!("Field '{}': {}", name, e)))
}

/// Amounts travel as decimal strings so they survive any JSON tooling that
/// truncates large numbers.
fn field_amount(value: &Value, name: &str) -> Result<u128, LedgerError> {
    let raw = field_string(value, name)?;
    raw.parse::<u128>()
        .map_err(|_| LedgerError::Malformed(format!("Field '{}' is not a decimal amount", name)))
}

fn field_timestamp(value: &Value, name: &str) -> Result<DateTime<Utc>, LedgerError> {
    let secs = value
        .as_i64()
        .ok_or_else(|| LedgerError::Malformed(format!("Field '{}' is not a unix timestamp", name)))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| LedgerError::Malformed(format!("Field '{}' is out of range", name)))
}
