//! Client-side contract against the external loan ledger

mod client;
mod model;
mod tx;
pub mod units;

pub use client::{JsonRpcLedger, LedgerError, LoanLedger};
pub use model::{Loan, LoanStatus};
pub use tx::{ContractCall, TxBuilder, UnsignedTransaction};
