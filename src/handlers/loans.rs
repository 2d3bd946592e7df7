//! Loan API handlers
//!
//! Every mutating handler follows the same path: resolve the caller from the
//! bearer token, read the current loan record from the ledger, run the
//! lifecycle authorizer, then hand the authorized call to the transaction
//! builder. The unsigned transaction goes back to the caller for signing.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::identity::Address;
use crate::ledger::{units, ContractCall, Loan, LoanStatus};
use crate::lifecycle::{self, DenialReason, LoanAction};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

/// Request body for a new loan
#[derive(Debug, Deserialize, Validate)]
pub struct RequestLoanBody {
    pub lender_id: Uuid,
    /// Display-unit decimal amount, e.g. `"1.5"`
    #[validate(length(min = 1, message = "amount must not be empty"))]
    pub amount: String,
    #[validate(length(min = 1, message = "collateral must not be empty"))]
    pub collateral: String,
    /// Unix timestamp
    pub due_date: i64,
}

/// Request body naming an existing loan
#[derive(Debug, Deserialize)]
pub struct LoanActionBody {
    pub loan_id: u64,
}

/// Request body for a due-date renegotiation
#[derive(Debug, Deserialize)]
pub struct RenegotiationBody {
    pub loan_id: u64,
    /// Unix timestamp
    pub new_due_date: i64,
}

/// Query for the loan listing
#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    pub is_borrower: Option<bool>,
    pub is_request: Option<bool>,
}

/// Response carrying an unsigned transaction
#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub tx: crate::ledger::UnsignedTransaction,
}

/// A loan rendered for listing, with resolved display names and the amount
/// converted back to display units.
#[derive(Debug, Serialize)]
pub struct LoanView {
    pub loan_id: u64,
    pub borrower: Address,
    pub lender: Address,
    pub borrower_name: String,
    pub lender_name: String,
    pub amount: String,
    pub collateral: String,
    pub status: LoanStatus,
    pub renegotiation_pending: bool,
    pub due_date: DateTime<Utc>,
    pub proposed_due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

fn parse_timestamp(secs: i64, what: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ApiError::BadRequest(format!("{} is not a valid unix timestamp", what)))
}

fn denial_to_api(reason: DenialReason, action: LoanAction, loan: &Loan) -> ApiError {
    match reason {
        DenialReason::WrongRole => {
            let message = match action {
                LoanAction::Approve => "Only the lender can approve the loan",
                LoanAction::Reject => "Only the lender can reject the loan",
                LoanAction::Repay => "Only the borrower can repay the loan",
                LoanAction::RequestRenegotiation => {
                    "Only the borrower can request a renegotiation"
                }
                LoanAction::ApproveRenegotiation => {
                    "Only the lender can approve a renegotiation"
                }
            };
            ApiError::Forbidden(message.to_string())
        }
        DenialReason::InvalidState => ApiError::Conflict(format!(
            "Loan {} is {} and does not allow this action",
            loan.loan_id,
            loan.status.as_str()
        )),
        DenialReason::RenegotiationBlocksRepay => ApiError::Conflict(
            "A due-date renegotiation is pending; repay is blocked until it is resolved"
                .to_string(),
        ),
    }
}

/// Read the loan and run the lifecycle check. Authorization is resolved
/// against a fresh ledger read before any transaction is assembled.
async fn load_and_authorize(
    state: &AppState,
    user: &AuthenticatedUser,
    loan_id: u64,
    action: LoanAction,
) -> ApiResult<Loan> {
    let loan = state
        .ledger
        .get_loan(loan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", loan_id)))?;

    lifecycle::authorize(action, &user.address, &loan)
        .map_err(|reason| denial_to_api(reason, action, &loan))?;

    Ok(loan)
}

/// POST /loans/request
pub async fn request_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RequestLoanBody>,
) -> ApiResult<Json<TxResponse>> {
    body.validate()?;

    // Display units become ledger units here and nowhere else.
    let amount = units::to_ledger_units(&body.amount)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let due_date = parse_timestamp(body.due_date, "due_date")?;

    let lender = state
        .identity
        .resolve_address(body.lender_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Lender not found".to_string()))?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::RequestLoan {
                lender,
                amount,
                collateral: body.collateral,
                due_date,
            },
            0,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// POST /loans/approve — payable with the loan amount
pub async fn approve_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LoanActionBody>,
) -> ApiResult<Json<TxResponse>> {
    let loan = load_and_authorize(&state, &user, body.loan_id, LoanAction::Approve).await?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::ApproveLoan {
                loan_id: body.loan_id,
            },
            loan.amount,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// POST /loans/reject
pub async fn reject_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LoanActionBody>,
) -> ApiResult<Json<TxResponse>> {
    load_and_authorize(&state, &user, body.loan_id, LoanAction::Reject).await?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::RejectLoan {
                loan_id: body.loan_id,
            },
            0,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// POST /loans/repay — payable with the loan amount
pub async fn repay_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LoanActionBody>,
) -> ApiResult<Json<TxResponse>> {
    let loan = load_and_authorize(&state, &user, body.loan_id, LoanAction::Repay).await?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::RepayLoan {
                loan_id: body.loan_id,
            },
            loan.amount,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// POST /loans/request-renegotiation
pub async fn request_renegotiation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RenegotiationBody>,
) -> ApiResult<Json<TxResponse>> {
    let new_due_date = parse_timestamp(body.new_due_date, "new_due_date")?;

    load_and_authorize(&state, &user, body.loan_id, LoanAction::RequestRenegotiation).await?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::RequestDueDateRenegotiation {
                loan_id: body.loan_id,
                new_due_date,
            },
            0,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// POST /loans/approve-renegotiation
pub async fn approve_renegotiation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LoanActionBody>,
) -> ApiResult<Json<TxResponse>> {
    load_and_authorize(&state, &user, body.loan_id, LoanAction::ApproveRenegotiation).await?;

    let tx = state
        .tx_builder
        .build(
            &user.address,
            ContractCall::ApproveDueDateRenegotiation {
                loan_id: body.loan_id,
            },
            0,
        )
        .await?;

    Ok(Json(TxResponse { tx }))
}

/// GET /loans
pub async fn list_loans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListLoansQuery>,
) -> ApiResult<Json<Vec<LoanView>>> {
    let loans = state
        .ledger
        .get_user_loans(
            &user.address,
            query.is_borrower.unwrap_or(true),
            query.is_request.unwrap_or(false),
        )
        .await?;

    // The contract can return the same loan under multiple filters; keep
    // the first occurrence of each id.
    let mut seen = HashSet::new();
    let unique: Vec<&Loan> = loans
        .iter()
        .filter(|loan| seen.insert(loan.loan_id))
        .collect();

    // One batched lookup for all display names.
    let mut addresses = HashSet::new();
    for loan in &unique {
        addresses.insert(loan.borrower.clone());
        addresses.insert(loan.lender.clone());
    }

    let participants = state
        .identity
        .resolve_users(&addresses)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let display_name = |address: &Address| {
        participants
            .get(address)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    };

    let views = unique
        .into_iter()
        .map(|loan| LoanView {
            loan_id: loan.loan_id,
            borrower: loan.borrower.clone(),
            lender: loan.lender.clone(),
            borrower_name: display_name(&loan.borrower),
            lender_name: display_name(&loan.lender),
            amount: units::to_display_units(loan.amount),
            collateral: loan.collateral.clone(),
            status: loan.status,
            renegotiation_pending: loan.renegotiation_pending,
            due_date: loan.due_date,
            proposed_due_date: loan.proposed_due_date,
            created_at: loan.created_at,
            last_modified_at: loan.last_modified_at,
        })
        .collect();

    Ok(Json(views))
}
