//! Loan lifecycle authorization
//!
//! A single, centrally-defined transition table decides every loan action.
//! The check is pure: given the action, the caller's canonical address, and
//! a point-in-time loan record, it permits or denies with a specific reason.
//! The ledger remains the final arbiter of concurrent writes; this check is
//! advisory against the record it was handed.

use crate::identity::Address;
use crate::ledger::{Loan, LoanStatus};

/// An action against an existing loan.
///
/// Requesting a new loan is not listed here: with no loan on the ledger yet
/// there is nothing to authorize beyond resolving the lender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Approve,
    Reject,
    Repay,
    RequestRenegotiation,
    ApproveRenegotiation,
}

/// The loan party an action demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Borrower,
    Lender,
}

/// Why an action was denied. Distinct values so callers can render precise
/// messages; never collapsed into one generic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Caller's address does not match the role the action requires.
    WrongRole,
    /// The loan's current status/flag combination does not allow the action.
    InvalidState,
    /// Repay attempted while a renegotiation is pending.
    RenegotiationBlocksRepay,
}

/// One row of the transition table.
struct Transition {
    action: LoanAction,
    from: LoanStatus,
    /// Required value of `renegotiation_pending`, if the action cares.
    renegotiation_pending: Option<bool>,
    /// Status after the ledger applies the action. Kept in the table so the
    /// whole state machine is visible in one place.
    to: LoanStatus,
}

/// The complete state machine. Any (status, flag, action) combination with
/// no matching row is denied.
const TRANSITIONS: &[Transition] = &[
    Transition {
        action: LoanAction::Approve,
        from: LoanStatus::Pending,
        renegotiation_pending: None,
        to: LoanStatus::Approved,
    },
    Transition {
        action: LoanAction::Reject,
        from: LoanStatus::Pending,
        renegotiation_pending: None,
        to: LoanStatus::Rejected,
    },
    Transition {
        action: LoanAction::Repay,
        from: LoanStatus::Approved,
        renegotiation_pending: Some(false),
        to: LoanStatus::Repaid,
    },
    Transition {
        action: LoanAction::RequestRenegotiation,
        from: LoanStatus::Approved,
        renegotiation_pending: Some(false),
        to: LoanStatus::Approved,
    },
    Transition {
        action: LoanAction::ApproveRenegotiation,
        from: LoanStatus::Approved,
        renegotiation_pending: Some(true),
        to: LoanStatus::Approved,
    },
];

impl LoanAction {
    /// The party that may perform this action.
    pub fn required_role(&self) -> Role {
        match self {
            LoanAction::Approve | LoanAction::Reject | LoanAction::ApproveRenegotiation => {
                Role::Lender
            }
            LoanAction::Repay | LoanAction::RequestRenegotiation => Role::Borrower,
        }
    }
}

/// Decide whether `caller` may perform `action` on `loan`.
///
/// Role is checked before state, so an outsider probing a loan learns only
/// that they are not a party to it.
pub fn authorize(action: LoanAction, caller: &Address, loan: &Loan) -> Result<(), DenialReason> {
    let required = match action.required_role() {
        Role::Borrower => &loan.borrower,
        Role::Lender => &loan.lender,
    };

    if caller != required {
        return Err(DenialReason::WrongRole);
    }

    let matched = TRANSITIONS.iter().any(|t| {
        t.action == action
            && t.from == loan.status
            && t.renegotiation_pending
                .map_or(true, |flag| flag == loan.renegotiation_pending)
    });

    if matched {
        return Ok(());
    }

    // Repay on an otherwise-repayable loan blocked only by the pending
    // renegotiation gets its own reason.
    if action == LoanAction::Repay
        && loan.status == LoanStatus::Approved
        && loan.renegotiation_pending
    {
        return Err(DenialReason::RenegotiationBlocksRepay);
    }

    Err(DenialReason::InvalidState)
}

/// The status a permitted action results in. Exposed for response rendering
/// and invariant tests; the ledger computes the real transition.
pub fn resulting_status(action: LoanAction, from: LoanStatus) -> Option<LoanStatus> {
    TRANSITIONS
        .iter()
        .find(|t| t.action == action && t.from == from)
        .map(|t| t.to)
}
