//! API handlers for the PeerLend backend

pub mod loans;
pub mod notifications;

pub use loans::*;
pub use notifications::*;
