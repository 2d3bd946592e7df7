//! PeerLend Backend Library
//!
//! This library exports the core modules for the PeerLend backend server:
//! loan lifecycle authorization against an external ledger, unsigned
//! transaction assembly, and due-date reminder scheduling.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod ledger;
pub mod lifecycle;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod state;
