//! Route definitions for the PeerLend API

mod loan;
mod notification;

pub use loan::loan_routes;
pub use notification::notification_routes;
