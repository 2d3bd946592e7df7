//! Participant identity: canonical addresses and userId ↔ address resolution

mod address;
mod resolver;

pub use address::{Address, AddressError};
pub use resolver::{IdentityResolver, Participant};
