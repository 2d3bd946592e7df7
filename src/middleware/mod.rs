//! HTTP middleware for PeerLend

pub mod auth;

pub use auth::{AuthenticatedUser, JwtVerifier};
