//! HTTP query surface for the proposal state cache.
//!
//! Provides endpoints for:
//! - Proposal states, optionally with the caller's vote flags
//! - Liveness
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handlers::{ProposalStatesQuery, StateSource};
pub use server::{RpcServer, RpcState};
