//! Read-only ledger access for proposal state synchronization.
//!
//! - [`LedgerClient`] is the ledger read interface: one batched round trip,
//!   positional results, each call succeeding or failing on its own.
//! - [`JsonRpcLedger`] implements it with a JSON-RPC 2.0 batch of `eth_call`s.
//! - [`BatchedLedgerReader`] turns proposal ids into Governor calls, bounds
//!   each batch with a timeout and decodes the return data into typed values.

pub mod abi;
pub mod call;
pub mod client;
pub mod error;
pub mod json_rpc;
pub mod reader;

pub use call::{CallArg, CallOutcome, LedgerCall, LedgerMethod};
pub use client::LedgerClient;
pub use error::{CallError, LedgerError, ReadError};
pub use json_rpc::JsonRpcLedger;
pub use reader::{BatchedLedgerReader, ReadResults};
