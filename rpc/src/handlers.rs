//! RPC request handlers.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use govsync_ledger::LedgerClient;
use govsync_store::{ProposalCacheStore, ProposalDirectory};
use govsync_sync::{ProposalStates, ProposalSync, SyncError, SyncRequest};
use govsync_types::Identity;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::RpcState;
use crate::RpcError;

/// Whatever answers proposal-state queries (the sync engine, or a stub).
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn proposal_states(&self, request: SyncRequest) -> Result<ProposalStates, SyncError>;
}

#[async_trait]
impl<D, C, L> StateSource for ProposalSync<D, C, L>
where
    D: ProposalDirectory + Send + Sync,
    C: ProposalCacheStore + Send + Sync,
    L: LedgerClient,
{
    async fn proposal_states(&self, request: SyncRequest) -> Result<ProposalStates, SyncError> {
        self.sync(request).await
    }
}

// ── Proposal states ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProposalStatesQuery {
    /// Wallet address to overlay vote flags for.
    pub user: Option<String>,
    /// Exactly `"true"` bypasses the cache TTL; any other value is ignored.
    pub force: Option<String>,
}

impl ProposalStatesQuery {
    pub fn into_request(self) -> Result<SyncRequest, RpcError> {
        let identity = match self.user.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<Identity>()
                    .map_err(|e| RpcError::InvalidRequest(e.to_string()))?,
            ),
        };
        let force = self.force.as_deref() == Some("true");
        Ok(SyncRequest::new(identity, force))
    }
}

pub async fn proposal_states(
    State(state): State<Arc<RpcState>>,
    Query(query): Query<ProposalStatesQuery>,
) -> Result<Json<ProposalStates>, RpcError> {
    let request = query.into_request()?;
    let states = state.source.proposal_states(request).await?;
    Ok(Json(states))
}

// ── Health ───────────────────────────────────────────────────────────────

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── Metrics ──────────────────────────────────────────────────────────────

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<impl IntoResponse, RpcError> {
    let metrics = state
        .metrics
        .as_ref()
        .ok_or_else(|| RpcError::NotFound("metrics are disabled".into()))?;
    let body = metrics
        .encode_text()
        .map_err(|e| RpcError::Server(format!("failed to encode metrics: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}
