//! Token-guarded index maintenance endpoints.
//!
//! All of them require `Authorization: Bearer <REINDEX_TOKEN>` and answer
//! 401 when no token is configured.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use brico_core::ProductId;

use crate::catalog::CatalogStore;
use crate::error::{AppError, Result};
use crate::search::{SearchBackend, spawn_reindex};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReindexQuery {
    /// Block until the reindex finishes and return its report.
    pub wait: Option<String>,
}

impl ReindexQuery {
    /// `1` or `true`; anything else means do not wait.
    #[must_use]
    pub fn wait(&self) -> bool {
        matches!(self.wait.as_deref().map(str::trim), Some("1" | "true"))
    }
}

/// Compare in time independent of where the first difference is.
fn tokens_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn authorize<S: CatalogStore, B: SearchBackend>(
    state: &AppState<S, B>,
    headers: &HeaderMap,
) -> Result<()> {
    let Some(expected) = state.options().reindex_token.as_ref() else {
        return Err(AppError::Unauthorized("reindex is disabled".to_string()));
    };
    let given = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match given {
        Some(token) if tokens_match(token.as_bytes(), expected.expose_secret().as_bytes()) => {
            Ok(())
        }
        _ => Err(AppError::Unauthorized("invalid token".to_string())),
    }
}

/// `POST /api/reindex[?wait=true]`
///
/// Starts a full rebuild in the background and answers 202. With
/// `wait=true` the response is held until the rebuild ends. Only one
/// rebuild runs at a time; a second request gets 409.
pub async fn reindex<S, B>(
    State(state): State<AppState<S, B>>,
    Query(query): Query<ReindexQuery>,
    headers: HeaderMap,
) -> Result<Response>
where
    S: CatalogStore + Clone + 'static,
    B: SearchBackend + Clone + 'static,
{
    authorize(&state, &headers)?;
    let Some(slot) = state.try_start_reindex() else {
        return Err(AppError::Conflict("a reindex is already running".to_string()));
    };

    let options = state.options();
    let handle = spawn_reindex(
        state.store().clone(),
        state.backend().clone(),
        options.index_settings.clone(),
        options.indexer.clone(),
    );

    // The slot travels with the rebuild, not with this request, so a client
    // that hangs up on `wait=true` cannot free it early.
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _slot = slot;
        // Nobody listens unless the caller is waiting.
        let _ = done_tx.send(handle.await);
    });

    if query.wait() {
        let report = done_rx
            .await
            .map_err(|e| AppError::Internal(format!("reindex task dropped: {e}")))?
            .map_err(|e| AppError::Internal(format!("reindex task failed: {e}")))??;
        return Ok(Json(json!({ "ok": true, "report": report })).into_response());
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "ok": true, "status": "started" }))).into_response())
}

/// `POST /api/index/products/{id}` - refresh one product's document.
pub async fn upsert_product<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(id): Path<ProductId>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    authorize(&state, &headers)?;
    let indexed = state.indexer().upsert_product(id).await?;
    Ok(Json(json!({ "ok": true, "indexed": indexed })))
}

/// `DELETE /api/index/products/{id}`
pub async fn delete_product<S: CatalogStore, B: SearchBackend>(
    State(state): State<AppState<S, B>>,
    Path(id): Path<ProductId>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    authorize(&state, &headers)?;
    state.indexer().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_flag_is_lenient() {
        let wait = |v: Option<&str>| ReindexQuery { wait: v.map(str::to_owned) }.wait();
        assert!(wait(Some("true")));
        assert!(wait(Some("1")));
        assert!(!wait(Some("yes please")));
        assert!(!wait(Some("0")));
        assert!(!wait(None));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(b"abc123", b"abc123"));
        assert!(!tokens_match(b"abc124", b"abc123"));
        assert!(!tokens_match(b"abc", b"abc123"));
        assert!(!tokens_match(b"", b"abc"));
    }
}
