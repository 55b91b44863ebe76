//! Public share link handlers.
//!
//! Every handler loads the visitor's [`ShareSession`], hands it to the
//! gateway, and lets the gateway decide. Nothing here touches the store
//! directly.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::CustomerStore;
use crate::error::Result;
use crate::models::{CustomerShareView, ShareSession, VisitView, session_keys};
use crate::state::AppState;

/// Unlock request body.
#[derive(Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the share unlocks from the session.
async fn load_share_session(session: &Session) -> Result<ShareSession> {
    Ok(session
        .get::<ShareSession>(session_keys::SHARE_UNLOCKS)
        .await?
        .unwrap_or_default())
}

/// Store the share unlocks in the session.
async fn save_share_session(session: &Session, unlocks: &ShareSession) -> Result<()> {
    session.insert(session_keys::SHARE_UNLOCKS, unlocks).await?;
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the shared customer.
pub async fn show<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
    session: Session,
) -> Result<Json<CustomerShareView>> {
    let unlocks = load_share_session(&session).await?;
    let view = state.gateway().resolve_by_token(&code, &unlocks).await?;
    Ok(Json(view))
}

/// Verify the share password and remember the unlock for this session.
///
/// Open links need no unlock, so no session is created for them.
pub async fn unlock<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
    session: Session,
    Json(body): Json<UnlockRequest>,
) -> Result<StatusCode> {
    let mut unlocks = load_share_session(&session).await?;
    let changed = state
        .gateway()
        .unlock(&code, &body.password, &mut unlocks)
        .await?;
    if changed {
        save_share_session(&session, &unlocks).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// List the shared customer's completed visits.
pub async fn visits<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
    session: Session,
) -> Result<Json<Vec<VisitView>>> {
    let unlocks = load_share_session(&session).await?;
    let visits = state.gateway().completed_visits(&code, &unlocks).await?;
    Ok(Json(visits))
}

/// Show one visit of the shared customer.
pub async fn visit<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Path((code, visit_id)): Path<(String, String)>,
    session: Session,
) -> Result<Json<VisitView>> {
    let unlocks = load_share_session(&session).await?;
    let visit = state.gateway().visit(&code, &visit_id, &unlocks).await?;
    Ok(Json(visit))
}
