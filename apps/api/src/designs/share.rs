//! Public share links for saved designs.
//!
//! A share token is an unguessable 32-hex-char string. Sharing is idempotent:
//! an already shared design returns its existing token.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::designs::handlers::{design_detail, StoredImage};
use crate::designs::repository;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub token: String,
    pub share_path: String,
}

/// What an anonymous viewer sees. Owner identity is left out.
#[derive(Debug, Serialize)]
pub struct SharedDesignView {
    pub id: Uuid,
    pub prompt: String,
    pub specifications: String,
    pub specs: Value,
    pub pricing: Value,
    pub created_at: DateTime<Utc>,
    pub images: Vec<StoredImage>,
}

pub fn new_share_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn share_path(token: &str) -> String {
    format!("/api/shared/{token}")
}

/// POST /api/designs/:id/share
pub async fn handle_share_design(
    State(state): State<AppState>,
    user: AuthUser,
    Path(design_id): Path<Uuid>,
) -> Result<Json<ShareResponse>, AppError> {
    repository::fetch_owned_design(&state.db, design_id, user.user_id).await?;

    let token = new_share_token();
    let share = repository::upsert_share(&state.db, design_id, &token).await?;
    if share.token == token {
        info!("Design {design_id} shared");
    }

    Ok(Json(ShareResponse {
        share_path: share_path(&share.token),
        token: share.token,
    }))
}

/// GET /api/shared/:token
pub async fn handle_get_shared(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SharedDesignView>, AppError> {
    let design = repository::fetch_shared_design(&state.db, &token).await?;
    let detail = design_detail(&state, design).await?;

    Ok(Json(SharedDesignView {
        id: detail.design.id,
        prompt: detail.design.prompt,
        specifications: detail.design.specifications,
        specs: detail.design.specs,
        pricing: detail.design.pricing,
        created_at: detail.design.created_at,
        images: detail.images,
    }))
}
