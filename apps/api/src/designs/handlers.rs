use std::collections::HashSet;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::design::generator::MAX_PROMPT_CHARS;
use crate::design::manufacturing::calculate_complexity;
use crate::design::pricing::estimate_price;
use crate::design::prompts::ViewAngle;
use crate::design::specs::parse_jewelry_specs;
use crate::designs::repository::{self, NewDesign};
use crate::designs::storage::{delete_images, persist_image, public_url};
use crate::errors::AppError;
use crate::models::design::{DesignImageRow, DesignRow};
use crate::state::AppState;

pub const MAX_SAVED_IMAGES: usize = 4;

/// Hosts the image provider serves renders from. Saved images are only fetched from these.
pub const ALLOWED_IMAGE_HOSTS: &[&str] = &["oaidalleapiprodscus.blob.core.windows.net"];

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SaveImageRequest {
    pub view: ViewAngle,
    pub url: String,
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDesignRequest {
    pub prompt: String,
    pub fingerprint_id: Uuid,
    pub specifications: String,
    pub consistency_score: Option<u8>,
    pub images: Vec<SaveImageRequest>,
}

#[derive(Debug, Serialize)]
pub struct SaveDesignResponse {
    pub design_id: Uuid,
    pub images_saved: usize,
    pub images_failed: Vec<String>,
}

#[derive(Deserialize)]
pub struct DesignIdQuery {
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StoredImage {
    pub view: String,
    pub url: String,
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DesignDetail {
    #[serde(flatten)]
    pub design: DesignRow,
    pub images: Vec<StoredImage>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DesignsResponse {
    One(DesignDetail),
    Many { designs: Vec<DesignRow> },
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

pub fn validate_save_request(req: &SaveDesignRequest) -> Result<(), AppError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt must not be empty".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "prompt exceeds {MAX_PROMPT_CHARS} characters"
        )));
    }
    if req.images.is_empty() || req.images.len() > MAX_SAVED_IMAGES {
        return Err(AppError::Validation(format!(
            "a design needs between 1 and {MAX_SAVED_IMAGES} images"
        )));
    }
    if let Some(score) = req.consistency_score {
        if score > 100 {
            return Err(AppError::Validation(
                "consistency_score must be between 0 and 100".to_string(),
            ));
        }
    }

    let mut seen = HashSet::new();
    for image in &req.images {
        check_image_source(image)?;
        if !seen.insert(image.view) {
            return Err(AppError::Validation(format!(
                "duplicate {} view",
                image.view.as_str()
            )));
        }
    }
    Ok(())
}

fn check_image_source(image: &SaveImageRequest) -> Result<(), AppError> {
    let view = image.view.as_str();
    let url = Url::parse(&image.url)
        .map_err(|_| AppError::Validation(format!("image url for {view} view is malformed")))?;
    if url.scheme() != "https" {
        return Err(AppError::Validation(format!(
            "image url for {view} view must use https"
        )));
    }
    let host_allowed = url
        .host_str()
        .is_some_and(|host| ALLOWED_IMAGE_HOSTS.contains(&host));
    if !host_allowed || url.port().is_some() || !url.username().is_empty() {
        return Err(AppError::Validation(format!(
            "image url for {view} view is not from the image provider"
        )));
    }
    Ok(())
}

fn stored_images(state: &AppState, rows: Vec<DesignImageRow>) -> Vec<StoredImage> {
    rows.into_iter()
        .map(|row| StoredImage {
            url: public_url(&state.config.s3_endpoint, &state.config.s3_bucket, &row.storage_key),
            view: row.view,
            revised_prompt: row.revised_prompt,
        })
        .collect()
}

pub async fn design_detail(state: &AppState, design: DesignRow) -> Result<DesignDetail, AppError> {
    let images = repository::images_for(&state.db, design.id).await?;
    Ok(DesignDetail {
        images: stored_images(state, images),
        design,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/designs/save
///
/// Specs, pricing and complexity are recomputed from the prompt; the client
/// only supplies what the server cannot rebuild (generated text and renders).
pub async fn handle_save_design(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SaveDesignRequest>,
) -> Result<(StatusCode, Json<SaveDesignResponse>), AppError> {
    validate_save_request(&req)?;

    let prompt = req.prompt.trim();
    let specs = parse_jewelry_specs(prompt);
    let pricing = estimate_price(&specs, state.spot_prices.as_ref()).await;
    let complexity = calculate_complexity(prompt);

    let design_id = repository::insert_design(
        &state.db,
        NewDesign {
            user_id: user.user_id,
            fingerprint_id: req.fingerprint_id,
            prompt,
            specifications: &req.specifications,
            specs: serde_json::to_value(&specs).map_err(anyhow::Error::from)?,
            pricing: serde_json::to_value(&pricing).map_err(anyhow::Error::from)?,
            consistency_score: req.consistency_score.map(i16::from),
            complexity: i16::from(complexity),
        },
    )
    .await?;

    let uploads = req.images.iter().map(|image| {
        let state = &state;
        async move {
            let view = image.view.as_str();
            let key = persist_image(
                &state.openai,
                &state.s3,
                &state.config.s3_bucket,
                design_id,
                view,
                &image.url,
            )
            .await?;
            repository::insert_image(
                &state.db,
                design_id,
                view,
                &key,
                image.revised_prompt.as_deref(),
            )
            .await
        }
    });

    let mut images_saved = 0;
    let mut images_failed = Vec::new();
    for (image, outcome) in req.images.iter().zip(join_all(uploads).await) {
        match outcome {
            Ok(()) => images_saved += 1,
            Err(e) => {
                warn!("Design {design_id}: {} image not saved: {e}", image.view.as_str());
                images_failed.push(image.view.as_str().to_string());
            }
        }
    }

    info!(
        "Saved design {design_id} for user {}: {images_saved} images, {} failed",
        user.user_id,
        images_failed.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(SaveDesignResponse {
            design_id,
            images_saved,
            images_failed,
        }),
    ))
}

/// GET /api/designs/save
/// With `?id=` returns that design and its images, otherwise the caller's designs.
pub async fn handle_get_designs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<DesignIdQuery>,
) -> Result<Json<DesignsResponse>, AppError> {
    match params.id {
        Some(id) => {
            let design = repository::fetch_owned_design(&state.db, id, user.user_id).await?;
            Ok(Json(DesignsResponse::One(design_detail(&state, design).await?)))
        }
        None => {
            let designs = repository::list_designs(&state.db, user.user_id).await?;
            Ok(Json(DesignsResponse::Many { designs }))
        }
    }
}

/// DELETE /api/designs/save?id=
pub async fn handle_delete_design(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<DesignIdQuery>,
) -> Result<StatusCode, AppError> {
    let id = params
        .id
        .ok_or_else(|| AppError::Validation("id query parameter is required".to_string()))?;

    let keys = repository::delete_design(&state.db, id, user.user_id).await?;
    delete_images(&state.s3, &state.config.s3_bucket, &keys).await;

    info!("Deleted design {id} ({} stored images)", keys.len());
    Ok(StatusCode::NO_CONTENT)
}
