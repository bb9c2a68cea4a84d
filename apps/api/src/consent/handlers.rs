use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::consent::ConsentType;
use crate::errors::AppError;
use crate::models::consent::ConsentLogRow;
use crate::state::AppState;

pub const MAX_POLICY_VERSION_CHARS: usize = 32;
const MAX_USER_AGENT_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
pub struct RecordConsentRequest {
    pub consent_type: ConsentType,
    pub granted: bool,
    pub policy_version: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConsentRequest {
    pub consent_type: ConsentType,
    pub granted: bool,
}

#[derive(Debug, Serialize)]
pub struct ConsentStateResponse {
    pub consents: Vec<ConsentLogRow>,
}

pub fn validate_policy_version(version: &str) -> Result<&str, AppError> {
    let version = version.trim();
    if version.is_empty() || version.chars().count() > MAX_POLICY_VERSION_CHARS {
        return Err(AppError::Validation(format!(
            "policy_version must be 1 to {MAX_POLICY_VERSION_CHARS} characters"
        )));
    }
    Ok(version)
}

/// Essential consent covers what the service cannot run without; it can be recorded but not withheld.
pub fn check_withdrawable(consent_type: ConsentType, granted: bool) -> Result<(), AppError> {
    if consent_type == ConsentType::Essential && !granted {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_CHARS).collect())
}

async fn append_consent(
    pool: &PgPool,
    user_id: Uuid,
    consent_type: ConsentType,
    granted: bool,
    policy_version: &str,
    user_agent: Option<String>,
) -> Result<ConsentLogRow, AppError> {
    let row = sqlx::query_as::<_, ConsentLogRow>(
        r#"
        INSERT INTO gdpr_consent_log (user_id, consent_type, granted, policy_version, user_agent)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(consent_type.as_str())
    .bind(granted)
    .bind(policy_version)
    .bind(user_agent)
    .fetch_one(pool)
    .await?;

    info!(
        "Consent {} for user {user_id}: granted={granted} (policy {policy_version})",
        consent_type.as_str()
    );
    Ok(row)
}

async fn latest_consent(
    pool: &PgPool,
    user_id: Uuid,
    consent_type: ConsentType,
) -> Result<Option<ConsentLogRow>, AppError> {
    Ok(sqlx::query_as::<_, ConsentLogRow>(
        r#"
        SELECT * FROM gdpr_consent_log
        WHERE user_id = $1 AND consent_type = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(consent_type.as_str())
    .fetch_optional(pool)
    .await?)
}

/// POST /api/user/consent
pub async fn handle_record_consent(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(req): Json<RecordConsentRequest>,
) -> Result<(StatusCode, Json<ConsentLogRow>), AppError> {
    let policy_version = validate_policy_version(&req.policy_version)?;
    check_withdrawable(req.consent_type, req.granted)?;
    let row = append_consent(
        &state.db,
        user.user_id,
        req.consent_type,
        req.granted,
        policy_version,
        user_agent(&headers),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/user/consent
/// Newest row per consent type.
pub async fn handle_get_consent(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ConsentStateResponse>, AppError> {
    let consents = sqlx::query_as::<_, ConsentLogRow>(
        r#"
        SELECT DISTINCT ON (consent_type) *
        FROM gdpr_consent_log
        WHERE user_id = $1
        ORDER BY consent_type, created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ConsentStateResponse { consents }))
}

/// PATCH /api/user/consent
/// Withdraws or re-grants under the policy version of the previous record.
pub async fn handle_update_consent(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(req): Json<UpdateConsentRequest>,
) -> Result<Json<ConsentLogRow>, AppError> {
    check_withdrawable(req.consent_type, req.granted)?;
    let previous = latest_consent(&state.db, user.user_id, req.consent_type)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No {} consent on record",
                req.consent_type.as_str()
            ))
        })?;

    let row = append_consent(
        &state.db,
        user.user_id,
        req.consent_type,
        req.granted,
        &previous.policy_version,
        user_agent(&headers),
    )
    .await?;
    Ok(Json(row))
}
