use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::design::manufacturing::estimate_production_days;
use crate::design::pricing::PricingBreakdown;
use crate::design::specs::{JewelrySpecs, JewelryType};
use crate::designs::repository::fetch_owned_design;
use crate::errors::AppError;
use crate::models::order::{OrderRow, ProductionStageRow};
use crate::orders::schedule::{build_production_schedule, ProductionSchedule, STAGE_PENDING};
use crate::state::AppState;

/// Orders wait here until payment is captured; payment itself is not wired up.
pub const STATUS_PENDING_PAYMENT: &str = "pending_payment";
pub const MAX_NOTES_CHARS: usize = 500;
pub const MIN_RING_SIZE: f64 = 3.0;
pub const MAX_RING_SIZE: f64 = 15.0;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub design_id: Uuid,
    pub ring_size: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRow,
    pub stages: Vec<ProductionStageRow>,
}

/// US ring sizes in quarter steps.
pub fn validate_ring_size(raw: &str) -> Result<String, AppError> {
    let size: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("ring size '{raw}' is not a number")))?;
    if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&size) || (size * 4.0).fract() != 0.0 {
        return Err(AppError::Validation(format!(
            "ring size must be between {MIN_RING_SIZE} and {MAX_RING_SIZE} in quarter sizes"
        )));
    }
    Ok(raw.trim().to_string())
}

pub fn validate_order_request(
    req: &CreateOrderRequest,
    jewelry_type: JewelryType,
) -> Result<Option<String>, AppError> {
    if let Some(notes) = &req.notes {
        if notes.chars().count() > MAX_NOTES_CHARS {
            return Err(AppError::Validation(format!(
                "notes exceed {MAX_NOTES_CHARS} characters"
            )));
        }
    }
    match (&req.ring_size, jewelry_type) {
        (Some(raw), JewelryType::Ring) => validate_ring_size(raw).map(Some),
        (None, JewelryType::Ring) => Err(AppError::Validation(
            "ring_size is required for rings".to_string(),
        )),
        _ => Ok(None),
    }
}

async fn insert_order(
    pool: &PgPool,
    user_id: Uuid,
    design_id: Uuid,
    total_price: f64,
    ring_size: Option<String>,
    notes: Option<String>,
    schedule: &ProductionSchedule,
) -> Result<OrderDetail, AppError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, OrderRow>(
        r#"
        INSERT INTO orders (user_id, design_id, status, total_price, ring_size, notes, estimated_ship)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(design_id)
    .bind(STATUS_PENDING_PAYMENT)
    .bind(total_price)
    .bind(ring_size)
    .bind(notes)
    .bind(schedule.estimated_ship)
    .fetch_one(&mut *tx)
    .await?;

    let mut stages = Vec::with_capacity(schedule.stages.len());
    for planned in &schedule.stages {
        let stage = sqlx::query_as::<_, ProductionStageRow>(
            r#"
            INSERT INTO production_stages (order_id, stage, position, status, starts_on, ends_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(planned.stage)
        .bind(planned.position)
        .bind(STAGE_PENDING)
        .bind(planned.starts_on)
        .bind(planned.ends_on)
        .fetch_one(&mut *tx)
        .await?;
        stages.push(stage);
    }

    tx.commit().await?;
    Ok(OrderDetail { order, stages })
}

fn order_start_date() -> NaiveDate {
    Utc::now().date_naive()
}

/// POST /api/orders
pub async fn handle_create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    let design = fetch_owned_design(&state.db, req.design_id, user.user_id).await?;

    let specs: JewelrySpecs = serde_json::from_value(design.specs.clone())
        .map_err(|e| anyhow::anyhow!("stored specs for design {} are unreadable: {e}", design.id))?;
    let pricing: PricingBreakdown = serde_json::from_value(design.pricing.clone())
        .map_err(|e| anyhow::anyhow!("stored pricing for design {} is unreadable: {e}", design.id))?;

    let ring_size = validate_order_request(&req, specs.jewelry_type)?;
    let complexity = u8::try_from(design.complexity).unwrap_or(1);
    let schedule =
        build_production_schedule(order_start_date(), estimate_production_days(complexity));

    let detail = insert_order(
        &state.db,
        user.user_id,
        design.id,
        pricing.final_price,
        ring_size,
        req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        &schedule,
    )
    .await?;

    info!(
        "Order {} placed for design {} (${:.2}, ships {})",
        detail.order.id, design.id, detail.order.total_price, detail.order.estimated_ship
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/orders/:id
pub async fn handle_get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    let stages = sqlx::query_as::<_, ProductionStageRow>(
        "SELECT * FROM production_stages WHERE order_id = $1 ORDER BY position",
    )
    .bind(order.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(OrderDetail { order, stages }))
}
