use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub design_id: Uuid,
    pub status: String,
    pub total_price: f64,
    pub ring_size: Option<String>,
    pub notes: Option<String>,
    pub estimated_ship: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductionStageRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stage: String,
    pub position: i16,
    pub status: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}
