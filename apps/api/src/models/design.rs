use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DesignRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fingerprint_id: Uuid,
    pub prompt: String,
    pub specifications: String,
    pub specs: Value,
    pub pricing: Value,
    pub consistency_score: Option<i16>,
    pub complexity: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DesignImageRow {
    pub id: Uuid,
    pub design_id: Uuid,
    pub view: String,
    pub storage_key: String,
    pub revised_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedDesignRow {
    pub id: Uuid,
    pub design_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}
