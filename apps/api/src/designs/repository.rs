use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::design::{DesignImageRow, DesignRow, SharedDesignRow};

/// Most designs returned by a list call.
pub const LIST_LIMIT: i64 = 50;

/// Column values for a new `designs` row.
pub struct NewDesign<'a> {
    pub user_id: Uuid,
    pub fingerprint_id: Uuid,
    pub prompt: &'a str,
    pub specifications: &'a str,
    pub specs: Value,
    pub pricing: Value,
    pub consistency_score: Option<i16>,
    pub complexity: i16,
}

pub async fn insert_design(pool: &PgPool, design: NewDesign<'_>) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO designs
            (id, user_id, fingerprint_id, prompt, specifications, specs, pricing,
             consistency_score, complexity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(design.user_id)
    .bind(design.fingerprint_id)
    .bind(design.prompt)
    .bind(design.specifications)
    .bind(&design.specs)
    .bind(&design.pricing)
    .bind(design.consistency_score)
    .bind(design.complexity)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn insert_image(
    pool: &PgPool,
    design_id: Uuid,
    view: &str,
    storage_key: &str,
    revised_prompt: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO design_images (design_id, view, storage_key, revised_prompt) VALUES ($1, $2, $3, $4)",
    )
    .bind(design_id)
    .bind(view)
    .bind(storage_key)
    .bind(revised_prompt)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetches a design only if `user_id` owns it.
pub async fn fetch_owned_design(
    pool: &PgPool,
    design_id: Uuid,
    user_id: Uuid,
) -> Result<DesignRow, AppError> {
    sqlx::query_as::<_, DesignRow>("SELECT * FROM designs WHERE id = $1 AND user_id = $2")
        .bind(design_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Design {design_id} not found")))
}

pub async fn list_designs(pool: &PgPool, user_id: Uuid) -> Result<Vec<DesignRow>, AppError> {
    let rows = sqlx::query_as::<_, DesignRow>(
        "SELECT * FROM designs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn images_for(pool: &PgPool, design_id: Uuid) -> Result<Vec<DesignImageRow>, AppError> {
    let rows = sqlx::query_as::<_, DesignImageRow>(
        "SELECT * FROM design_images WHERE design_id = $1 ORDER BY created_at, view",
    )
    .bind(design_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Deletes an owned design and returns the storage keys of its images.
/// Image and share rows go with it via `ON DELETE CASCADE`.
pub async fn delete_design(
    pool: &PgPool,
    design_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<String>, AppError> {
    let mut tx = pool.begin().await?;

    let keys: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT i.storage_key FROM design_images i
        JOIN designs d ON d.id = i.design_id
        WHERE d.id = $1 AND d.user_id = $2
        "#,
    )
    .bind(design_id)
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM designs WHERE id = $1 AND user_id = $2")
        .bind(design_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound(format!("Design {design_id} not found")));
    }

    tx.commit().await?;
    Ok(keys)
}

/// A design has at most one share row; a concurrent second share gets the first token back.
const UPSERT_SHARE_SQL: &str = r#"
    INSERT INTO shared_designs (design_id, token)
    VALUES ($1, $2)
    ON CONFLICT (design_id) DO UPDATE SET design_id = EXCLUDED.design_id
    RETURNING *
"#;

/// Returns the design's share row, creating it with `token` if none exists.
pub async fn upsert_share(
    pool: &PgPool,
    design_id: Uuid,
    token: &str,
) -> Result<SharedDesignRow, AppError> {
    let row = sqlx::query_as::<_, SharedDesignRow>(UPSERT_SHARE_SQL)
        .bind(design_id)
        .bind(token)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn fetch_shared_design(pool: &PgPool, token: &str) -> Result<DesignRow, AppError> {
    sqlx::query_as::<_, DesignRow>(
        r#"
        SELECT d.* FROM designs d
        JOIN shared_designs s ON s.design_id = d.id
        WHERE s.token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Shared design not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_upsert_keeps_existing_token() {
        assert!(UPSERT_SHARE_SQL.contains("ON CONFLICT (design_id) DO UPDATE"));
        assert!(!UPSERT_SHARE_SQL.contains("token = EXCLUDED"));
        assert!(UPSERT_SHARE_SQL.trim_end().ends_with("RETURNING *"));
    }

    #[test]
    fn test_one_share_row_per_design() {
        let schema = include_str!("../../migrations/0001_init.sql");
        let table = schema
            .split("CREATE TABLE")
            .find(|t| t.contains("shared_designs ("))
            .unwrap();
        assert!(table.contains("design_id  UUID NOT NULL UNIQUE REFERENCES designs"));
    }
}
