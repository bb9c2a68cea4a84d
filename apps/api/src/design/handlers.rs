use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::design::custom_text::{
    extract_custom_elements, validate_prompt_inclusion, DesignElements, PromptValidation,
};
use crate::design::generator::{
    generate_design, GenerateDesignRequest, GenerateDesignResponse, GenerationSettings,
    MAX_PROMPT_CHARS,
};
use crate::design::manufacturing::{
    calculate_complexity, estimate_production_days, validate_design_for_production,
    ProductionValidation,
};
use crate::design::pricing::{estimate_price, PricingBreakdown};
use crate::design::specs::{parse_jewelry_specs, JewelrySpecs};
use crate::errors::AppError;
use crate::redact;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub specs: JewelrySpecs,
    pub pricing: PricingBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub prompt: String,
    /// A prompt produced from `prompt`, checked for dropped custom text.
    pub generated_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub production: ProductionValidation,
    pub complexity: u8,
    pub estimated_days: u32,
    pub elements: DesignElements,
    pub prompt_validation: Option<PromptValidation>,
}

fn checked_prompt(prompt: &str) -> Result<&str, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "prompt cannot exceed {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(prompt)
}

/// POST /api/design/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateDesignRequest>,
) -> Result<Json<GenerateDesignResponse>, AppError> {
    info!(
        "Design generation for user {}: {}",
        user.user_id,
        redact::preview(&req.prompt)
    );
    let settings = GenerationSettings::from_config(&state.config);
    let response =
        generate_design(&state.openai, state.spot_prices.as_ref(), &settings, &req).await?;
    Ok(Json(response))
}

/// POST /api/design/price
pub async fn handle_price(
    State(state): State<AppState>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<PriceResponse>, AppError> {
    let specs = parse_jewelry_specs(checked_prompt(&req.prompt)?);
    let pricing = estimate_price(&specs, state.spot_prices.as_ref()).await;
    Ok(Json(PriceResponse { specs, pricing }))
}

/// POST /api/design/validate
pub async fn handle_validate(Json(req): Json<ValidateRequest>) -> Result<Json<ValidateResponse>, AppError> {
    let prompt = checked_prompt(&req.prompt)?;
    let complexity = calculate_complexity(prompt);

    Ok(Json(ValidateResponse {
        production: validate_design_for_production(prompt),
        complexity,
        estimated_days: estimate_production_days(complexity),
        elements: extract_custom_elements(prompt),
        prompt_validation: req
            .generated_prompt
            .as_deref()
            .map(|generated| validate_prompt_inclusion(prompt, generated)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_reports_forbidden_technique() {
        let req = ValidateRequest {
            prompt: "gold ring with floating stones".to_string(),
            generated_prompt: None,
        };
        let Json(resp) = handle_validate(Json(req)).await.unwrap();
        assert!(!resp.production.is_valid);
        assert!(resp.prompt_validation.is_none());
    }

    #[tokio::test]
    async fn test_validate_checks_generated_prompt() {
        let req = ValidateRequest {
            prompt: "silver band engraved \"Always\"".to_string(),
            generated_prompt: Some("A sterling silver band with a smooth finish".to_string()),
        };
        let Json(resp) = handle_validate(Json(req)).await.unwrap();
        assert_eq!(resp.elements.custom_text, vec!["Always".to_string()]);
        assert!(!resp.prompt_validation.unwrap().is_valid);
    }

    #[tokio::test]
    async fn test_validate_rejects_blank_prompt() {
        let req = ValidateRequest {
            prompt: "  ".to_string(),
            generated_prompt: None,
        };
        assert!(matches!(
            handle_validate(Json(req)).await,
            Err(AppError::Validation(_))
        ));
    }
}
