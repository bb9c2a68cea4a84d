//! Design Generation: orchestrates one generation request end to end.
//!
//! Flow: production check → sanitize → fingerprint → view prompts → prompt
//!       inclusion check → image fan-out → revised-prompt checks → cross-view
//!       consistency → manufacturing specs → pricing.
//!
//! Image calls run concurrently, staggered by `call_delay` for provider rate
//! limits. A failed view is recorded on that view only; the request still
//! succeeds as long as one image came back.

use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{clamp_views, Config};
use crate::design::consistency::{validate_consistency, ConsistencyValidation};
use crate::design::custom_text::{
    validate_prompt_inclusion, validate_revised_prompt, PromptValidation,
};
use crate::design::fingerprint::DesignFingerprint;
use crate::design::manufacturing::{
    calculate_complexity, estimate_production_days, sanitize_prompt_for_production,
    validate_design_for_production,
};
use crate::design::pricing::{estimate_price, PricingBreakdown, SpotPriceSource};
use crate::design::prompts::{
    build_spec_prompt, build_view_prompt, ViewAngle, SPEC_FALLBACK, SPEC_SYSTEM, VIEW_ORDER,
};
use crate::errors::AppError;
use crate::openai_client::{DesignModel, OpenAiError};
use crate::redact;

pub const MAX_PROMPT_CHARS: usize = 1000;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateDesignRequest {
    pub prompt: String,
    /// Overrides the configured view count; clamped to 2..=4.
    pub views: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub views: usize,
    pub call_delay: Duration,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            views: config.image_views,
            call_delay: Duration::from_millis(config.image_call_delay_ms),
        }
    }
}

/// Outcome of one view's image call.
#[derive(Debug, Clone, Serialize)]
pub struct ViewResult {
    pub view: ViewAngle,
    pub image_url: Option<String>,
    pub revised_prompt: Option<String>,
    pub revised_prompt_validation: Option<PromptValidation>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionEstimate {
    pub complexity: u8,
    pub estimated_days: u32,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateDesignResponse {
    pub fingerprint: DesignFingerprint,
    pub sanitized_prompt: String,
    pub images: Vec<ViewResult>,
    pub prompt_validation: PromptValidation,
    pub consistency: Option<ConsistencyValidation>,
    pub specifications: String,
    pub specifications_fallback: bool,
    pub pricing: PricingBreakdown,
    pub production: ProductionEstimate,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_design(
    model: &dyn DesignModel,
    spot_prices: &dyn SpotPriceSource,
    settings: &GenerationSettings,
    request: &GenerateDesignRequest,
) -> Result<GenerateDesignResponse, AppError> {
    let user_prompt = request.prompt.trim();
    if user_prompt.is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }
    if user_prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "prompt cannot exceed {MAX_PROMPT_CHARS} characters"
        )));
    }

    // Step 1: production rules. Forbidden phrases are stripped; anything still
    // failing after that (oversized stones) rejects the request.
    let original_check = validate_design_for_production(user_prompt);
    let sanitized_prompt = sanitize_prompt_for_production(user_prompt);
    let sanitized_check = validate_design_for_production(&sanitized_prompt);
    if !sanitized_check.is_valid {
        return Err(AppError::Validation(format!(
            "Design cannot be manufactured: {}",
            sanitized_check.issues.join("; ")
        )));
    }
    let mut production_warnings: Vec<String> = original_check
        .issues
        .iter()
        .map(|issue| format!("Removed from request: {issue}"))
        .collect();
    production_warnings.extend(sanitized_check.warnings);

    // Step 2: fingerprint + one prompt per view
    let fingerprint = DesignFingerprint::from_prompt(&sanitized_prompt);
    let view_count = clamp_views(request.views.unwrap_or(settings.views));
    let view_prompts: Vec<(ViewAngle, String)> = VIEW_ORDER
        .iter()
        .take(view_count)
        .map(|view| (*view, build_view_prompt(&fingerprint, &sanitized_prompt, *view)))
        .collect();

    info!(
        "Generating design {} ({} views): {}",
        fingerprint.id,
        view_count,
        redact::preview(user_prompt)
    );

    let prompt_validation = validate_prompt_inclusion(user_prompt, &view_prompts[0].1);
    for error in &prompt_validation.errors {
        warn!("Design {}: {}", fingerprint.id, redact::scrub(error));
    }

    // Step 3: staggered image fan-out
    let calls = view_prompts.iter().enumerate().map(|(i, (view, prompt))| {
        let delay = settings.call_delay * i as u32;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (*view, prompt.as_str(), model.generate_image(prompt).await)
        }
    });
    let outcomes = join_all(calls).await;

    let mut images = Vec::with_capacity(outcomes.len());
    let mut rendered_prompts: Vec<String> = Vec::new();
    let mut first_error: Option<OpenAiError> = None;

    for (view, sent_prompt, outcome) in outcomes {
        match outcome {
            Ok(image) => {
                let revised = image.revised_prompt.clone();
                let revised_prompt_validation = revised
                    .as_deref()
                    .map(|r| validate_revised_prompt(&fingerprint.elements, r));
                if let Some(v) = revised_prompt_validation.as_ref().filter(|v| !v.is_valid) {
                    warn!(
                        "Design {} {} view dropped requested content: {}",
                        fingerprint.id,
                        view.as_str(),
                        redact::scrub(&v.errors.join("; "))
                    );
                }
                rendered_prompts.push(revised.clone().unwrap_or_else(|| sent_prompt.to_string()));
                images.push(ViewResult {
                    view,
                    image_url: Some(image.url),
                    revised_prompt: revised,
                    revised_prompt_validation,
                    error: None,
                });
            }
            Err(e) => {
                warn!(
                    "Design {} {} view failed: {e}",
                    fingerprint.id,
                    view.as_str()
                );
                images.push(ViewResult {
                    view,
                    image_url: None,
                    revised_prompt: None,
                    revised_prompt_validation: None,
                    error: Some(e.to_string()),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if rendered_prompts.is_empty() {
        return Err(match first_error {
            Some(e) => AppError::OpenAi(e),
            None => AppError::Internal(anyhow::anyhow!("no image views were requested")),
        });
    }

    // Step 4: cross-view consistency on the first two renders
    let consistency = match rendered_prompts.as_slice() {
        [first, second, ..] => {
            let result = validate_consistency(first, second, user_prompt);
            info!(
                "Design {} consistency score {} (consistent={})",
                fingerprint.id, result.consistency_score, result.is_consistent
            );
            Some(result)
        }
        _ => None,
    };

    // Step 5: production estimate + manufacturing specs
    let complexity = calculate_complexity(&sanitized_prompt);
    let estimated_days = estimate_production_days(complexity);

    let spec_prompt = build_spec_prompt(&fingerprint, &sanitized_prompt, estimated_days);
    let (specifications, specifications_fallback) =
        match model.complete(SPEC_SYSTEM, &spec_prompt).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(
                    "Design {} specification generation failed, using placeholder: {e}",
                    fingerprint.id
                );
                (SPEC_FALLBACK.to_string(), true)
            }
        };

    // Step 6: pricing
    let pricing = estimate_price(&fingerprint.specs, spot_prices).await;

    info!(
        "Design {} generated: {}/{} views, ${:.2}, {} days",
        fingerprint.id,
        rendered_prompts.len(),
        view_count,
        pricing.final_price,
        estimated_days
    );

    Ok(GenerateDesignResponse {
        fingerprint,
        sanitized_prompt,
        images,
        prompt_validation,
        consistency,
        specifications,
        specifications_fallback,
        pricing,
        production: ProductionEstimate {
            complexity,
            estimated_days,
            warnings: production_warnings,
        },
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::pricing::StaticSpotPrices;
    use crate::openai_client::GeneratedImage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Echoes the sent prompt back as the revised prompt.
    #[derive(Default)]
    struct FakeModel {
        fail_side: bool,
        fail_all_images: bool,
        fail_text: bool,
        image_calls: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl DesignModel for FakeModel {
        async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, OpenAiError> {
            self.image_calls.lock().unwrap().push(Instant::now());
            if self.fail_all_images || (self.fail_side && prompt.contains("side profile")) {
                return Err(OpenAiError::Api {
                    status: 400,
                    message: "content policy violation".to_string(),
                });
            }
            Ok(GeneratedImage {
                url: "https://images.example.com/render.png".to_string(),
                revised_prompt: Some(prompt.to_string()),
            })
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, OpenAiError> {
            if self.fail_text {
                return Err(OpenAiError::EmptyContent);
            }
            Ok("Metal: 14k rose gold".to_string())
        }
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            views: 2,
            call_delay: Duration::from_millis(1000),
        }
    }

    fn request(prompt: &str) -> GenerateDesignRequest {
        GenerateDesignRequest {
            prompt: prompt.to_string(),
            views: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_two_consistent_views() {
        let model = FakeModel::default();
        let response = generate_design(
            &model,
            &StaticSpotPrices::default(),
            &settings(),
            &request("14k rose gold ring with 1 carat diamond engraved \"Forever\""),
        )
        .await
        .unwrap();

        assert_eq!(response.images.len(), 2);
        assert!(response.images.iter().all(|i| i.error.is_none()));
        assert!(response.prompt_validation.is_valid);
        let consistency = response.consistency.unwrap();
        assert!(consistency.is_consistent);
        assert_eq!(consistency.consistency_score, 100);
        assert_eq!(response.specifications, "Metal: 14k rose gold");
        assert!(!response.specifications_fallback);
        assert!(response.pricing.final_price > 0.0);
        assert_eq!(response.fingerprint.elements.custom_text, vec!["Forever".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_override_is_clamped() {
        let model = FakeModel::default();
        let mut req = request("silver pendant");
        req.views = Some(10);
        let response = generate_design(&model, &StaticSpotPrices::default(), &settings(), &req)
            .await
            .unwrap();
        assert_eq!(response.images.len(), 4);
        assert_eq!(response.images[3].view, ViewAngle::Detail);
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_calls_are_staggered_by_call_delay() {
        let model = FakeModel::default();
        let settings = settings();
        let mut req = request("sterling silver cuff bracelet");
        req.views = Some(4);

        let start = Instant::now();
        generate_design(&model, &StaticSpotPrices::default(), &settings, &req)
            .await
            .unwrap();

        let calls = model.image_calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        for (i, at) in calls.iter().enumerate() {
            assert_eq!(*at - start, settings.call_delay * i as u32, "call {i}");
        }
        for pair in calls.windows(2) {
            assert_eq!(pair[1] - pair[0], settings.call_delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_view_failure_is_isolated() {
        let model = FakeModel {
            fail_side: true,
            ..Default::default()
        };
        let response = generate_design(
            &model,
            &StaticSpotPrices::default(),
            &settings(),
            &request("gold ring"),
        )
        .await
        .unwrap();

        assert!(response.images[0].image_url.is_some());
        assert!(response.images[1].image_url.is_none());
        assert!(response.images[1]
            .error
            .as_deref()
            .unwrap()
            .contains("content policy"));
        assert!(response.consistency.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_views_failing_is_error() {
        let model = FakeModel {
            fail_all_images: true,
            ..Default::default()
        };
        let err = generate_design(
            &model,
            &StaticSpotPrices::default(),
            &settings(),
            &request("gold ring"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::OpenAi(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spec_failure_uses_placeholder() {
        let model = FakeModel {
            fail_text: true,
            ..Default::default()
        };
        let response = generate_design(
            &model,
            &StaticSpotPrices::default(),
            &settings(),
            &request("gold ring"),
        )
        .await
        .unwrap();
        assert_eq!(response.specifications, SPEC_FALLBACK);
        assert!(response.specifications_fallback);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let err = generate_design(
            &FakeModel::default(),
            &StaticSpotPrices::default(),
            &settings(),
            &request("   "),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oversized_stone_rejected() {
        let err = generate_design(
            &FakeModel::default(),
            &StaticSpotPrices::default(),
            &settings(),
            &request("platinum ring with a 12 carat diamond"),
        )
        .await
        .unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("12 carat diamond")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_phrase_is_stripped_and_reported() {
        let response = generate_design(
            &FakeModel::default(),
            &StaticSpotPrices::default(),
            &settings(),
            &request("a floating sapphire in a silver ring"),
        )
        .await
        .unwrap();
        assert!(!response.sanitized_prompt.to_lowercase().contains("floating"));
        assert!(response
            .production
            .warnings
            .iter()
            .any(|w| w.contains("floating")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_production_estimate_follows_complexity() {
        let response = generate_design(
            &FakeModel::default(),
            &StaticSpotPrices::default(),
            &settings(),
            &request("intricate filigree gold cuff"),
        )
        .await
        .unwrap();
        assert_eq!(response.production.complexity, 5);
        assert_eq!(
            response.production.estimated_days,
            estimate_production_days(5)
        );
        assert!(response
            .production
            .warnings
            .iter()
            .any(|w| w.contains("filigree")));
    }
}
