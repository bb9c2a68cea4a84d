use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::design::pricing::SpotPriceSource;
use crate::openai_client::OpenAiClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub openai: OpenAiClient,
    pub config: Config,
    /// Metal spot prices for pricing. Default: StaticSpotPrices.
    pub spot_prices: Arc<dyn SpotPriceSource>,
}
