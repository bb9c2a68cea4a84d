use anyhow::{Context, Result};

/// Number of views rendered per design when `IMAGE_VIEWS` is unset.
pub const DEFAULT_IMAGE_VIEWS: usize = 2;
/// Provider-side rate limiting: gap between consecutive image calls.
pub const DEFAULT_IMAGE_CALL_DELAY_MS: u64 = 1000;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub openai_api_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// Views rendered per generation request, always within 2..=4.
    pub image_views: usize,
    pub image_call_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let image_views = match std::env::var("IMAGE_VIEWS") {
            Ok(raw) => raw
                .parse::<usize>()
                .context("IMAGE_VIEWS must be a positive integer")?,
            Err(_) => DEFAULT_IMAGE_VIEWS,
        };

        let image_call_delay_ms = match std::env::var("IMAGE_CALL_DELAY_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("IMAGE_CALL_DELAY_MS must be a number of milliseconds")?,
            Err(_) => DEFAULT_IMAGE_CALL_DELAY_MS,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            supabase_jwt_secret: require_env("SUPABASE_JWT_SECRET")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            image_views: clamp_views(image_views),
            image_call_delay_ms,
        })
    }
}

/// Views are rendered in a fixed order (front, side, top, detail); fewer than two
/// leaves nothing to cross-check.
pub fn clamp_views(requested: usize) -> usize {
    requested.clamp(2, 4)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_views_bounds() {
        assert_eq!(clamp_views(0), 2);
        assert_eq!(clamp_views(3), 3);
        assert_eq!(clamp_views(9), 4);
    }
}
