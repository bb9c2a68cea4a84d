/// OpenAI client: the single point of entry for all image and text generation calls.
///
/// No other module may call the OpenAI API directly. Callers that only need
/// generation depend on the `DesignModel` trait so they can run against a fake.
///
/// Models are hardcoded: dall-e-3 for renders, gpt-4o for specifications.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const IMAGE_MODEL: &str = "dall-e-3";
pub const TEXT_MODEL: &str = "gpt-4o";
const IMAGE_SIZE: &str = "1024x1024";
const IMAGE_QUALITY: &str = "hd";
const MAX_TOKENS: u32 = 1500;
/// Image generation routinely takes most of a minute; several run per request.
const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// One rendered image as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Temporary provider-hosted URL; copy to storage before it expires.
    pub url: String,
    /// The prompt the image model actually used after rewriting ours.
    pub revised_prompt: Option<String>,
}

/// Generation operations the design pipeline needs.
#[async_trait]
pub trait DesignModel: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, OpenAiError>;
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OpenAiError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Result<Self, OpenAiError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            api_key,
        })
    }

    /// Downloads a provider-hosted image so it can be persisted.
    pub async fn fetch_image(&self, url: &str) -> Result<Bytes, OpenAiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message: format!("image download failed for {url}"),
            });
        }
        Ok(response.bytes().await?)
    }

    /// Single attempt. Failures surface to the caller, which records them per item.
    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R, OpenAiError>
    where
        T: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{OPENAI_API_BASE}{path}"))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl DesignModel for OpenAiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, OpenAiError> {
        let request = ImageRequest {
            model: IMAGE_MODEL,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: IMAGE_QUALITY,
        };
        let response: ImageResponse = self.post("/images/generations", &request).await?;
        first_image(response)
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OpenAiError> {
        let request = ChatRequest {
            model: TEXT_MODEL,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let response: ChatResponse = self.post("/chat/completions", &request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Chat completion succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        first_text(response)
    }
}

fn first_image(response: ImageResponse) -> Result<GeneratedImage, OpenAiError> {
    let data = response
        .data
        .into_iter()
        .next()
        .ok_or(OpenAiError::EmptyContent)?;
    let url = data.url.ok_or(OpenAiError::EmptyContent)?;
    Ok(GeneratedImage {
        url,
        revised_prompt: data.revised_prompt,
    })
}

fn first_text(response: ChatResponse) -> Result<String, OpenAiError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(OpenAiError::EmptyContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_response_parses_revised_prompt() {
        let json = r#"{
            "created": 1700000000,
            "data": [{"url": "https://example.com/a.png", "revised_prompt": "A rose gold ring"}]
        }"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        let image = first_image(response).unwrap();
        assert_eq!(image.url, "https://example.com/a.png");
        assert_eq!(image.revised_prompt.as_deref(), Some("A rose gold ring"));
    }

    #[test]
    fn test_image_response_without_url_is_empty() {
        let json = r#"{"data": [{"b64_json": "AAAA"}]}"#;
        let response: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(first_image(response), Err(OpenAiError::EmptyContent)));
    }

    #[test]
    fn test_chat_response_trims_text() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "  Metal: 14k gold\n"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_text(response).unwrap(), "Metal: 14k gold");
    }

    #[test]
    fn test_chat_response_blank_is_empty() {
        let json = r#"{"choices": [{"message": {"content": "   "}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(first_text(response), Err(OpenAiError::EmptyContent)));
    }

    #[test]
    fn test_error_envelope_parses() {
        let json = r#"{"error": {"message": "Your request was rejected", "type": "invalid_request_error"}}"#;
        let parsed: OpenAiErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error.message, "Your request was rejected");
    }
}
