//! Gemini Backend Implementation
//!
//! Text and image generation against Google's Generative Language REST API.
//!
//! # Gemini API
//!
//! Both operations use the same endpoint on different models:
//! - `POST {base}/models/{model}:generateContent`
//!
//! The credential goes in the `x-goog-api-key` header. Image requests add
//! `generationConfig.imageConfig.aspectRatio`; images come back as
//! `inlineData` parts on the first candidate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompts::{image_prompt, wish_prompt};
use super::traits::{
    GenerationError, ImageGenerator, ImageRequest, ResponsePart, TextGenerator, WishRequest,
};

/// Default REST base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model for wish text
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Default model for illustrations
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API key (requests fail with [`GenerationError::MissingApiKey`] without one)
    pub api_key: Option<String>,
    /// REST base URL
    pub base_url: String,
    /// Model used for wishes
    pub text_model: String,
    /// Model used for illustrations
    pub image_model: String,
    /// HTTP client timeout
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate (empty if there is none)
    fn into_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
    }
}

/// Concatenated text of `parts`, trimmed
fn collect_text(parts: &[ResponsePart]) -> String {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<String>()
        .trim()
        .to_string()
}

// ============================================================================
// Backend
// ============================================================================

/// Gemini backend client
#[derive(Clone, Debug)]
pub struct GeminiBackend {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Connection settings
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// `generateContent` endpoint for `model`
    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(prompt: String, aspect_ratio: Option<&str>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![ResponsePart::text(prompt)],
            }],
            generation_config: aspect_ratio.map(|ratio| GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: ratio.to_string(),
                },
            }),
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<Vec<ResponsePart>, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.generate_url(model))
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                backend: "Gemini".to_string(),
                status,
                body,
            });
        }

        let bytes = response.bytes().await?;
        let data: GenerateContentResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        tracing::debug!(
            model = %model,
            duration_ms = start.elapsed().as_millis() as u64,
            candidates = data.candidates.len(),
            "Gemini response received"
        );

        Ok(data.into_parts())
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate_wish(&self, request: &WishRequest) -> Result<String, GenerationError> {
        let prompt = wish_prompt(&request.recipient, &request.sender, request.tone);
        let body = Self::build_request(prompt, None);
        let parts = self.generate_content(&self.config.text_model, &body).await?;
        Ok(collect_text(&parts))
    }
}

#[async_trait]
impl ImageGenerator for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ResponsePart>, GenerationError> {
        let body = Self::build_request(
            image_prompt(request.tone),
            Some(request.aspect_ratio.as_str()),
        );
        self.generate_content(&self.config.image_model, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Tone;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(GeminiConfig::default()).unwrap()
    }

    #[test]
    fn test_generate_url() {
        let backend = GeminiBackend::new(GeminiConfig {
            base_url: "http://localhost:8080/v1beta/".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(
            backend.generate_url("gemini-2.5-flash"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_text_request_body() {
        let body = GeminiBackend::build_request("hello".to_string(), None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })
        );
    }

    #[test]
    fn test_image_request_body() {
        let body = GeminiBackend::build_request(image_prompt(Tone::Funny), Some("1:1"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert!(json["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("whimsical"));
    }

    #[test]
    fn test_response_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let parts = response.into_parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], ResponsePart::inline("image/png", "AAAA"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_parts().is_empty());
    }

    #[test]
    fn test_collect_text() {
        let parts = vec![
            ResponsePart::text("  Merry "),
            ResponsePart::inline("image/png", "AAAA"),
            ResponsePart::text("Christmas!\n"),
        ];
        assert_eq!(collect_text(&parts), "Merry Christmas!");
        assert_eq!(collect_text(&[]), "");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let backend = backend();
        let result = backend
            .generate_wish(&WishRequest::new("Jo", "Sam", Tone::Heartfelt))
            .await;
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));

        let result = backend.generate_image(&ImageRequest::square(Tone::Funny)).await;
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));
    }
}
