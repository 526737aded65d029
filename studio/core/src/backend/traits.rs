//! Generation Backend Traits
//!
//! Trait definitions for the two generative services a card needs: one that
//! writes the wish, one that paints the illustration. The orchestrator only
//! sees these traits, so a real HTTP backend and a test double are
//! interchangeable.
//!
//! Both traits return an explicit `Result` with a typed [`GenerationError`];
//! deciding what a failure means for the card is the orchestrator's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{CardConfig, Tone};
use crate::data_uri;

/// Errors from an external generation service
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No credential is configured for the service
    #[error("No API key configured")]
    MissingApiKey,

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("{backend} returned {status}: {body}")]
    Status {
        /// Backend name
        backend: String,
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response could not be understood
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other backend-specific failure
    #[error("{0}")]
    Other(String),
}

/// Inputs for a wish
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WishRequest {
    /// Who the wish is for
    pub recipient: String,
    /// Who the wish is from
    pub sender: String,
    /// Register of the wish
    pub tone: Tone,
}

impl WishRequest {
    /// Create a request
    pub fn new(recipient: impl Into<String>, sender: impl Into<String>, tone: Tone) -> Self {
        Self {
            recipient: recipient.into(),
            sender: sender.into(),
            tone,
        }
    }

    /// Build a request from the card's names (trimmed) and tone
    #[must_use]
    pub fn from_card(card: &CardConfig) -> Self {
        Self::new(card.recipient.trim(), card.sender.trim(), card.tone)
    }
}

/// Inputs for an illustration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    /// Register that selects the art style
    pub tone: Tone,
    /// Requested aspect ratio, e.g. `"1:1"`
    pub aspect_ratio: String,
}

impl ImageRequest {
    /// A square illustration request for `tone`
    #[must_use]
    pub fn square(tone: Tone) -> Self {
        Self {
            tone,
            aspect_ratio: "1:1".to_string(),
        }
    }
}

/// Inline binary payload of a response part
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type, e.g. `image/png`
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

impl InlineData {
    /// Render as a `data:` URI
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        data_uri::from_base64(&self.mime_type, &self.data)
    }
}

/// One part of a generation response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    /// Text content, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary content, if any
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl ResponsePart {
    /// A text-only part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// An inline-data part
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

/// The first inline image in `parts`, as a `data:` URI
#[must_use]
pub fn first_inline_image(parts: &[ResponsePart]) -> Option<String> {
    parts
        .iter()
        .find_map(|part| part.inline_data.as_ref())
        .map(InlineData::to_data_uri)
}

/// Service that writes wish text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Write a plain-text wish for `request`
    ///
    /// An empty string is a valid (if useless) answer.
    async fn generate_wish(&self, request: &WishRequest) -> Result<String, GenerationError>;
}

/// Service that paints illustrations
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Request an illustration and return the raw response parts
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<Vec<ResponsePart>, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardUpdate;

    #[test]
    fn test_wish_request_from_card_trims() {
        let card = CardUpdate::new()
            .recipient("  Jo Ann ")
            .sender("Sam\n")
            .tone(Tone::Funny)
            .apply(&CardConfig::default());

        let request = WishRequest::from_card(&card);
        assert_eq!(request, WishRequest::new("Jo Ann", "Sam", Tone::Funny));
    }

    #[test]
    fn test_square_image_request() {
        let request = ImageRequest::square(Tone::Poetic);
        assert_eq!(request.aspect_ratio, "1:1");
        assert_eq!(request.tone, Tone::Poetic);
    }

    #[test]
    fn test_first_inline_image() {
        let parts = vec![
            ResponsePart::text("Here is your picture"),
            ResponsePart::inline("image/png", "AAAA"),
            ResponsePart::inline("image/jpeg", "BBBB"),
        ];
        assert_eq!(
            first_inline_image(&parts),
            Some("data:image/png;base64,AAAA".to_string())
        );
    }

    #[test]
    fn test_first_inline_image_none() {
        assert_eq!(first_inline_image(&[]), None);
        assert_eq!(first_inline_image(&[ResponsePart::text("no image")]), None);
    }

    #[test]
    fn test_response_part_wire_format() {
        let part: ResponsePart =
            serde_json::from_str(r#"{"inlineData":{"mimeType":"image/png","data":"AAAA"}}"#)
                .unwrap();
        assert_eq!(part, ResponsePart::inline("image/png", "AAAA"));
    }
}
