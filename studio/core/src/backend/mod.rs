//! Generation Backends
//!
//! This module provides abstracted access to the generative services a card
//! needs (wish text and illustration) through a pair of traits.
//!
//! # Available Backends
//!
//! - **Gemini**: Google Generative Language API (default)
//!
//! # Usage
//!
//! ```ignore
//! use card_studio_core::backend::{GeminiBackend, GeminiConfig, TextGenerator, WishRequest};
//! use card_studio_core::Tone;
//!
//! let backend = GeminiBackend::new(GeminiConfig::default())?;
//! let wish = backend
//!     .generate_wish(&WishRequest::new("Jo", "Sam", Tone::Heartfelt))
//!     .await?;
//! ```

mod gemini;
pub mod prompts;
mod traits;

pub use gemini::{
    GeminiBackend, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL,
    DEFAULT_TIMEOUT,
};
pub use traits::{
    first_inline_image, GenerationError, ImageGenerator, ImageRequest, InlineData, ResponsePart,
    TextGenerator, WishRequest,
};
