//! Card Studio Core - Headless Holiday Card Composition
//!
//! This crate holds everything a holiday-card editor needs except the UI: the
//! card model and its observable store, the generation workflow that asks an
//! AI service for a wish and an illustration, and the export path that turns
//! the card into a PNG file. It can drive a CLI, a desktop window, or run
//! headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          UI Surfaces                             │
//! │        ┌─────────┐   ┌───────────┐   ┌──────────────────┐        │
//! │        │   CLI   │   │  Desktop  │   │ Headless / Tests │        │
//! │        └────┬────┘   └─────┬─────┘   └────────┬─────────┘        │
//! │             └──────────────┴──────────────────┘                  │
//! │                 CardUpdate (up)   watch::Receiver (down)         │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                      CARD STUDIO CORE                            │
//! │  ┌───────────┐   ┌────────────────────┐   ┌──────────────────┐   │
//! │  │ CardStore │◄──│  CardOrchestrator  │──►│ Text / Image     │   │
//! │  │  (watch)  │   │  busy flags, notices│   │ Generator (Gemini)│  │
//! │  └─────┬─────┘   └────────────────────┘   └──────────────────┘   │
//! │        │         ┌────────────────────┐   ┌──────────────────┐   │
//! │        └────────►│   ExportAdapter    │──►│ CardRasterizer   │   │
//! │                  │                    │──►│ DirectoryDownloads│  │
//! │                  └────────────────────┘   └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`CardConfig`]: The full state of one card
//! - [`CardStore`]: Single owner of the current card, observable by surfaces
//! - [`CardOrchestrator`]: Runs wish and illustration generation
//! - [`ExportAdapter`]: Captures a card surface and saves it as a PNG
//! - [`GeminiBackend`]: Text and image generation over the Gemini REST API
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use card_studio_core::{
//!     load_config, CardOrchestrator, CardStore, CardUpdate, GeminiBackend,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = Arc::new(GeminiBackend::new(config.gemini.clone())?);
//!     let store = Arc::new(CardStore::new());
//!
//!     store.update(CardUpdate::new().recipient("Ana").sender("Luis"));
//!
//!     let orchestrator =
//!         CardOrchestrator::new(store.clone(), backend.clone(), backend, config.orchestrator);
//!     orchestrator.generate_all().await;
//!
//!     println!("{}", store.get().message);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`card`]: Card model, tones, frame styles and partial updates
//! - [`store`]: Observable card store
//! - [`backend`]: Generation service abstraction and the Gemini client
//! - [`orchestrator`]: Wish and illustration workflows
//! - [`busy`]: Counted busy flags
//! - [`export`]: Capture and download abstractions, export workflow
//! - [`raster`]: PNG rasterizer for cards
//! - [`data_uri`]: `data:` URI encoding and parsing
//! - [`share`]: Share text and messaging links
//! - [`messages`]: User-facing notices
//! - [`config`]: TOML / environment / CLI configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod busy;
pub mod card;
pub mod config;
pub mod data_uri;
pub mod export;
pub mod messages;
pub mod orchestrator;
pub mod raster;
pub mod share;
pub mod store;

// Re-exports for convenience
pub use backend::{
    GeminiBackend, GeminiConfig, GenerationError, ImageGenerator, ImageRequest, ResponsePart,
    TextGenerator, WishRequest,
};
pub use card::{CardConfig, CardUpdate, FrameStyle, Tone};
pub use messages::{Notice, Notifier, NotifyLevel, RequestId};
pub use orchestrator::{
    CardOrchestrator, ImageOutcome, InFlightPolicy, MessageOutcome, OrchestratorConfig,
};
pub use store::CardStore;

// Export exports
pub use export::{
    export_file_name, CaptureOptions, CardSurface, DirectoryDownloads, DownloadSink,
    ExportAdapter, ExportConfig, ExportOutcome, RasterCapture, RenderSurface, RgbColor,
};
pub use raster::CardRasterizer;

// Share exports
pub use share::{share_link, share_text};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, StudioConfig, StudioToml,
};
