//! Generation Orchestrator
//!
//! Sequences the two AI-backed operations a card supports:
//! - writing the wish ([`CardOrchestrator::generate_message`])
//! - painting the illustration ([`CardOrchestrator::generate_image`])
//!
//! # Design Philosophy
//!
//! Generation never fails from the caller's point of view. Every external
//! call produces a typed result ([`WishResult`], [`ImageResult`]); what that
//! result means for the card is decided by small pure functions
//! ([`select_message`], [`ImageResult::image_url`]) and applied to the
//! [`CardStore`] in one update. Busy flags are owned by RAII guards, so they
//! are cleared on every exit path.
//!
//! The two operations are independent. Each has its own flag and its own
//! in-flight counter, and they write disjoint card fields, so running them
//! concurrently (e.g. with [`CardOrchestrator::generate_all`]) is safe.
//! Requests already sent are never cancelled; their results are always
//! applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{
    first_inline_image, GenerationError, ImageGenerator, ImageRequest, ResponsePart,
    TextGenerator, WishRequest,
};
use crate::busy::{BusyCounter, BusyGuard};
use crate::card::CardUpdate;
use crate::messages::{Notifier, NotifyLevel, RequestId};
use crate::store::CardStore;

/// Wish used when the text service answers with nothing
pub const EMPTY_RESULT_FALLBACK: &str =
    "May your holiday be filled with magic and your new year with dreams coming true.";

/// Wish used when the text service fails
pub const FAILURE_FALLBACK: &str =
    "Wishing you a season filled with light and laughter. Merry Christmas!";

/// Notice shown when a wish is requested without both names
pub const MISSING_NAMES_NOTICE: &str = "Please enter both names first!";

// ============================================================================
// Configuration
// ============================================================================

/// What to do when an operation is invoked while one of the same kind is
/// still in flight
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Issue another request; every result is applied, last one wins
    #[default]
    Concurrent,
    /// Return [`MessageOutcome::Skipped`] / [`ImageOutcome::Skipped`]
    /// without issuing a request
    SkipWhileBusy,
}

impl std::str::FromStr for InFlightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "concurrent" => Ok(Self::Concurrent),
            "skip_while_busy" | "skip" => Ok(Self::SkipWhileBusy),
            other => Err(format!("unknown in-flight policy '{other}'")),
        }
    }
}

/// Orchestrator configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Re-entry behavior for both operations
    pub in_flight: InFlightPolicy,
}

// ============================================================================
// Results and outcomes
// ============================================================================

/// What the text service produced
#[derive(Debug)]
pub enum WishResult {
    /// Usable wish text
    Generated(String),
    /// The service answered, but with nothing usable
    Empty,
    /// The service failed
    Failed(GenerationError),
}

impl From<Result<String, GenerationError>> for WishResult {
    fn from(result: Result<String, GenerationError>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Self::Empty,
            Ok(text) => Self::Generated(text.trim().to_string()),
            Err(e) => Self::Failed(e),
        }
    }
}

/// The wish text to show for `result`
#[must_use]
pub fn select_message(result: &WishResult) -> &str {
    match result {
        WishResult::Generated(text) => text,
        WishResult::Empty => EMPTY_RESULT_FALLBACK,
        WishResult::Failed(_) => FAILURE_FALLBACK,
    }
}

/// What the image service produced
#[derive(Debug)]
pub enum ImageResult {
    /// An inline image, as a `data:` URI
    Image(String),
    /// The service answered without an inline image
    NoImage,
    /// The service failed
    Failed(GenerationError),
}

impl From<Result<Vec<ResponsePart>, GenerationError>> for ImageResult {
    fn from(result: Result<Vec<ResponsePart>, GenerationError>) -> Self {
        match result {
            Ok(parts) => first_inline_image(&parts).map_or(Self::NoImage, Self::Image),
            Err(e) => Self::Failed(e),
        }
    }
}

impl ImageResult {
    /// The new illustration, if this result should replace the current one
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Image(uri) => Some(uri),
            Self::NoImage | Self::Failed(_) => None,
        }
    }
}

/// How a wish request settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The generated wish was applied
    Generated(String),
    /// The service returned nothing; the empty-result fallback was applied
    EmptyFallback,
    /// The service failed; the failure fallback was applied
    FailureFallback(String),
    /// Recipient or sender was missing; nothing was requested
    MissingNames,
    /// Another wish request was in flight; nothing was requested
    Skipped,
}

impl MessageOutcome {
    /// The wish now on the card, if this request changed it
    #[must_use]
    pub fn applied_message(&self) -> Option<&str> {
        match self {
            Self::Generated(text) => Some(text),
            Self::EmptyFallback => Some(EMPTY_RESULT_FALLBACK),
            Self::FailureFallback(_) => Some(FAILURE_FALLBACK),
            Self::MissingNames | Self::Skipped => None,
        }
    }
}

/// How an illustration request settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The new illustration (a `data:` URI) was applied
    Generated(String),
    /// The service returned no image; the card is unchanged
    NoImage,
    /// The service failed; the card is unchanged
    Failed(String),
    /// Another illustration request was in flight; nothing was requested
    Skipped,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives text and image generation for one session's card
pub struct CardOrchestrator<T: TextGenerator, I: ImageGenerator> {
    store: Arc<CardStore>,
    text: Arc<T>,
    image: Arc<I>,
    config: OrchestratorConfig,
    notifier: Notifier,
    message_busy: BusyCounter,
    image_busy: BusyCounter,
}

impl<T: TextGenerator, I: ImageGenerator> CardOrchestrator<T, I> {
    /// Create an orchestrator over `store`
    pub fn new(
        store: Arc<CardStore>,
        text: Arc<T>,
        image: Arc<I>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            text,
            image,
            config,
            notifier: Notifier::disabled(),
            message_busy: BusyCounter::new(),
            image_busy: BusyCounter::new(),
        }
    }

    /// Send user-facing notices to `notifier`
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// The store this orchestrator writes to
    pub fn store(&self) -> &Arc<CardStore> {
        &self.store
    }

    /// Configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Number of wish requests in flight
    pub fn messages_in_flight(&self) -> usize {
        self.message_busy.outstanding()
    }

    /// Number of illustration requests in flight
    pub fn images_in_flight(&self) -> usize {
        self.image_busy.outstanding()
    }

    fn mark_message_busy(&self) -> Option<BusyGuard<'_, impl Fn(bool) + '_>> {
        let store = &self.store;
        let on_change =
            move |busy: bool| store.update(CardUpdate::new().generating_message(busy));
        match self.config.in_flight {
            InFlightPolicy::Concurrent => Some(self.message_busy.enter(on_change)),
            InFlightPolicy::SkipWhileBusy => self.message_busy.try_enter(on_change),
        }
    }

    fn mark_image_busy(&self) -> Option<BusyGuard<'_, impl Fn(bool) + '_>> {
        let store = &self.store;
        let on_change = move |busy: bool| store.update(CardUpdate::new().generating_image(busy));
        match self.config.in_flight {
            InFlightPolicy::Concurrent => Some(self.image_busy.enter(on_change)),
            InFlightPolicy::SkipWhileBusy => self.image_busy.try_enter(on_change),
        }
    }

    /// Write a wish for the card's current names and tone
    ///
    /// Requires non-blank recipient and sender; otherwise a warning notice is
    /// sent and nothing else happens. On success the card's message becomes
    /// the generated text; on an empty answer or a failure it becomes the
    /// matching fallback. The busy flag is always cleared before returning.
    pub async fn generate_message(&self) -> MessageOutcome {
        let card = self.store.snapshot();
        if !card.has_names() {
            tracing::info!("Wish requested without both names");
            self.notifier
                .notify(NotifyLevel::Warning, MISSING_NAMES_NOTICE);
            return MessageOutcome::MissingNames;
        }

        let Some(_busy) = self.mark_message_busy() else {
            tracing::debug!("Wish request already in flight, skipping");
            return MessageOutcome::Skipped;
        };

        let request = WishRequest::from_card(&card);
        let request_id = RequestId::new();
        tracing::info!(
            request_id = %request_id,
            backend = self.text.name(),
            tone = %request.tone,
            "Generating wish"
        );

        let result = WishResult::from(self.text.generate_wish(&request).await);
        let message = select_message(&result).to_string();
        self.store.update(CardUpdate::new().message(message.clone()));

        match result {
            WishResult::Generated(_) => {
                tracing::info!(request_id = %request_id, "Wish generated");
                MessageOutcome::Generated(message)
            }
            WishResult::Empty => {
                tracing::warn!(request_id = %request_id, "Wish service returned no text");
                MessageOutcome::EmptyFallback
            }
            WishResult::Failed(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Wish generation failed");
                MessageOutcome::FailureFallback(e.to_string())
            }
        }
    }

    /// Paint an illustration for the card's current tone
    ///
    /// Has no preconditions. The card's image is replaced only when the
    /// service returns an inline image; otherwise it is left as it was. The
    /// busy flag is always cleared before returning.
    pub async fn generate_image(&self) -> ImageOutcome {
        let Some(_busy) = self.mark_image_busy() else {
            tracing::debug!("Image request already in flight, skipping");
            return ImageOutcome::Skipped;
        };

        let request = ImageRequest::square(self.store.snapshot().tone);
        let request_id = RequestId::new();
        tracing::info!(
            request_id = %request_id,
            backend = self.image.name(),
            tone = %request.tone,
            "Generating illustration"
        );

        let result = ImageResult::from(self.image.generate_image(&request).await);
        if let Some(uri) = result.image_url() {
            self.store.update(CardUpdate::new().image_url(uri));
        }

        match result {
            ImageResult::Image(uri) => {
                tracing::info!(request_id = %request_id, bytes = uri.len(), "Illustration generated");
                ImageOutcome::Generated(uri)
            }
            ImageResult::NoImage => {
                tracing::warn!(request_id = %request_id, "Image service returned no inline image");
                ImageOutcome::NoImage
            }
            ImageResult::Failed(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Illustration generation failed");
                ImageOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run both operations concurrently and wait for both to settle
    pub async fn generate_all(&self) -> (MessageOutcome, ImageOutcome) {
        tokio::join!(self.generate_message(), self.generate_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardConfig, Tone, DEFAULT_IMAGE_URL, PLACEHOLDER_MESSAGE};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    // Mock text backend returning a canned result
    struct MockText {
        reply: Mutex<Option<Result<String, GenerationError>>>,
        requests: Mutex<Vec<WishRequest>>,
    }

    impl MockText {
        fn replying(reply: Result<String, GenerationError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for MockText {
        fn name(&self) -> &str {
            "MockText"
        }

        async fn generate_wish(&self, request: &WishRequest) -> Result<String, GenerationError> {
            self.requests.lock().push(request.clone());
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Ok("Merry Christmas!".to_string()))
        }
    }

    // Mock image backend returning canned parts
    struct MockImage {
        parts: Vec<ResponsePart>,
        fail: bool,
    }

    #[async_trait]
    impl ImageGenerator for MockImage {
        fn name(&self) -> &str {
            "MockImage"
        }

        async fn generate_image(
            &self,
            _request: &ImageRequest,
        ) -> Result<Vec<ResponsePart>, GenerationError> {
            if self.fail {
                Err(GenerationError::Other("boom".to_string()))
            } else {
                Ok(self.parts.clone())
            }
        }
    }

    fn orchestrator(
        text: MockText,
        image: MockImage,
    ) -> CardOrchestrator<MockText, MockImage> {
        let store = Arc::new(CardStore::new());
        store.update(CardUpdate::new().recipient("Jo Ann").sender("Sam"));
        CardOrchestrator::new(
            store,
            Arc::new(text),
            Arc::new(image),
            OrchestratorConfig::default(),
        )
    }

    fn no_image() -> MockImage {
        MockImage {
            parts: Vec::new(),
            fail: false,
        }
    }

    #[test]
    fn test_select_message() {
        assert_eq!(
            select_message(&WishResult::Generated("Hi".to_string())),
            "Hi"
        );
        assert_eq!(select_message(&WishResult::Empty), EMPTY_RESULT_FALLBACK);
        assert_eq!(
            select_message(&WishResult::Failed(GenerationError::MissingApiKey)),
            FAILURE_FALLBACK
        );
    }

    #[test]
    fn test_wish_result_from_blank_text() {
        assert!(matches!(
            WishResult::from(Ok("  \n".to_string())),
            WishResult::Empty
        ));
        assert!(matches!(
            WishResult::from(Ok(" Joy ".to_string())),
            WishResult::Generated(ref t) if t == "Joy"
        ));
    }

    #[test]
    fn test_image_result() {
        let result = ImageResult::from(Ok(vec![ResponsePart::inline("image/png", "AAAA")]));
        assert_eq!(result.image_url(), Some("data:image/png;base64,AAAA"));

        let result = ImageResult::from(Ok(vec![ResponsePart::text("sorry")]));
        assert_eq!(result.image_url(), None);

        let result = ImageResult::from(Err(GenerationError::MissingApiKey));
        assert_eq!(result.image_url(), None);
    }

    #[test]
    fn test_in_flight_policy_parsing() {
        assert_eq!(
            "skip-while-busy".parse::<InFlightPolicy>().unwrap(),
            InFlightPolicy::SkipWhileBusy
        );
        assert_eq!(
            "Concurrent".parse::<InFlightPolicy>().unwrap(),
            InFlightPolicy::Concurrent
        );
        assert!("queue".parse::<InFlightPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_generate_message_success() {
        let orch = orchestrator(MockText::replying(Ok("Joy to you!".to_string())), no_image());

        let outcome = orch.generate_message().await;
        assert_eq!(outcome, MessageOutcome::Generated("Joy to you!".to_string()));

        let card = orch.store().get();
        assert_eq!(card.message, "Joy to you!");
        assert!(!card.is_generating_message);
        assert_eq!(
            orch.text.requests.lock()[0],
            WishRequest::new("Jo Ann", "Sam", Tone::Heartfelt)
        );
    }

    #[tokio::test]
    async fn test_generate_message_missing_names() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let store = Arc::new(CardStore::with_config(CardConfig {
            sender: "Sam".to_string(),
            ..CardConfig::default()
        }));
        let orch = CardOrchestrator::new(
            Arc::clone(&store),
            Arc::new(MockText::replying(Ok("unused".to_string()))),
            Arc::new(no_image()),
            OrchestratorConfig::default(),
        )
        .with_notifier(Notifier::new(tx));

        let mut observer = store.subscribe();
        observer.borrow_and_update();

        assert_eq!(orch.generate_message().await, MessageOutcome::MissingNames);
        assert!(!observer.has_changed().unwrap());
        assert_eq!(store.get().message, PLACEHOLDER_MESSAGE);
        assert!(orch.text.requests.lock().is_empty());

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NotifyLevel::Warning);
        assert_eq!(notice.message, MISSING_NAMES_NOTICE);
    }

    #[tokio::test]
    async fn test_generate_message_empty_uses_fallback() {
        let orch = orchestrator(MockText::replying(Ok(String::new())), no_image());

        assert_eq!(orch.generate_message().await, MessageOutcome::EmptyFallback);
        assert_eq!(orch.store().get().message, EMPTY_RESULT_FALLBACK);
        assert!(!orch.store().get().is_generating_message);
    }

    #[tokio::test]
    async fn test_generate_message_failure_uses_fallback() {
        let orch = orchestrator(
            MockText::replying(Err(GenerationError::Other("offline".to_string()))),
            no_image(),
        );

        let outcome = orch.generate_message().await;
        assert_eq!(outcome, MessageOutcome::FailureFallback("offline".to_string()));
        assert_eq!(outcome.applied_message(), Some(FAILURE_FALLBACK));
        assert_eq!(orch.store().get().message, FAILURE_FALLBACK);
        assert!(!orch.store().get().is_generating_message);
    }

    #[tokio::test]
    async fn test_generate_image_success() {
        let orch = orchestrator(
            MockText::replying(Ok(String::new())),
            MockImage {
                parts: vec![
                    ResponsePart::text("here"),
                    ResponsePart::inline("image/png", "AAAA"),
                ],
                fail: false,
            },
        );

        let outcome = orch.generate_image().await;
        assert_eq!(
            outcome,
            ImageOutcome::Generated("data:image/png;base64,AAAA".to_string())
        );
        let card = orch.store().get();
        assert_eq!(card.image_url, "data:image/png;base64,AAAA");
        assert!(!card.is_generating_image);
    }

    #[tokio::test]
    async fn test_generate_image_without_inline_part_keeps_image() {
        let orch = orchestrator(MockText::replying(Ok(String::new())), no_image());

        assert_eq!(orch.generate_image().await, ImageOutcome::NoImage);
        assert_eq!(orch.store().get().image_url, DEFAULT_IMAGE_URL);
    }

    #[tokio::test]
    async fn test_generate_image_failure_keeps_image() {
        let orch = orchestrator(
            MockText::replying(Ok(String::new())),
            MockImage {
                parts: Vec::new(),
                fail: true,
            },
        );

        assert_eq!(
            orch.generate_image().await,
            ImageOutcome::Failed("boom".to_string())
        );
        let card = orch.store().get();
        assert_eq!(card.image_url, DEFAULT_IMAGE_URL);
        assert!(!card.is_generating_image);
    }

    #[tokio::test]
    async fn test_generate_image_runs_without_names() {
        let store = Arc::new(CardStore::new());
        let orch = CardOrchestrator::new(
            store,
            Arc::new(MockText::replying(Ok(String::new()))),
            Arc::new(MockImage {
                parts: vec![ResponsePart::inline("image/jpeg", "BBBB")],
                fail: false,
            }),
            OrchestratorConfig::default(),
        );

        assert_eq!(
            orch.generate_image().await,
            ImageOutcome::Generated("data:image/jpeg;base64,BBBB".to_string())
        );
    }

    #[tokio::test]
    async fn test_generate_all() {
        let orch = orchestrator(
            MockText::replying(Ok("Cheers".to_string())),
            MockImage {
                parts: vec![ResponsePart::inline("image/png", "AAAA")],
                fail: false,
            },
        );

        let (message, image) = orch.generate_all().await;
        assert_eq!(message, MessageOutcome::Generated("Cheers".to_string()));
        assert!(matches!(image, ImageOutcome::Generated(_)));

        let card = orch.store().get();
        assert_eq!(card.message, "Cheers");
        assert_eq!(card.image_url, "data:image/png;base64,AAAA");
        assert!(!card.is_generating_message);
        assert!(!card.is_generating_image);
    }
}
