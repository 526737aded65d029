//! Card Data Model
//!
//! The single greeting card a session composes: who it is for, who it is
//! from, the stylistic choices, and the currently displayed wish text and
//! illustration.
//!
//! # Design Philosophy
//!
//! A [`CardConfig`] is a plain value. It is never mutated in place by the
//! outside world; every change goes through a [`CardUpdate`] that produces a
//! new value from the previous one. This keeps "did the card change?" a
//! cheap identity check for observers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wish text shown before anything has been generated
pub const PLACEHOLDER_MESSAGE: &str = "Click the magic button to generate a special holiday wish...";

/// Illustration shown before anything has been generated
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1512389142860-9c449e58a543?auto=format&fit=crop&w=800&q=80";

// ============================================================================
// Tone
// ============================================================================

/// Stylistic register for the generated wish
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Warm and sincere
    #[default]
    Heartfelt,
    /// Light-hearted and playful
    Funny,
    /// Suitable for colleagues and clients
    Professional,
    /// Lyrical
    Poetic,
    /// One or two lines
    ShortAndSweet,
}

impl Tone {
    /// All tones, in display order
    pub const ALL: [Tone; 5] = [
        Tone::Heartfelt,
        Tone::Funny,
        Tone::Professional,
        Tone::Poetic,
        Tone::ShortAndSweet,
    ];

    /// Human-readable label, also used when prompting the text model
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Heartfelt => "Heartfelt",
            Self::Funny => "Funny",
            Self::Professional => "Professional",
            Self::Poetic => "Poetic",
            Self::ShortAndSweet => "Short & Sweet",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "heartfelt" => Ok(Self::Heartfelt),
            "funny" => Ok(Self::Funny),
            "professional" => Ok(Self::Professional),
            "poetic" => Ok(Self::Poetic),
            "shortandsweet" | "shortsweet" | "short" => Ok(Self::ShortAndSweet),
            _ => Err(format!(
                "unknown tone '{s}' (expected one of: heartfelt, funny, professional, poetic, short-and-sweet)"
            )),
        }
    }
}

// ============================================================================
// Frame Style
// ============================================================================

/// Decorative border applied when the card is rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStyle {
    /// Gold double border
    #[default]
    Classic,
    /// Red and white stripes
    CandyCane,
    /// Icy blue
    WinterFrost,
}

impl FrameStyle {
    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::CandyCane => "Candy Cane",
            Self::WinterFrost => "Winter Frost",
        }
    }
}

impl fmt::Display for FrameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrameStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "classic" => Ok(Self::Classic),
            "candycane" => Ok(Self::CandyCane),
            "winterfrost" | "frost" => Ok(Self::WinterFrost),
            _ => Err(format!(
                "unknown frame style '{s}' (expected one of: classic, candy-cane, winter-frost)"
            )),
        }
    }
}

// ============================================================================
// Card Configuration
// ============================================================================

/// The card being composed in this session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardConfig {
    /// Who the card is for (may be empty)
    pub recipient: String,
    /// Who the card is from (may be empty)
    pub sender: String,
    /// Register for generated text
    pub tone: Tone,
    /// Border treatment
    pub frame_style: FrameStyle,
    /// Currently displayed wish
    pub message: String,
    /// Currently displayed illustration (URL or `data:` URI)
    pub image_url: String,
    /// A text generation request is outstanding
    pub is_generating_message: bool,
    /// An image generation request is outstanding
    pub is_generating_image: bool,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            sender: String::new(),
            tone: Tone::default(),
            frame_style: FrameStyle::default(),
            message: PLACEHOLDER_MESSAGE.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            is_generating_message: false,
            is_generating_image: false,
        }
    }
}

impl CardConfig {
    /// Whether both names are present once surrounding whitespace is ignored
    #[must_use]
    pub fn has_names(&self) -> bool {
        !self.recipient.trim().is_empty() && !self.sender.trim().is_empty()
    }
}

/// A partial change to a [`CardConfig`]
///
/// Fields left as `None` keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardUpdate {
    /// New recipient
    pub recipient: Option<String>,
    /// New sender
    pub sender: Option<String>,
    /// New tone
    pub tone: Option<Tone>,
    /// New frame style
    pub frame_style: Option<FrameStyle>,
    /// New wish text
    pub message: Option<String>,
    /// New illustration
    pub image_url: Option<String>,
    /// New text busy flag
    pub is_generating_message: Option<bool>,
    /// New image busy flag
    pub is_generating_image: Option<bool>,
}

impl CardUpdate {
    /// Create an empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recipient
    #[must_use]
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Set the sender
    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Set the tone
    #[must_use]
    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    /// Set the frame style
    #[must_use]
    pub fn frame_style(mut self, frame_style: FrameStyle) -> Self {
        self.frame_style = Some(frame_style);
        self
    }

    /// Set the wish text
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the illustration
    #[must_use]
    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Set the text busy flag
    #[must_use]
    pub fn generating_message(mut self, busy: bool) -> Self {
        self.is_generating_message = Some(busy);
        self
    }

    /// Set the image busy flag
    #[must_use]
    pub fn generating_image(mut self, busy: bool) -> Self {
        self.is_generating_image = Some(busy);
        self
    }

    /// Whether this update would change nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce a new config with this update merged over `current`
    #[must_use]
    pub fn apply(&self, current: &CardConfig) -> CardConfig {
        CardConfig {
            recipient: self
                .recipient
                .clone()
                .unwrap_or_else(|| current.recipient.clone()),
            sender: self.sender.clone().unwrap_or_else(|| current.sender.clone()),
            tone: self.tone.unwrap_or(current.tone),
            frame_style: self.frame_style.unwrap_or(current.frame_style),
            message: self.message.clone().unwrap_or_else(|| current.message.clone()),
            image_url: self
                .image_url
                .clone()
                .unwrap_or_else(|| current.image_url.clone()),
            is_generating_message: self
                .is_generating_message
                .unwrap_or(current.is_generating_message),
            is_generating_image: self
                .is_generating_image
                .unwrap_or(current.is_generating_image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_card() {
        let card = CardConfig::default();
        assert_eq!(card.tone, Tone::Heartfelt);
        assert_eq!(card.frame_style, FrameStyle::Classic);
        assert_eq!(card.message, PLACEHOLDER_MESSAGE);
        assert_eq!(card.image_url, DEFAULT_IMAGE_URL);
        assert!(!card.is_generating_message);
        assert!(!card.is_generating_image);
        assert!(!card.has_names());
    }

    #[test]
    fn test_has_names_trims() {
        let card = CardUpdate::new()
            .recipient("  ")
            .sender("Santa")
            .apply(&CardConfig::default());
        assert!(!card.has_names());

        let card = CardUpdate::new().recipient(" Jo ").apply(&card);
        assert!(card.has_names());
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let base = CardUpdate::new()
            .recipient("Jo")
            .sender("Sam")
            .tone(Tone::Poetic)
            .apply(&CardConfig::default());

        let next = CardUpdate::new().message("Hello").apply(&base);
        assert_eq!(next.recipient, "Jo");
        assert_eq!(next.sender, "Sam");
        assert_eq!(next.tone, Tone::Poetic);
        assert_eq!(next.message, "Hello");
        assert_eq!(next.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn test_empty_update() {
        assert!(CardUpdate::new().is_empty());
        assert!(!CardUpdate::new().generating_image(false).is_empty());
        let card = CardConfig::default();
        assert_eq!(CardUpdate::new().apply(&card), card);
    }

    #[test]
    fn test_tone_parsing() {
        assert_eq!("funny".parse::<Tone>().unwrap(), Tone::Funny);
        assert_eq!("Short & Sweet".parse::<Tone>().unwrap(), Tone::ShortAndSweet);
        assert_eq!("short-and-sweet".parse::<Tone>().unwrap(), Tone::ShortAndSweet);
        assert!("grumpy".parse::<Tone>().is_err());
        for tone in Tone::ALL {
            assert_eq!(tone.label().parse::<Tone>().unwrap(), tone);
        }
    }

    #[test]
    fn test_frame_parsing() {
        assert_eq!("candy-cane".parse::<FrameStyle>().unwrap(), FrameStyle::CandyCane);
        assert_eq!("Winter Frost".parse::<FrameStyle>().unwrap(), FrameStyle::WinterFrost);
        assert!("plaid".parse::<FrameStyle>().is_err());
    }
}
