//! Sharing helper
//!
//! Builds the text a user sends a friend and the messaging link that opens
//! it. Pure functions of the current wish and the app's origin.

/// Messaging endpoint that accepts a prefilled `text` parameter
pub const SHARE_ENDPOINT: &str = "https://wa.me/";

/// Text shared along with a card
#[must_use]
pub fn share_text(message: &str, origin: &str) -> String {
    format!(
        "Check out this Christmas card I made for you! \u{2728}\n\n\"{message}\"\n\nCreate your own at: {origin}"
    )
}

/// Messaging link that opens a chat prefilled with [`share_text`]
#[must_use]
pub fn share_link(message: &str, origin: &str) -> String {
    let text = share_text(message, origin);
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("{SHARE_ENDPOINT}?text={encoded}")
}
