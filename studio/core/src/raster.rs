//! Card rasterizer
//!
//! A [`RasterCapture`] that paints the card with the `image` crate: an opaque
//! background, the frame border for the card's [`FrameStyle`], and the
//! illustration fitted into the upper panel. Illustrations that are not
//! `data:` URIs (the stock default, remote URLs) leave the panel blank;
//! capture never touches the network.
//!
//! Wish text is not painted; the lower panel is left for it.

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::card::{CardConfig, FrameStyle};
use crate::data_uri;
use crate::export::{CaptureError, CaptureOptions, RasterCapture, RenderSurface, RgbColor};

/// Largest capture edge, in device pixels
pub const MAX_CAPTURE_EDGE: u32 = 8192;

/// Frame thickness, logical pixels
const FRAME_WIDTH: u32 = 14;
/// Gap between frame and panels, logical pixels
const PANEL_INSET: u32 = 16;
/// Width of one candy-cane stripe, logical pixels
const STRIPE_WIDTH: u32 = 12;

const PANEL_PLACEHOLDER: Rgba<u8> = Rgba([0xee, 0xee, 0xee, 0xff]);
const MESSAGE_PANEL: Rgba<u8> = Rgba([0xfd, 0xf8, 0xee, 0xff]);

fn opaque(color: RgbColor) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 0xff])
}

/// Outer and inner colors of a frame style
fn frame_colors(style: FrameStyle) -> (Rgba<u8>, Rgba<u8>) {
    match style {
        FrameStyle::Classic => (Rgba([0xc9, 0xa2, 0x27, 0xff]), Rgba([0x8a, 0x6d, 0x1a, 0xff])),
        FrameStyle::CandyCane => (Rgba([0xc6, 0x28, 0x28, 0xff]), Rgba([0xff, 0xff, 0xff, 0xff])),
        FrameStyle::WinterFrost => (Rgba([0xa8, 0xd8, 0xea, 0xff]), Rgba([0xe8, 0xf6, 0xfb, 0xff])),
    }
}

fn paint_frame(canvas: &mut RgbaImage, style: FrameStyle, scale: u32) {
    let (width, height) = canvas.dimensions();
    let band = FRAME_WIDTH * scale;
    let hairline = band.saturating_sub(3 * scale);
    let stripe = STRIPE_WIDTH * scale;
    let (outer, inner) = frame_colors(style);

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let depth = x.min(y).min(width - 1 - x).min(height - 1 - y);
        if depth >= band {
            continue;
        }
        *pixel = match style {
            FrameStyle::CandyCane => {
                if ((x + y) / stripe) % 2 == 0 {
                    outer
                } else {
                    inner
                }
            }
            FrameStyle::Classic | FrameStyle::WinterFrost => {
                if depth >= hairline {
                    inner
                } else {
                    outer
                }
            }
        };
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    for py in y..(y + height).min(canvas.height()) {
        for px in x..(x + width).min(canvas.width()) {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// Decode the card's illustration, if it is an embedded image
fn decode_illustration(image_url: &str) -> Option<image::DynamicImage> {
    if !data_uri::is_data_uri(image_url) {
        return None;
    }
    let decoded = match data_uri::parse(image_url) {
        Ok(d) => d,
        Err(e) => {
            tracing::debug!(error = %e, "Illustration is not a usable data URI");
            return None;
        }
    };
    match image::load_from_memory(&decoded.bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::debug!(error = %e, mime_type = %decoded.mime_type, "Illustration failed to decode");
            None
        }
    }
}

/// Paint `card` at `size` logical pixels
///
/// # Errors
///
/// Returns an error for a zero pixel ratio or a capture larger than
/// [`MAX_CAPTURE_EDGE`] on either side.
pub fn render_card(
    card: &CardConfig,
    size: (u32, u32),
    options: &CaptureOptions,
) -> Result<RgbaImage, CaptureError> {
    let scale = options.pixel_ratio;
    if scale == 0 {
        return Err(CaptureError::InvalidPixelRatio(scale));
    }
    let too_large = || CaptureError::TooLarge {
        width: size.0.saturating_mul(scale),
        height: size.1.saturating_mul(scale),
    };
    let width = size.0.checked_mul(scale).ok_or_else(too_large)?;
    let height = size.1.checked_mul(scale).ok_or_else(too_large)?;
    if width == 0 || height == 0 || width > MAX_CAPTURE_EDGE || height > MAX_CAPTURE_EDGE {
        return Err(too_large());
    }

    let mut canvas = RgbaImage::from_pixel(width, height, opaque(options.background));
    paint_frame(&mut canvas, card.frame_style, scale);

    let inset = (FRAME_WIDTH + PANEL_INSET) * scale;
    let panel = width.saturating_sub(2 * inset);
    match decode_illustration(&card.image_url) {
        Some(img) if panel > 0 => {
            let fitted = img.resize_to_fill(panel, panel, FilterType::Triangle).to_rgba8();
            imageops::overlay(&mut canvas, &fitted, i64::from(inset), i64::from(inset));
        }
        _ => fill_rect(&mut canvas, inset, inset, panel, panel, PANEL_PLACEHOLDER),
    }

    let message_top = inset + panel + PANEL_INSET * scale;
    let message_height = height.saturating_sub(inset).saturating_sub(message_top);
    fill_rect(&mut canvas, inset, message_top, panel, message_height, MESSAGE_PANEL);

    Ok(canvas)
}

/// Encode `image` as a PNG `data:` URI
///
/// # Errors
///
/// Returns an error if PNG encoding fails.
pub fn encode_png(image: &RgbaImage) -> Result<String, CaptureError> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(data_uri::from_bytes("image/png", &bytes))
}

/// Rasterizes card surfaces to PNG
///
/// The PNG carries the frame, background and illustration only. The wish
/// text is not painted; the message panel is left as a plain fill, so the
/// text has to travel alongside the image (e.g. via [`crate::share`]).
#[derive(Clone, Copy, Debug, Default)]
pub struct CardRasterizer;

impl CardRasterizer {
    /// Create a rasterizer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RasterCapture for CardRasterizer {
    async fn capture(
        &self,
        surface: &dyn RenderSurface,
        options: &CaptureOptions,
    ) -> Result<String, CaptureError> {
        let card = surface.card();
        let size = surface.size();
        let options = options.clone();

        tokio::task::spawn_blocking(move || {
            let image = render_card(&card, size, &options)?;
            encode_png(&image)
        })
        .await
        .map_err(|e| CaptureError::Render(e.to_string()))?
    }
}
