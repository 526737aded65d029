//! Card Studio - Holiday cards from the command line
//!
//! Fills in a card, asks the generation service for a wish and an
//! illustration, and optionally saves the result as a PNG and prints a link
//! for sharing it.
//!
//! # Usage
//!
//! ```bash
//! # Wish and illustration for Ana, from Luis
//! card-studio --recipient Ana --sender Luis --tone funny
//!
//! # Keep the stock illustration, save a candy-cane PNG
//! card-studio -r Ana -s Luis --frame candy-cane --no-image --export
//!
//! # Print a share link as well
//! card-studio -r Ana -s Luis --share --origin https://cards.example.com
//!
//! # Verbose logging
//! RUST_LOG=debug card-studio -r Ana -s Luis
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

use card_studio_core::config::{default_config_path, load_config_from_path};
use card_studio_core::{
    data_uri, share_link, CardConfig, CardOrchestrator, CardRasterizer, CardStore, CardSurface,
    CardUpdate, ConfigOverrides, DirectoryDownloads, ExportAdapter, ExportOutcome, FrameStyle,
    GeminiBackend, ImageOutcome, MessageOutcome, Notice, Notifier, NotifyLevel, RenderSurface,
    Tone,
};

/// Capacity of the notice channel; notices past this are dropped
const NOTICE_CAPACITY: usize = 32;

/// Card Studio - AI-assisted holiday cards
#[derive(Parser, Debug)]
#[command(name = "card-studio")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Who the card is for
    #[arg(short = 'r', long, default_value = "")]
    recipient: String,

    /// Who the card is from
    #[arg(short = 's', long, default_value = "")]
    sender: String,

    /// Tone of the wish (heartfelt, funny, professional, poetic, short-and-sweet)
    #[arg(short = 't', long, default_value = "heartfelt")]
    tone: Tone,

    /// Frame style (classic, candy-cane, winter-frost)
    #[arg(short = 'f', long, default_value = "classic")]
    frame: FrameStyle,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CARD_STUDIO_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model used for the wish
    #[arg(long, value_name = "MODEL")]
    text_model: Option<String>,

    /// Model used for the illustration
    #[arg(long, value_name = "MODEL")]
    image_model: Option<String>,

    /// Directory exported cards are saved to
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Origin linked from shared messages
    #[arg(long, value_name = "URL")]
    origin: Option<String>,

    /// Do not generate a wish
    #[arg(long)]
    no_message: bool,

    /// Do not generate an illustration
    #[arg(long)]
    no_image: bool,

    /// Save the finished card as a PNG
    #[arg(short = 'e', long)]
    export: bool,

    /// Print a share link for the finished wish
    #[arg(long)]
    share: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CARD_STUDIO_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref model) = self.text_model {
            overrides = overrides.with_text_model(model.clone());
        }
        if let Some(ref model) = self.image_model {
            overrides = overrides.with_image_model(model.clone());
        }
        if let Some(ref dir) = self.download_dir {
            overrides = overrides.with_download_dir(dir.clone());
        }
        if let Some(ref origin) = self.origin {
            overrides = overrides.with_share_origin(origin.clone());
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("card_studio={level},card_studio_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_notice(notice: &Notice) {
    let prefix = match notice.level {
        NotifyLevel::Info => "info",
        NotifyLevel::Warning => "warning",
        NotifyLevel::Error => "error",
        NotifyLevel::Success => "done",
    };
    eprintln!("[{prefix}] {}", notice.message);
}

fn describe_image(image_url: &str) -> String {
    match data_uri::parse(image_url) {
        Ok(decoded) => format!("embedded {} ({} bytes)", decoded.mime_type, decoded.bytes.len()),
        Err(_) => image_url.to_string(),
    }
}

fn print_card(card: &CardConfig) {
    println!("To:      {}", card.recipient);
    println!("From:    {}", card.sender);
    println!("Tone:    {}", card.tone);
    println!("Frame:   {}", card.frame_style);
    println!("Image:   {}", describe_image(&card.image_url));
    println!();
    println!("{}", card.message);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    info!(source = %config.source(), "Configuration loaded");
    if !config.has_api_key() && !(args.no_message && args.no_image) {
        tracing::warn!("No API key configured; generation will fall back");
    }

    let (notice_tx, mut notice_rx) = mpsc::channel(NOTICE_CAPACITY);
    let notifier = Notifier::new(notice_tx);

    let store = Arc::new(CardStore::new());
    store.update(
        CardUpdate::new()
            .recipient(args.recipient.clone())
            .sender(args.sender.clone())
            .tone(args.tone)
            .frame_style(args.frame),
    );

    let backend =
        Arc::new(GeminiBackend::new(config.gemini.clone()).context("Failed to build client")?);
    let orchestrator = CardOrchestrator::new(
        store.clone(),
        backend.clone(),
        backend,
        config.orchestrator.clone(),
    )
    .with_notifier(notifier.clone());

    let (message, image) = match (args.no_message, args.no_image) {
        (false, false) => {
            let (m, i) = orchestrator.generate_all().await;
            (Some(m), Some(i))
        }
        (false, true) => (Some(orchestrator.generate_message().await), None),
        (true, false) => (None, Some(orchestrator.generate_image().await)),
        (true, true) => (None, None),
    };
    debug!(?message, ?image, "Generation settled");

    match message {
        Some(MessageOutcome::FailureFallback(e)) => eprintln!("[warning] wish service failed: {e}"),
        Some(MessageOutcome::EmptyFallback) => eprintln!("[warning] wish service returned nothing"),
        _ => {}
    }
    if let Some(ImageOutcome::Failed(e)) = image {
        eprintln!("[warning] illustration service failed: {e}");
    }

    if args.export {
        let download_dir = config.export.resolved_download_dir();
        let adapter = ExportAdapter::new(
            CardRasterizer::new(),
            DirectoryDownloads::new(download_dir),
            config.export.clone(),
        )
        .with_notifier(notifier.clone());

        let surface = CardSurface::new(store.clone());
        let surface: &dyn RenderSurface = &surface;
        if let ExportOutcome::Saved { path, .. } = adapter.export(Some(surface)).await {
            notifier.notify(NotifyLevel::Success, format!("Saved {}", path.display()));
        }
    }

    while let Ok(notice) = notice_rx.try_recv() {
        print_notice(&notice);
    }

    let card = store.get();
    print_card(&card);

    if args.share {
        println!();
        println!("{}", share_link(&card.message, &config.share_origin));
    }

    Ok(())
}
