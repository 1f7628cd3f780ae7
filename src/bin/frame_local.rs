//! Local framing harness.
//!
//! Runs the analyze and composite steps against a file on disk and writes
//! `test_<verdict>.png`, without touching storage.
//!
//! ## Usage
//! `frame-local <image> [--frames <dir>] [--out-dir <dir>]`
//!
//! ## Environment Variables
//! - `GEMINI_API_KEY` - classify with Gemini; without it the verdict is `no`
//! - `GEMINI_MODEL` - model name (default: `gemini-1.5-pro-latest`)
//! - `FRAMES_DIR` - frame directory when `--frames` is not given
//! - `FRAME_PADDING` - interior padding in pixels (default: `50`)

use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use photoframe::config::parse_or;
use photoframe::constants::{DEFAULT_FRAME_PADDING, DEFAULT_FRAMES_DIR, DEFAULT_GEMINI_MODEL};
use photoframe::frames::FrameSet;
use photoframe::services::classifier::{
    Classification, GeminiClassifier, classify_or_default, mime_type_of,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Args {
    image: PathBuf,
    frames_dir: PathBuf,
    out_dir: PathBuf,
}

fn parse_args() -> Result<Args, BoxError> {
    let mut image = None;
    let mut frames_dir = std::env::var("FRAMES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_FRAMES_DIR));
    let mut out_dir = PathBuf::from(".");

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => frames_dir = args.next().ok_or("--frames needs a directory")?.into(),
            "--out-dir" => out_dir = args.next().ok_or("--out-dir needs a directory")?.into(),
            other if image.is_none() => image = Some(PathBuf::from(other)),
            other => return Err(format!("Unexpected argument: {}", other).into()),
        }
    }

    Ok(Args {
        image: image.ok_or("Usage: frame-local <image> [--frames <dir>] [--out-dir <dir>]")?,
        frames_dir,
        out_dir,
    })
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoframe=debug,frame_local=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let args = parse_args()?;

    let data = tokio::fs::read(&args.image)
        .await
        .map_err(|e| format!("Failed to read {:?}: {}", args.image, e))?;
    let photo = image::load_from_memory(&data)?;
    tracing::info!(
        "Image loaded: {}x{} pixels, color: {:?}",
        photo.width(),
        photo.height(),
        photo.color()
    );
    let photo = photo.to_rgb8();

    let classification = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let model =
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
            let gemini = GeminiClassifier::new(&key, &model);
            classify_or_default(&gemini, &data, mime_type_of(&data)).await
        }
        _ => {
            tracing::warn!("GEMINI_API_KEY not set, skipping analysis");
            Classification::fallback()
        }
    };
    let verdict = classification.verdict;
    tracing::info!("Verdict: {} (model said '{}')", verdict, classification.reply);

    let padding = parse_or(
        "FRAME_PADDING",
        std::env::var("FRAME_PADDING").ok().filter(|v| !v.trim().is_empty()),
        DEFAULT_FRAME_PADDING,
    )?;
    let frames = FrameSet::new(&args.frames_dir, padding);
    let framed = frames.frame_or_original(photo, verdict);

    let out_path = args.out_dir.join(format!("test_{}.png", verdict));
    framed.save(&out_path)?;
    tracing::info!("Saved result as {:?}", out_path);

    Ok(())
}
