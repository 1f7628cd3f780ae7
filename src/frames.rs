//! Frame compositing
//!
//! Fits the user's photo inside the interior of a frame, lays the frame
//! artwork over it and flattens the result onto white. The output always has
//! the frame's exact dimensions.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::PathBuf;

use crate::models::Verdict;

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to read frame {path:?}: {source}")]
    FrameIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// Resize `image` to fit within `target_width` x `target_height`, keeping its
/// aspect ratio. Small images are scaled up.
pub fn resize_to_fit(
    image: &RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbImage, CompositeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CompositeError::InvalidImage(format!(
            "source image has no pixels ({}x{})",
            width, height
        )));
    }
    if target_width == 0 || target_height == 0 {
        return Err(CompositeError::InvalidImage(format!(
            "target box has no area ({}x{})",
            target_width, target_height
        )));
    }

    let width_ratio = target_width as f64 / width as f64;
    let height_ratio = target_height as f64 / height as f64;
    let scale = width_ratio.min(height_ratio);

    let new_width = (width as f64 * scale).floor() as u32;
    let new_height = (height as f64 * scale).floor() as u32;
    if new_width == 0 || new_height == 0 {
        return Err(CompositeError::InvalidImage(format!(
            "{}x{} collapses to {}x{} at scale {:.4}",
            width, height, new_width, new_height, scale
        )));
    }

    tracing::debug!(
        "Resized image from {}x{} to {}x{}",
        width,
        height,
        new_width,
        new_height
    );

    Ok(imageops::resize(image, new_width, new_height, FilterType::Lanczos3))
}

/// Composite `photo` under `frame`.
///
/// The photo is fitted into the frame minus `padding` on every side, centered
/// on a white canvas, covered by the frame (alpha-over) and flattened.
pub fn compose(
    photo: &RgbImage,
    frame: &RgbaImage,
    padding: u32,
) -> Result<RgbImage, CompositeError> {
    let (frame_width, frame_height) = frame.dimensions();
    let inner_width = frame_width.saturating_sub(padding.saturating_mul(2));
    let inner_height = frame_height.saturating_sub(padding.saturating_mul(2));

    let resized = resize_to_fit(photo, inner_width, inner_height)?;

    let mut canvas = RgbaImage::from_pixel(frame_width, frame_height, Rgba([255, 255, 255, 255]));

    let x_offset = (frame_width - resized.width()) / 2;
    let y_offset = (frame_height - resized.height()) / 2;

    let resized = DynamicImage::ImageRgb8(resized).to_rgba8();
    imageops::replace(&mut canvas, &resized, x_offset as i64, y_offset as i64);

    imageops::overlay(&mut canvas, frame, 0, 0);

    Ok(flatten_onto_white(&canvas))
}

/// Drop the alpha channel by blending every pixel over opaque white.
fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let alpha = a as u16;
        let mix = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([mix(r), mix(g), mix(b)])
    })
}

/// The two frame assets shipped with the deployment, one per verdict.
#[derive(Debug, Clone)]
pub struct FrameSet {
    dir: PathBuf,
    padding: u32,
}

impl FrameSet {
    pub fn new(dir: impl Into<PathBuf>, padding: u32) -> Self {
        Self {
            dir: dir.into(),
            padding,
        }
    }

    /// `<dir>/yes.png` or `<dir>/no.png`
    pub fn path_for(&self, verdict: Verdict) -> PathBuf {
        self.dir.join(format!("{}.png", verdict.as_str()))
    }

    /// Read and decode the frame for `verdict` as RGBA.
    pub fn load(&self, verdict: Verdict) -> Result<RgbaImage, CompositeError> {
        let path = self.path_for(verdict);
        let data = std::fs::read(&path).map_err(|source| CompositeError::FrameIo {
            path: path.clone(),
            source,
        })?;
        let frame = image::load_from_memory(&data)?.to_rgba8();
        tracing::info!(
            "Frame loaded: {}x{} pixels from {:?}",
            frame.width(),
            frame.height(),
            path
        );
        Ok(frame)
    }

    pub fn compose(&self, photo: &RgbImage, verdict: Verdict) -> Result<RgbImage, CompositeError> {
        let frame = self.load(verdict)?;
        compose(photo, &frame, self.padding)
    }

    /// Frame the photo, or hand it back untouched if framing fails.
    pub fn frame_or_original(&self, photo: RgbImage, verdict: Verdict) -> RgbImage {
        match self.compose(&photo, verdict) {
            Ok(framed) => framed,
            Err(e) => {
                tracing::warn!(%verdict, error = %e, "Error creating framed image, using original");
                photo
            }
        }
    }
}
