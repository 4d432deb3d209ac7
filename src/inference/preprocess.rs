//! Frame preprocessing: letterbox, normalize, tensorize.

use crate::constants::{INPUT_CHANNELS, LETTERBOX_GRAY};
use crate::error::{Error, Result};
use crate::model::{Normalization, Tensor, TensorRegistry};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;
use std::borrow::Cow;
use std::path::Path;

/// A camera frame or uploaded image.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Already decoded bitmap.
    Decoded(DynamicImage),
    /// Encoded image bytes (JPEG, PNG, WebP, BMP).
    Encoded(Vec<u8>),
}

impl Frame {
    /// Read an image file as an encoded frame.
    pub fn from_path(path: &Path) -> Result<Self> {
        std::fs::read(path).map(Self::Encoded).map_err(|e| Error::ImageOpen {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })
    }

    /// The frame as a bitmap, decoding if necessary.
    pub fn decode(&self) -> Result<Cow<'_, DynamicImage>> {
        match self {
            Self::Decoded(image) => Ok(Cow::Borrowed(image)),
            Self::Encoded(bytes) => image::load_from_memory(bytes)
                .map(Cow::Owned)
                .map_err(|source| Error::FrameDecode { source }),
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self::Decoded(image)
    }
}

/// Turn a frame into a `[1, edge, edge, 3]` tensor.
///
/// The image is scaled to fit inside the square, centred, and padded with
/// neutral gray. Alpha is dropped and grayscale is expanded to RGB.
pub fn preprocess(
    frame: &Frame,
    edge: u32,
    normalization: Normalization,
    registry: &TensorRegistry,
) -> Result<Tensor> {
    let image = frame.decode()?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Preprocess {
            reason: format!("frame has zero size ({width}x{height})"),
        });
    }
    if edge == 0 {
        return Err(Error::Preprocess {
            reason: "target edge is zero".to_string(),
        });
    }

    let canvas = letterbox(&image.to_rgb8(), edge);
    let side = edge as usize;
    let values: Vec<f32> = canvas
        .into_raw()
        .into_iter()
        .map(|v| normalization.apply(v))
        .collect();
    let data = Array4::from_shape_vec((1, side, side, INPUT_CHANNELS), values).map_err(|e| {
        Error::Preprocess {
            reason: format!("unexpected buffer size: {e}"),
        }
    })?;

    Ok(registry.track(data.into_dyn()))
}

fn letterbox(rgb: &RgbImage, edge: u32) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let longest = u64::from(width.max(height));
    let fit = |side: u32| {
        let scaled = (u64::from(side) * u64::from(edge) + longest / 2) / longest;
        u32::try_from(scaled).unwrap_or(edge).clamp(1, edge)
    };
    let (new_w, new_h) = (fit(width), fit(height));

    let resized = imageops::resize(rgb, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(edge, edge, Rgb([LETTERBOX_GRAY; 3]));
    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from((edge - new_w) / 2),
        i64::from((edge - new_h) / 2),
    );
    canvas
}
