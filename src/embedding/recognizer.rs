// src/embedding/recognizer.rs
use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use tract_onnx::prelude::*;
use tracing::debug;

use super::detector::{load_plan, FaceBox, OnnxPlan};
use super::{EmbeddingError, Result};
use crate::core::identity::descriptor::Descriptor;

/// Margin added around a detection before cropping, as a fraction of its size.
const CROP_MARGIN: f32 = 0.125;

/// Maps an aligned `SxS` face crop to a descriptor.
pub struct FaceRecognizer {
    plan: OnnxPlan,
    size: usize,
}

impl FaceRecognizer {
    pub fn load(path: &Path, size: usize) -> Result<Self> {
        let plan = load_plan(path, [1, 3, size, size])?;
        debug!("Loaded face recognizer from {}", path.display());

        Ok(Self { plan, size })
    }

    pub fn describe(&self, face: &RgbImage) -> Result<Descriptor> {
        let side = self.size as u32;
        let resized = image::imageops::resize(face, side, side, FilterType::Triangle);
        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.size, self.size),
            |(_, c, y, x)| (resized.get_pixel(x as u32, y as u32)[c] as f32 - 127.5) / 128.0,
        )
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        let embedding = outputs
            .first()
            .ok_or_else(|| EmbeddingError::Output("recognizer produced no output".into()))?
            .to_array_view::<f32>()
            .map_err(|e| EmbeddingError::Output(e.to_string()))?
            .iter()
            .copied()
            .collect::<Vec<f32>>();

        if embedding.is_empty() {
            return Err(EmbeddingError::Output("recognizer produced an empty embedding".into()));
        }

        let descriptor = Descriptor::new(embedding).l2_normalized();
        if !descriptor.is_finite() {
            return Err(EmbeddingError::Output("recognizer produced non-finite values".into()));
        }
        Ok(descriptor)
    }
}

/// Cuts the detected face (plus margin) out of `image`. `None` when the box
/// collapses to zero pixels.
pub fn crop_face(image: &RgbImage, face: &FaceBox) -> Option<RgbImage> {
    let (width, height) = (image.width() as f32, image.height() as f32);
    let margin_x = (face.right - face.left) * CROP_MARGIN;
    let margin_y = (face.bottom - face.top) * CROP_MARGIN;

    let left = ((face.left - margin_x).max(0.0) * width).floor() as u32;
    let top = ((face.top - margin_y).max(0.0) * height).floor() as u32;
    let right = ((face.right + margin_x).min(1.0) * width).ceil() as u32;
    let bottom = ((face.bottom + margin_y).min(1.0) * height).ceil() as u32;

    let right = right.min(image.width());
    let bottom = bottom.min(image.height());
    if right <= left || bottom <= top {
        return None;
    }

    Some(image::imageops::crop_imm(image, left, top, right - left, bottom - top).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn face(left: f32, top: f32, right: f32, bottom: f32) -> FaceBox {
        FaceBox { left, top, right, bottom, confidence: 0.9 }
    }

    #[test]
    fn test_crop_includes_margin() {
        let image = RgbImage::from_pixel(64, 64, Rgb([1, 2, 3]));
        let crop = crop_face(&image, &face(0.25, 0.25, 0.75, 0.75)).unwrap();

        // 32px box grows by 4px on each side.
        assert_eq!((crop.width(), crop.height()), (40, 40));
    }

    #[test]
    fn test_crop_is_clamped_to_image() {
        let image = RgbImage::from_pixel(50, 40, Rgb([1, 2, 3]));
        let crop = crop_face(&image, &face(0.0, 0.0, 1.0, 1.0)).unwrap();

        assert_eq!((crop.width(), crop.height()), (50, 40));
    }

    #[test]
    fn test_empty_crop() {
        let image = RgbImage::from_pixel(10, 10, Rgb([1, 2, 3]));
        assert!(crop_face(&image, &face(0.5, 0.5, 0.5, 0.5)).is_none());
    }
}
