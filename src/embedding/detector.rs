// src/embedding/detector.rs
use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use tract_onnx::prelude::*;
use tracing::debug;

use super::{EmbeddingError, Result};

pub(super) type OnnxPlan =
    SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Detection in normalized `[0, 1]` image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub confidence: f32,
}

/// UltraFace-style detector: one `1x3xHxW` input, a `[1, N, 2]` score output
/// (background, face) and a `[1, N, 4]` box output of normalized corners.
pub struct FaceDetector {
    plan: OnnxPlan,
    width: usize,
    height: usize,
    min_confidence: f32,
}

impl FaceDetector {
    pub fn load(path: &Path, width: usize, height: usize, min_confidence: f32) -> Result<Self> {
        let plan = load_plan(path, [1, 3, height, width])?;
        debug!("Loaded face detector from {}", path.display());

        Ok(Self {
            plan,
            width,
            height,
            min_confidence,
        })
    }

    /// Highest-confidence face above the configured minimum, if any.
    pub fn detect(&self, image: &RgbImage) -> Result<Option<FaceBox>> {
        let resized = image::imageops::resize(
            image,
            self.width as u32,
            self.height as u32,
            FilterType::Triangle,
        );
        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height, self.width),
            |(_, c, y, x)| (resized.get_pixel(x as u32, y as u32)[c] as f32 - 127.0) / 128.0,
        )
        .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let mut scores: Option<Vec<f32>> = None;
        let mut boxes: Option<Vec<f32>> = None;
        for output in outputs.iter() {
            let view = output
                .to_array_view::<f32>()
                .map_err(|e| EmbeddingError::Output(e.to_string()))?;
            match view.shape().last() {
                Some(2) => scores = Some(view.iter().copied().collect()),
                Some(4) => boxes = Some(view.iter().copied().collect()),
                _ => {}
            }
        }

        let scores = scores.ok_or_else(|| EmbeddingError::Output("detector produced no score tensor".into()))?;
        let boxes = boxes.ok_or_else(|| EmbeddingError::Output("detector produced no box tensor".into()))?;

        select_best(&scores, &boxes, self.min_confidence)
    }
}

pub(super) fn load_plan(path: &Path, shape: [usize; 4]) -> Result<OnnxPlan> {
    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| EmbeddingError::ModelLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Picks the candidate with the highest face score. Ties keep the earliest
/// candidate.
pub(super) fn select_best(scores: &[f32], boxes: &[f32], min_confidence: f32) -> Result<Option<FaceBox>> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(EmbeddingError::Output(format!(
            "score/box tensors disagree: {} scores, {} box values",
            scores.len(),
            boxes.len()
        )));
    }

    let mut best: Option<FaceBox> = None;
    for (score, corners) in scores.chunks_exact(2).zip(boxes.chunks_exact(4)) {
        let confidence = score[1];
        if !confidence.is_finite() || confidence < min_confidence {
            continue;
        }
        if best.map_or(true, |b| confidence > b.confidence) {
            best = Some(FaceBox {
                left: corners[0].clamp(0.0, 1.0),
                top: corners[1].clamp(0.0, 1.0),
                right: corners[2].clamp(0.0, 1.0),
                bottom: corners[3].clamp(0.0, 1.0),
                confidence,
            });
        }
    }

    Ok(best.filter(|b| b.right > b.left && b.bottom > b.top))
}
