#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{Model, RawDetection};
use crate::detect::labels::coco_label;
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Tract-based YOLOv5 model loaded from a local ONNX export.
///
/// Frames are resized (nearest neighbour) to the model input. Output rows are
/// `[cx, cy, w, h, objectness, class scores...]` in input pixels; this backend
/// applies the confidence threshold and per-class NMS the exported graph
/// leaves out, then maps boxes back to frame coordinates.
pub struct TractModel {
    name: String,
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl TractModel {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(
        name: &str,
        model_path: P,
        input_width: u32,
        input_height: u32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            name: name.to_string(),
            model,
            input_width,
            input_height,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        })
    }

    /// Override the default confidence and IoU thresholds.
    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.channels != 3 {
            return Err(anyhow!("expected RGB frame, got {} channels", frame.channels));
        }
        if !frame.is_well_formed() || frame.width == 0 || frame.height == 0 {
            return Err(anyhow!(
                "frame buffer does not match {}x{}x{}",
                frame.width,
                frame.height,
                frame.channels
            ));
        }

        let pixels = frame.pixels();
        let (src_w, src_h) = (frame.width as usize, frame.height as usize);
        let (dst_w, dst_h) = (self.input_width as usize, self.input_height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, dst_h, dst_w), |(_, c, y, x)| {
            let sx = x * src_w / dst_w;
            let sy = y * src_h / dst_h;
            pixels[(sy * src_w + sx) * 3 + c] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[2] < 6 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let rows = view
            .into_shape((shape[1], shape[2]))
            .context("failed to reshape YOLO output")?;

        let scale_x = frame.width as f32 / self.input_width as f32;
        let scale_y = frame.height as f32 / self.input_height as f32;

        let mut candidates = Vec::new();
        for row in rows.outer_iter() {
            let objectness = row[4];
            if objectness < self.confidence_threshold {
                continue;
            }
            let Some((class_index, class_score)) = row
                .iter()
                .skip(5)
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };
            let confidence = objectness * class_score;
            if confidence < self.confidence_threshold {
                continue;
            }
            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            candidates.push(RawDetection {
                bbox: BoundingBox::new(
                    (cx - w / 2.0) * scale_x,
                    (cy - h / 2.0) * scale_y,
                    (cx + w / 2.0) * scale_x,
                    (cy + h / 2.0) * scale_y,
                ),
                confidence,
                class_index,
            });
        }

        Ok(non_max_suppression(
            candidates,
            self.iou_threshold,
            self.max_detections,
        ))
    }
}

impl Model for TractModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn label_for(&self, class_index: usize) -> Option<&str> {
        coco_label(class_index)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::new(
            vec![0u8; (self.input_width * self.input_height * 3) as usize],
            self.input_width,
            self.input_height,
            3,
            0,
        );
        self.infer(&blank).map(|_| ())
    }
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
