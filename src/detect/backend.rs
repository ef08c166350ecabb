use anyhow::Result;

use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// One raw model output row: box, score and class index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_index: usize,
}

/// Pretrained object-detection model.
///
/// The model is a black box: thresholds, suppression and accuracy are its own
/// business. Callers only read `(class_index, confidence, bbox)` rows and look
/// labels up by index.
pub trait Model {
    /// Model identifier (e.g. "yolov5s").
    fn name(&self) -> &str;

    /// Run inference on a frame.
    ///
    /// Implementations must treat the pixels as read-only and must not keep
    /// them beyond the call.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Label for a class index, if the index is known.
    fn label_for(&self, class_index: usize) -> Option<&str>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
