use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::{Model, RawDetection};
use crate::detect::labels::{coco_index, coco_label};
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Stub model for dry runs. Reports one object whenever the scene changes.
///
/// A scene change is a pixel hash that differs from the previous frame. The
/// reported object covers the middle of the frame.
pub struct StubModel {
    class_index: usize,
    last_hash: Option<[u8; 32]>,
}

impl StubModel {
    /// Report `label` (a COCO name) on every scene change. Unknown labels fall back to `car`.
    pub fn new(label: &str) -> Self {
        Self {
            class_index: coco_index(label).unwrap_or(2),
            last_hash: None,
        }
    }
}

impl Default for StubModel {
    fn default() -> Self {
        Self::new("car")
    }
}

impl Model for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let current_hash: [u8; 32] = Sha256::digest(frame.pixels()).into();

        let changed = self.last_hash.is_some_and(|prev| prev != current_hash);

        self.last_hash = Some(current_hash);

        if !changed {
            return Ok(Vec::new());
        }

        let (w, h) = (frame.width as f32, frame.height as f32);
        Ok(vec![RawDetection {
            bbox: BoundingBox::new(w * 0.25, h * 0.25, w * 0.75, h * 0.75),
            confidence: 0.85,
            class_index: self.class_index,
        }])
    }

    fn label_for(&self, class_index: usize) -> Option<&str> {
        coco_label(class_index)
    }
}
