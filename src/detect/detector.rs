use anyhow::Result;

use crate::detect::backend::Model;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Label used when the model reports a class index it cannot name.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Thin adapter over a loaded model: runs inference and names each row.
///
/// Scores and boxes are passed through untouched.
pub struct Detector {
    model: Box<dyn Model>,
}

impl Detector {
    pub fn new<M: Model + 'static>(model: M) -> Self {
        Self {
            model: Box::new(model),
        }
    }

    pub fn from_boxed(model: Box<dyn Model>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.model.warm_up()
    }

    /// Detect objects in `frame`.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let raw = self.model.infer(frame)?;
        Ok(raw
            .into_iter()
            .map(|row| {
                let label = self.model.label_for(row.class_index).unwrap_or_else(|| {
                    log::debug!("model returned unknown class index {}", row.class_index);
                    UNKNOWN_LABEL
                });
                Detection::new(label, row.confidence, row.bbox)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backend::RawDetection;
    use crate::detect::result::BoundingBox;

    struct FixedModel(Vec<RawDetection>);

    impl Model for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn infer(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
            Ok(self.0.clone())
        }

        fn label_for(&self, class_index: usize) -> Option<&str> {
            ["person", "bicycle", "car"].get(class_index).copied()
        }
    }

    #[test]
    fn labels_rows_by_class_index() -> Result<()> {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let mut detector = Detector::new(FixedModel(vec![
            RawDetection {
                bbox,
                confidence: 0.9,
                class_index: 2,
            },
            RawDetection {
                bbox,
                confidence: 0.4,
                class_index: 0,
            },
            RawDetection {
                bbox,
                confidence: 0.1,
                class_index: 99,
            },
        ]));
        let frame = Frame::new(vec![0u8; 12], 2, 2, 3, 1);

        let detections = detector.detect(&frame)?;

        assert_eq!(detector.model_name(), "fixed");
        assert_eq!(
            detections,
            vec![
                Detection::new("car", 0.9, bbox),
                Detection::new("person", 0.4, bbox),
                Detection::new(UNKNOWN_LABEL, 0.1, bbox),
            ]
        );
        Ok(())
    }
}
