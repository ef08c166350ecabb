//! Class names for models trained on COCO (YOLOv5 ordering).

pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

pub fn coco_label(class_index: usize) -> Option<&'static str> {
    COCO_LABELS.get(class_index).copied()
}

/// Index of a COCO label, if present.
pub fn coco_index(label: &str) -> Option<usize> {
    COCO_LABELS.iter().position(|name| *name == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_classes_have_expected_indices() {
        assert_eq!(coco_index("car"), Some(2));
        assert_eq!(coco_index("motorcycle"), Some(3));
        assert_eq!(coco_index("bus"), Some(5));
        assert_eq!(coco_index("truck"), Some(7));
        assert_eq!(coco_label(0), Some("person"));
        assert_eq!(coco_label(80), None);
    }
}
