use std::borrow::Cow;

/// Pascal VOC class names in network output order. Index 0 is the
/// background class the network never reports.
pub const VOC_CLASSES: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// Ordered class names indexed by the integer class id of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSet {
    names: &'static [&'static str],
}

impl LabelSet {
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub const fn voc() -> Self {
        Self::new(&VOC_CLASSES)
    }

    pub const fn len(&self) -> usize {
        self.names.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for `class_id`, or `class_{id}` if the id is outside the set.
    pub fn name(&self, class_id: usize) -> Cow<'static, str> {
        match self.names.get(class_id) {
            Some(name) => Cow::Borrowed(*name),
            None => Cow::Owned(format!("class_{class_id}")),
        }
    }

    /// Text drawn next to a box, e.g. `car: 0.91`.
    pub fn label_text(&self, class_id: usize, confidence: f32) -> String {
        format!("{}: {:.2}", self.name(class_id), confidence)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::voc()
    }
}
