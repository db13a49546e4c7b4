//! Contract with the external vision collaborator: frame in, label out.

use crate::HwResult;

/// A captured RGB8 frame, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Result of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    /// Percent, `0.0..=100.0`.
    pub confidence: f32,
    /// Crop of the detected part, when the classifier produced one.
    pub crop: Option<Frame>,
}

pub trait FrameSource: Send {
    fn capture(&mut self) -> HwResult<Frame>;
}

pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> HwResult<Classification>;
}
