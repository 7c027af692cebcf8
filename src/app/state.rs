use crate::detect::DisplayDetection;
use crate::selection::SelectionState;
use parking_lot::RwLock;

/// Shared state between the frame pipeline and the HTTP surface.
///
/// The pipeline replaces the detection snapshot wholesale each frame;
/// the selection is written by API handlers and read by the renderer.
#[derive(Default)]
pub struct VisionState {
    pub selection: SelectionState,
    detections: RwLock<Vec<DisplayDetection>>,
}

impl VisionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the detection snapshot for the current frame.
    pub fn set_detections(&self, detections: Vec<DisplayDetection>) {
        *self.detections.write() = detections;
    }

    /// Clone of the current detection snapshot.
    pub fn detections(&self) -> Vec<DisplayDetection> {
        self.detections.read().clone()
    }

    /// Length of the current snapshot, for bounds checks.
    pub fn detection_count(&self) -> usize {
        self.detections.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_replaced_wholesale() {
        let state = VisionState::new();
        assert!(state.detections().is_empty());

        state.set_detections(vec![DisplayDetection {
            en: "Dog".to_string(),
            cn: "狗".to_string(),
            confidence: 0.9,
        }]);
        assert_eq!(state.detection_count(), 1);

        state.set_detections(Vec::new());
        assert!(state.detections().is_empty());
    }
}
