use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates of the frame it was
/// computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Midpoint of the rectangle.
    pub fn center(&self) -> (u32, u32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Centered box with the given half-extent, clamped to the frame.
    pub fn centered(cx: u32, cy: u32, half: u32, frame_w: u32, frame_h: u32) -> Self {
        Self {
            x1: cx.saturating_sub(half),
            y1: cy.saturating_sub(half),
            x2: (cx + half).min(frame_w),
            y2: (cy + half).min(frame_h),
        }
    }
}

/// One recognized object/region in a single frame.
///
/// Created fresh every frame and superseded wholly on the next; there is
/// no object continuity across frames. `class_index` is the label's
/// ordinal in the service response, not a stable identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub center: (u32, u32),
    pub confidence: f32,
    pub class_index: usize,
    pub label: String,
}

/// A detection enriched for the UI: display names plus confidence, the
/// shape returned by the detections snapshot endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDetection {
    pub en: String,
    pub cn: String,
    pub confidence: f32,
}
