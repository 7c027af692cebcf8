use crate::frame::EncodedFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

/// Single-slot holder for the most recent encoded frame.
///
/// The pipeline overwrites the slot every iteration; stream clients
/// only ever read the newest frame, so no history is kept.
#[derive(Default)]
pub struct LatestFrame {
    slot: RwLock<Option<EncodedFrame>>,
    stats: LatestFrameStats,
}

#[derive(Debug, Default)]
pub struct LatestFrameStats {
    pub frames_published: AtomicU64,
    pub frames_retrieved: AtomicU64,
}

impl LatestFrameStats {
    pub fn snapshot(&self) -> LatestFrameStatsSnapshot {
        LatestFrameStatsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_retrieved: self.frames_retrieved.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatestFrameStatsSnapshot {
    pub frames_published: u64,
    pub frames_retrieved: u64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot with a newer frame.
    pub async fn publish(&self, frame: EncodedFrame) {
        trace!("Publishing frame {} ({} bytes)", frame.id, frame.jpeg.len());
        *self.slot.write().await = Some(frame);
        self.stats.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Current frame, if any has been published yet. Cheap to clone,
    /// the JPEG payload is shared.
    pub async fn current(&self) -> Option<EncodedFrame> {
        let frame = self.slot.read().await.clone();
        if frame.is_some() {
            self.stats.frames_retrieved.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    pub fn stats(&self) -> LatestFrameStatsSnapshot {
        self.stats.snapshot()
    }
}
