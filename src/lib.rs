pub mod app;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod labels;
pub mod overlay;
pub mod pipeline;
pub mod selection;
pub mod server;
pub mod source;

pub use app::{App, VisionState};
pub use config::VisionConfig;
pub use detect::{BoundingBox, Detection, DetectionClient, DisplayDetection};
pub use error::{Result, VisionError};
pub use frame::EncodedFrame;
pub use pipeline::{FramePipeline, LatestFrame};
pub use selection::SelectionState;
pub use server::AppServer;
pub use source::{SourceKind, SourceManager};
