mod client;
pub mod mock;
mod transport;
mod types;

pub use client::{AuthFailureHook, DetectionClient};
pub use transport::{
    FractionalBox, HttpLabelTransport, LabelEntry, LabelInstance, LabelResponse, LabelTransport,
    API_TOKEN_ENV,
};
pub use types::{BoundingBox, Detection, DisplayDetection};
