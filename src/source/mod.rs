//! Camera source management: local devices, network streams, and
//! static photos, with exclusive ownership of the active source.

mod device;
mod factory;
#[cfg(all(target_os = "linux", feature = "local-camera"))]
mod gst;
mod manager;
pub mod mock;
mod network;
mod pattern;

pub use device::{CaptureDevice, DeviceFactory};
pub use factory::DefaultDeviceFactory;
pub use manager::{SourceKind, SourceManager};
pub use network::HttpMjpegDevice;
pub use pattern::TestPatternDevice;
