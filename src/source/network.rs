//! Network camera device reading an MJPEG-over-HTTP stream.

use super::device::CaptureDevice;
use crate::error::CameraError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use image::RgbImage;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// Drop the buffer if a frame boundary never shows up, rather than
/// growing without bound on a garbage stream.
const MAX_BUFFER: usize = 8 * 1024 * 1024;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Capture device backed by a phone/IP camera MJPEG stream.
pub struct HttpMjpegDevice {
    stream: ByteStream,
    buf: BytesMut,
    url: String,
    open: bool,
}

impl HttpMjpegDevice {
    /// Connect to the stream URL. Fails when the endpoint is unreachable
    /// or answers with a non-success status.
    pub async fn open(http: &reqwest::Client, url: &str) -> Result<Self, CameraError> {
        // No per-request timeout: the response body is an unbounded
        // stream. The factory's client bounds the connect phase.
        let response = http
            .get(url)
            .send()
            .await
            .map_err(|e| CameraError::NetworkUnreachable {
                url: url.to_string(),
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CameraError::NetworkUnreachable {
                url: url.to_string(),
                details: format!("HTTP {}", response.status()),
            });
        }

        debug!("Connected to network camera stream at {}", url);

        Ok(Self {
            stream: Box::pin(response.bytes_stream()),
            buf: BytesMut::new(),
            url: url.to_string(),
            open: true,
        })
    }
}

#[async_trait]
impl CaptureDevice for HttpMjpegDevice {
    async fn read(&mut self) -> Result<RgbImage, CameraError> {
        if !self.open {
            return Err(CameraError::Disconnected);
        }

        loop {
            if let Some(jpeg) = extract_jpeg(&mut self.buf) {
                match crate::frame::decode_image(&jpeg) {
                    Ok(frame) => return Ok(frame),
                    Err(e) => {
                        // Corrupt part; skip it and wait for the next one
                        warn!("Dropping undecodable stream frame from {}: {}", self.url, e);
                        continue;
                    }
                }
            }

            if self.buf.len() > MAX_BUFFER {
                warn!("No frame boundary in {} buffered bytes; resetting", self.buf.len());
                self.buf.clear();
            }

            match tokio::time::timeout(READ_TIMEOUT, self.stream.next()).await {
                Ok(Some(Ok(chunk))) => {
                    self.buf.extend_from_slice(&chunk);
                }
                Ok(Some(Err(e))) => {
                    self.open = false;
                    return Err(CameraError::ReadFailed {
                        details: format!("stream error: {}", e),
                    });
                }
                Ok(None) => {
                    self.open = false;
                    return Err(CameraError::Disconnected);
                }
                Err(_) => {
                    return Err(CameraError::ReadFailed {
                        details: format!("no data from {} within {:?}", self.url, READ_TIMEOUT),
                    });
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("network stream {}", self.url)
    }
}

/// Pull the next complete JPEG out of the buffer, discarding any bytes
/// (multipart boundaries, part headers) preceding the start marker.
fn extract_jpeg(buf: &mut BytesMut) -> Option<Bytes> {
    let start = find(buf, &JPEG_SOI)?;
    let end = find(&buf[start + 2..], &JPEG_EOI)? + start + 2;

    let _ = buf.split_to(start);
    let frame = buf.split_to(end - start + 2);
    Some(frame.freeze())
}

fn find(haystack: &[u8], needle: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == needle)
}
