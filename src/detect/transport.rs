use crate::config::DetectorConfig;
use crate::error::DetectorError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable holding the labeling service token. Re-read on
/// every (re)connect so an auth-failure hook can rotate it at runtime.
pub const API_TOKEN_ENV: &str = "VISIONLINGO_API_TOKEN";

/// Ordered label response from the remote service. First-returned is
/// highest relevance per the service's own ranking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelResponse {
    #[serde(rename = "Labels", default)]
    pub labels: Vec<LabelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelEntry {
    #[serde(rename = "Name")]
    pub name: String,
    /// Confidence as a 0-100 percentage, the service's native unit
    #[serde(rename = "Confidence")]
    pub confidence: f32,
    #[serde(rename = "Instances", default)]
    pub instances: Vec<LabelInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelInstance {
    #[serde(rename = "BoundingBox")]
    pub bounding_box: Option<FractionalBox>,
}

/// Bounding box in fractional frame coordinates, as the service reports.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FractionalBox {
    #[serde(rename = "Left")]
    pub left: f32,
    #[serde(rename = "Top")]
    pub top: f32,
    #[serde(rename = "Width")]
    pub width: f32,
    #[serde(rename = "Height")]
    pub height: f32,
}

#[derive(Debug, Serialize)]
struct DetectLabelsRequest<'a> {
    image: &'a str,
    min_confidence: f32,
    max_labels: u32,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    #[serde(rename = "Arn")]
    arn: String,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
}

/// Transport seam between the detection client and the remote labeling
/// service. Tests substitute a scripted implementation.
#[async_trait]
pub trait LabelTransport: Send + Sync {
    /// Establish (or re-establish) a session, refreshing credentials.
    async fn connect(&self) -> Result<(), DetectorError>;

    /// Lightweight identity call used to verify connectivity.
    async fn caller_identity(&self) -> Result<String, DetectorError>;

    /// Submit one encoded frame for labeling.
    async fn detect_labels(
        &self,
        jpeg: &[u8],
        min_confidence_pct: f32,
        max_labels: u32,
    ) -> Result<LabelResponse, DetectorError>;
}

/// HTTP transport for the remote labeling endpoint.
pub struct HttpLabelTransport {
    http: reqwest::Client,
    endpoint: String,
    token: RwLock<Option<String>>,
}

impl HttpLabelTransport {
    pub fn new(config: &DetectorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn auth_token(&self) -> Result<String, DetectorError> {
        self.token
            .read()
            .clone()
            .ok_or(DetectorError::MissingCredentials)
    }

    async fn parse_error(response: reqwest::Response) -> DetectorError {
        let status = response.status();
        let body: ServiceErrorBody = response.json().await.unwrap_or_default();

        match body.error_type.as_str() {
            "ExpiredTokenException" | "TokenRefreshRequired" => DetectorError::ExpiredToken,
            "AccessDeniedException" | "UnauthorizedOperation" => DetectorError::PermissionDenied,
            "UnrecognizedClientException" | "InvalidSignatureException" => {
                DetectorError::MissingCredentials
            }
            _ if status == reqwest::StatusCode::UNAUTHORIZED => DetectorError::ExpiredToken,
            _ if status == reqwest::StatusCode::FORBIDDEN => DetectorError::PermissionDenied,
            _ => DetectorError::Transient {
                details: format!("HTTP {}: {}", status, body.message),
            },
        }
    }

    fn request_error(e: reqwest::Error) -> DetectorError {
        DetectorError::Transient {
            details: e.to_string(),
        }
    }
}

#[async_trait]
impl LabelTransport for HttpLabelTransport {
    async fn connect(&self) -> Result<(), DetectorError> {
        // Drop any cached token that might be expired, then re-read it
        // from the environment where the refresh hook deposits rotations.
        match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => {
                debug!("Labeling service credentials loaded from environment");
                *self.token.write() = Some(token);
                Ok(())
            }
            _ => {
                *self.token.write() = None;
                Err(DetectorError::MissingCredentials)
            }
        }
    }

    async fn caller_identity(&self) -> Result<String, DetectorError> {
        let token = self.auth_token()?;
        let response = self
            .http
            .get(format!("{}/caller-identity", self.endpoint))
            .bearer_auth(token)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let identity: IdentityResponse =
            response
                .json()
                .await
                .map_err(|e| DetectorError::Protocol {
                    details: format!("identity response: {}", e),
                })?;

        Ok(identity.arn)
    }

    async fn detect_labels(
        &self,
        jpeg: &[u8],
        min_confidence_pct: f32,
        max_labels: u32,
    ) -> Result<LabelResponse, DetectorError> {
        let token = self.auth_token()?;
        let encoded = BASE64.encode(jpeg);
        let request = DetectLabelsRequest {
            image: &encoded,
            min_confidence: min_confidence_pct,
            max_labels,
        };

        let response = self
            .http
            .post(format!("{}/detect-labels", self.endpoint))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            let err = Self::parse_error(response).await;
            warn!("Label request rejected: {}", err);
            return Err(err);
        }

        response
            .json::<LabelResponse>()
            .await
            .map_err(|e| DetectorError::Protocol {
                details: format!("label response: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_response_parses_service_shape() {
        let json = r#"{
            "Labels": [
                {
                    "Name": "Dog",
                    "Confidence": 95.2,
                    "Instances": [
                        {"BoundingBox": {"Left": 0.1, "Top": 0.2, "Width": 0.3, "Height": 0.4}}
                    ]
                },
                {"Name": "Animal", "Confidence": 91.0}
            ]
        }"#;

        let response: LabelResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.labels.len(), 2);
        assert_eq!(response.labels[0].name, "Dog");
        assert_eq!(response.labels[0].instances.len(), 1);
        let bbox = response.labels[0].instances[0].bounding_box.unwrap();
        assert!((bbox.left - 0.1).abs() < f32::EPSILON);
        assert!(response.labels[1].instances.is_empty());
    }

    #[test]
    fn empty_response_parses() {
        let response: LabelResponse = serde_json::from_str("{}").unwrap();
        assert!(response.labels.is_empty());
    }
}
