use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::models::generation::GenerationRequest;

/// JSON body returned by the generation endpoint when asked for `application/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEnvelope {
    pub image: Option<String>, // Base64 encoded
    pub seed: Option<u64>,
    pub finish_reason: Option<String>,
}

impl ImageEnvelope {
    pub fn into_image(self) -> Result<GeneratedImage, GenerationFailure> {
        let encoded = self
            .image
            .filter(|image| !image.is_empty())
            .ok_or_else(|| GenerationFailure::MalformedResponse("no image in response".into()))?;

        let data = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
            GenerationFailure::MalformedResponse(format!("invalid base64 image: {}", e))
        })?;

        Ok(GeneratedImage {
            data: Bytes::from(data),
            seed: self.seed,
            finish_reason: self.finish_reason,
        })
    }
}

#[derive(Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Bytes,
    pub seed: Option<u64>,
    pub finish_reason: Option<String>,
}

impl GeneratedImage {
    pub fn is_filtered(&self) -> bool {
        self.finish_reason.as_deref() == Some("CONTENT_FILTERED")
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("len", &self.data.len())
            .field("seed", &self.seed)
            .field("finish_reason", &self.finish_reason)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    /// Non-2xx response, status and body kept verbatim.
    Http { status: u16, body: String },
    /// Timeout, DNS, connection reset and friends.
    Transport(String),
    /// 2xx response whose envelope could not be turned into an image.
    MalformedResponse(String),
    /// The request task ended without producing a response.
    NoResponse,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::Http { status, body } => write!(f, "{} - {}", status, body),
            GenerationFailure::Transport(reason) => write!(f, "Failed to make request: {}", reason),
            GenerationFailure::MalformedResponse(reason) => {
                write!(f, "Malformed response: {}", reason)
            }
            GenerationFailure::NoResponse => write!(f, "No response received"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(GeneratedImage),
    Failure(GenerationFailure),
}

/// Terminal result of one of the N dispatched calls.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub index: usize,
    pub request: Arc<GenerationRequest>,
    pub outcome: GenerationOutcome,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, GenerationOutcome::Success(_))
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match &self.outcome {
            GenerationOutcome::Success(image) => Some(image),
            GenerationOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        match &self.outcome {
            GenerationOutcome::Success(_) => None,
            GenerationOutcome::Failure(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decodes_image() {
        let envelope: ImageEnvelope = serde_json::from_str(
            r#"{"image":"iVBORw0KGgo=","seed":1234,"finish_reason":"SUCCESS"}"#,
        )
        .unwrap();

        let image = envelope.into_image().unwrap();
        assert_eq!(&image.data[..], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(image.seed, Some(1234));
        assert!(!image.is_filtered());
    }

    #[test]
    fn test_envelope_without_image_is_malformed() {
        let envelope: ImageEnvelope =
            serde_json::from_str(r#"{"seed":1,"finish_reason":"CONTENT_FILTERED"}"#).unwrap();
        assert!(matches!(
            envelope.into_image(),
            Err(GenerationFailure::MalformedResponse(_))
        ));

        let envelope = ImageEnvelope {
            image: Some("not base64!!".into()),
            seed: None,
            finish_reason: None,
        };
        assert!(matches!(
            envelope.into_image(),
            Err(GenerationFailure::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_failure_messages() {
        let http = GenerationFailure::Http {
            status: 401,
            body: "{\"name\":\"unauthorized\"}".into(),
        };
        assert_eq!(http.to_string(), "401 - {\"name\":\"unauthorized\"}");
        assert_eq!(GenerationFailure::NoResponse.to_string(), "No response received");
    }
}
