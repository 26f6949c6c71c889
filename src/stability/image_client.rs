use crate::{
    config::StabilityConfig,
    error::{Result, StudioError},
    models::{GenerationFailure, GenerationOutcome, GenerationRequest, ImageEnvelope},
    multipart::FormField,
};
use reqwest::{
    header,
    multipart::{Form, Part},
    Body, Client,
};

/// The fields of one generation call. A multipart form is built from them
/// for every send, so one request can be sent any number of times.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    fields: Vec<FormField>,
}

impl OutboundRequest {
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            fields: request.form_fields(),
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    pub fn to_form(&self) -> reqwest::Result<Form> {
        let mut form = Form::new();
        for field in &self.fields {
            let mut part = Part::stream(Body::from(field.data.clone()));
            if let Some(file_name) = &field.file_name {
                part = part.file_name(file_name.clone());
            }
            if let Some(content_type) = &field.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part(field.name.clone(), part);
        }
        Ok(form)
    }
}

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ImageClient {
    pub fn new(config: &StabilityConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StudioError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Performs one generation call. Every error ends up in the returned outcome.
    pub async fn generate_once(&self, request: &OutboundRequest) -> GenerationOutcome {
        let form = match request.to_form() {
            Ok(form) => form,
            Err(e) => {
                log::error!("❌ Failed to build request body: {}", e);
                return GenerationOutcome::Failure(GenerationFailure::Transport(e.to_string()));
            }
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .multipart(form);

        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("❌ Failed to make request: {}", e);
                return GenerationOutcome::Failure(GenerationFailure::Transport(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Generation failed: {} - {}", status.as_u16(), body);
            return GenerationOutcome::Failure(GenerationFailure::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return GenerationOutcome::Failure(GenerationFailure::Transport(e.to_string()))
            }
        };

        let envelope: ImageEnvelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::error!("❌ Could not parse generation response: {}", e);
                return GenerationOutcome::Failure(GenerationFailure::MalformedResponse(
                    e.to_string(),
                ));
            }
        };

        match envelope.into_image() {
            Ok(image) => {
                log::debug!(
                    "Received {} bytes, seed {:?}",
                    image.data.len(),
                    image.seed
                );
                GenerationOutcome::Success(image)
            }
            Err(failure) => GenerationOutcome::Failure(failure),
        }
    }
}
