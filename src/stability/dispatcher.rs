use std::sync::Arc;

use tokio::task::JoinError;

use crate::{
    error::{Result, StudioError},
    logger,
    models::{GenerationFailure, GenerationOutcome, GenerationRequest, GenerationResult, Mode},
    stability::image_client::{ImageClient, OutboundRequest},
};

pub const MIN_OUTPUTS: usize = 1;
pub const MAX_OUTPUTS: usize = 20;
pub const DEFAULT_OUTPUTS: usize = 4;

/// Fans one request out to N concurrent calls and gathers every result.
#[derive(Clone)]
pub struct Dispatcher {
    image_client: ImageClient,
}

impl Dispatcher {
    pub fn new(image_client: ImageClient) -> Self {
        Self { image_client }
    }

    pub fn validate_count(count: usize) -> Result<()> {
        if !(MIN_OUTPUTS..=MAX_OUTPUTS).contains(&count) {
            return Err(StudioError::ValidationError(format!(
                "Number of outputs must be between {} and {}, got {}",
                MIN_OUTPUTS, MAX_OUTPUTS, count
            )));
        }
        Ok(())
    }

    /// Sends `count` identical requests at once and waits for all of them.
    ///
    /// Validation happens before any network traffic. After that nothing is
    /// raised: each call's failure is recorded in its own result, in input order.
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> Result<Vec<GenerationResult>> {
        request.validate()?;
        Self::validate_count(count)?;

        if request.mode == Mode::ImageToImage && request.source_image.is_none() {
            log::warn!("⚠️  image-to-image requested without an image; sending without one");
        }

        let request = Arc::new(request.clone());
        let outbound = Arc::new(OutboundRequest::from_request(&request));
        log::debug!("Sending the following fields to the API: {:?}", outbound.field_names());

        let _timer = logger::timer(&format!("{} x {} generation", count, request.model));

        let handles: Vec<_> = (0..count)
            .map(|_| {
                let client = self.image_client.clone();
                let outbound = Arc::clone(&outbound);
                tokio::spawn(async move { client.generate_once(&outbound).await })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let results: Vec<GenerationResult> = joined
            .into_iter()
            .enumerate()
            .map(|(index, joined)| GenerationResult {
                index,
                request: Arc::clone(&request),
                outcome: joined_outcome(index, joined),
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        if succeeded == results.len() {
            log::info!("✅ {} of {} generations succeeded", succeeded, results.len());
        } else {
            log::warn!("⚠️  {} of {} generations succeeded", succeeded, results.len());
        }

        Ok(results)
    }
}

/// A task that panicked or was cancelled never produced a response.
fn joined_outcome(
    index: usize,
    joined: std::result::Result<GenerationOutcome, JoinError>,
) -> GenerationOutcome {
    joined.unwrap_or_else(|e| {
        log::error!("❌ Generation #{} produced no response: {}", index, e);
        GenerationOutcome::Failure(GenerationFailure::NoResponse)
    })
}
