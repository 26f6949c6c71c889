pub mod dispatcher;
pub mod image_client;

use crate::{
    config::Config,
    error::Result,
    models::{GenerationEntry, GenerationRequest},
    storage::{ImageStorage, LocalImageStorage, Materializer},
};
use std::sync::Arc;

pub use dispatcher::{Dispatcher, DEFAULT_OUTPUTS, MAX_OUTPUTS, MIN_OUTPUTS};
pub use image_client::{ImageClient, OutboundRequest};

/// Dispatch plus materialization behind one handle.
#[derive(Clone)]
pub struct StabilityClient {
    dispatcher: Dispatcher,
    materializer: Materializer,
}

impl StabilityClient {
    pub fn new(config: &Config) -> Result<Self> {
        let storage = LocalImageStorage::new(config.storage.clone());
        Self::with_storage(config, Arc::new(storage))
    }

    pub fn with_storage(config: &Config, storage: Arc<dyn ImageStorage>) -> Result<Self> {
        let image_client = ImageClient::new(&config.stability)?;
        log::debug!("Generation endpoint: {}", image_client.endpoint());

        if config.stability.api_key.is_none() {
            log::warn!(
                "⚠️  {} is not set; requests will be sent without authorization",
                crate::config::API_KEY_VAR
            );
        }

        Ok(Self {
            dispatcher: Dispatcher::new(image_client),
            materializer: Materializer::new(storage),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Generates `count` images and writes every success to disk.
    pub async fn generate_and_save(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> Result<Vec<GenerationEntry>> {
        log::info!("🎨 Generating {} image(s) with {}", count, request.model);
        let results = self.dispatcher.dispatch(request, count).await?;
        Ok(self.materializer.materialize(results).await)
    }
}
