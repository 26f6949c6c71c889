use crate::{
    error::Result,
    models::{GeneratedImage, GenerationRequest, SavedImage},
};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Creates the output location. Safe to call repeatedly.
    async fn prepare(&self) -> Result<()>;

    /// Writes the image and its JSON sidecar.
    async fn save(&self, request: &GenerationRequest, image: &GeneratedImage)
        -> Result<SavedImage>;

    fn root(&self) -> &Path;
}
