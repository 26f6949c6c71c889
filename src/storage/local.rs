use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::{
    config::StorageConfig,
    error::{Result, StudioError},
    models::{GeneratedImage, GenerationRequest, SavedImage},
    storage::traits::ImageStorage,
};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Flat-file storage keyed by model and second-granularity timestamp.
///
/// Two images for the same model saved within the same second share a path,
/// and the later write wins.
#[derive(Clone)]
pub struct LocalImageStorage {
    output_dir: PathBuf,
    clock: Clock,
}

impl LocalImageStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            output_dir: config.output_dir,
            clock: Arc::new(Local::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// `{dir}/{model_prefix}_output_{timestamp}.{format}` and the same path with `.json` appended.
    pub fn output_paths(&self, request: &GenerationRequest, timestamp: &str) -> (PathBuf, PathBuf) {
        let image_path = self.output_dir.join(format!(
            "{}_output_{}.{}",
            request.model.file_prefix(),
            timestamp,
            request.output_format.extension()
        ));

        let mut metadata_path = image_path.clone().into_os_string();
        metadata_path.push(".json");

        (image_path, PathBuf::from(metadata_path))
    }
}

/// The fields that were sent for `request`, plus the seed the server used.
pub fn build_metadata(request: &GenerationRequest, image: &GeneratedImage) -> Value {
    let mut metadata = Map::new();

    for field in request.form_fields() {
        let value = match (&field.file_name, field.as_text()) {
            (Some(file_name), _) => file_name.clone(),
            (None, Some(text)) => text.to_string(),
            (None, None) => String::from_utf8_lossy(&field.data).into_owned(),
        };
        metadata.insert(field.name, Value::String(value));
    }

    metadata.insert(
        "seed".to_string(),
        image.seed.map(Value::from).unwrap_or(Value::Null),
    );
    if let Some(reason) = &image.finish_reason {
        metadata.insert("finish_reason".to_string(), Value::String(reason.clone()));
    }

    Value::Object(metadata)
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                StudioError::StorageError(format!(
                    "Failed to create output folder {}: {}",
                    self.output_dir.display(),
                    e
                ))
            })
    }

    async fn save(
        &self,
        request: &GenerationRequest,
        image: &GeneratedImage,
    ) -> Result<SavedImage> {
        let timestamp = (self.clock)().format(TIMESTAMP_FORMAT).to_string().to_lowercase();
        let (image_path, metadata_path) = self.output_paths(request, &timestamp);

        let overwrote = tokio::fs::try_exists(&image_path).await.unwrap_or(false);
        if overwrote {
            log::warn!(
                "⚠️  {} already exists and will be overwritten (saved within the same second)",
                image_path.display()
            );
        }

        tokio::fs::write(&image_path, &image.data)
            .await
            .map_err(|e| {
                StudioError::StorageError(format!("{}: {}", image_path.display(), e))
            })?;

        let metadata = serde_json::to_vec_pretty(&build_metadata(request, image))?;
        tokio::fs::write(&metadata_path, metadata)
            .await
            .map_err(|e| {
                StudioError::StorageError(format!("{}: {}", metadata_path.display(), e))
            })?;

        log::info!("💾 Image saved to: {}", image_path.display());

        Ok(SavedImage {
            image_path,
            metadata_path,
            seed: image.seed,
            overwrote,
        })
    }

    fn root(&self) -> &Path {
        &self.output_dir
    }
}
