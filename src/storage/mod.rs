pub mod local;
pub mod traits;

use crate::models::{EntryOutcome, GenerationEntry, GenerationOutcome, GenerationResult};
use std::sync::Arc;

pub use local::{build_metadata, Clock, LocalImageStorage};
pub use traits::ImageStorage;

/// Turns dispatched results into files on disk.
#[derive(Clone)]
pub struct Materializer {
    storage: Arc<dyn ImageStorage>,
}

impl Materializer {
    pub fn new(storage: Arc<dyn ImageStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn ImageStorage> {
        &self.storage
    }

    /// Saves every successful result. Failures pass through untouched and a
    /// failed write only affects its own entry. If the output folder cannot be
    /// created, every success is reported as a storage failure instead.
    pub async fn materialize(&self, results: Vec<GenerationResult>) -> Vec<GenerationEntry> {
        let unavailable = match self.storage.prepare().await {
            Ok(()) => None,
            Err(e) => {
                log::error!("❌ Output folder unavailable: {}", e);
                Some(e.to_string())
            }
        };

        let mut entries = Vec::with_capacity(results.len());
        for result in results {
            let outcome = match &result.outcome {
                GenerationOutcome::Success(image) => {
                    if image.is_filtered() {
                        log::warn!(
                            "⚠️  Generation #{} was flagged CONTENT_FILTERED by the server",
                            result.index
                        );
                    }
                    match &unavailable {
                        Some(reason) => EntryOutcome::StorageFailed(reason.clone()),
                        None => match self.storage.save(&result.request, image).await {
                            Ok(saved) => EntryOutcome::Saved(saved),
                            Err(e) => {
                                log::error!("❌ Failed to save generation #{}: {}", result.index, e);
                                EntryOutcome::StorageFailed(e.to_string())
                            }
                        },
                    }
                }
                GenerationOutcome::Failure(failure) => EntryOutcome::Failed(failure.clone()),
            };

            entries.push(GenerationEntry {
                index: result.index,
                prompt: result.request.prompt.clone(),
                model: result.request.model,
                outcome,
            });
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::StorageConfig,
        error::{Result, StudioError},
        models::{GeneratedImage, GenerationFailure, GenerationRequest, SavedImage, SourceImage},
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::{Path, PathBuf};

    struct RejectingStorage;

    #[async_trait]
    impl ImageStorage for RejectingStorage {
        async fn prepare(&self) -> Result<()> {
            Ok(())
        }

        async fn save(&self, _: &GenerationRequest, _: &GeneratedImage) -> Result<SavedImage> {
            Err(StudioError::StorageError("disk full".into()))
        }

        fn root(&self) -> &Path {
            Path::new("/nowhere")
        }
    }

    fn results() -> Vec<GenerationResult> {
        results_for(Arc::new(GenerationRequest::new("fox")))
    }

    fn results_for(request: Arc<GenerationRequest>) -> Vec<GenerationResult> {
        vec![
            GenerationResult {
                index: 0,
                request: request.clone(),
                outcome: GenerationOutcome::Success(GeneratedImage {
                    data: Bytes::from_static(b"img"),
                    seed: Some(5),
                    finish_reason: None,
                }),
            },
            GenerationResult {
                index: 1,
                request,
                outcome: GenerationOutcome::Failure(GenerationFailure::Http {
                    status: 500,
                    body: "boom".into(),
                }),
            },
        ]
    }

    #[tokio::test]
    async fn test_materialize_saves_successes_and_keeps_failures() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(StorageConfig::new().with_output_dir(dir.path()));
        let materializer = Materializer::new(Arc::new(storage));

        let entries = materializer.materialize(results()).await;

        assert_eq!(entries.len(), 2);
        let saved = entries[0].saved().unwrap();
        assert!(saved.image_path.starts_with(dir.path()));
        assert!(saved.metadata_path.exists());
        assert_eq!(saved.seed, Some(5));
        assert_eq!(
            entries[1].error_message().as_deref(),
            Some("Failed to generate with sd3: 500 - boom")
        );
    }

    #[tokio::test]
    async fn test_write_failure_stays_on_its_entry() {
        let materializer = Materializer::new(Arc::new(RejectingStorage));

        let entries = materializer.materialize(results()).await;

        assert!(matches!(entries[0].outcome, EntryOutcome::StorageFailed(_)));
        assert!(matches!(entries[1].outcome, EntryOutcome::Failed(_)));
        assert_eq!(materializer.storage().root(), PathBuf::from("/nowhere"));
    }

    #[tokio::test]
    async fn test_unusable_output_folder_keeps_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("outputs");
        std::fs::write(&blocked, b"not a folder").unwrap();
        let storage = LocalImageStorage::new(StorageConfig::new().with_output_dir(&blocked));
        let materializer = Materializer::new(Arc::new(storage));

        let entries = materializer.materialize(results()).await;

        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].outcome, EntryOutcome::StorageFailed(_)));
        assert!(entries[0]
            .error_message()
            .unwrap()
            .starts_with("Failed to save image: Storage error: Failed to create output folder"));
        assert_eq!(
            entries[1].outcome,
            EntryOutcome::Failed(GenerationFailure::Http {
                status: 500,
                body: "boom".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_entries_do_not_hold_the_uploaded_image() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalImageStorage::new(StorageConfig::new().with_output_dir(dir.path()));
        let materializer = Materializer::new(Arc::new(storage));

        let request = Arc::new(GenerationRequest::image_to_image(
            "fox",
            SourceImage::new("fox.png", vec![0u8; 4096]),
            0.5,
        ));
        let entries = materializer.materialize(results_for(Arc::clone(&request))).await;

        assert_eq!(Arc::strong_count(&request), 1);
        assert_eq!(entries[0].prompt, "fox");
        assert_eq!(entries[0].model, request.model);
    }
}
