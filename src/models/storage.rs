use std::path::PathBuf;

use crate::models::{generation::SdModel, result::GenerationFailure};

#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub seed: Option<u64>,
    /// An earlier image already sat at `image_path` and was replaced.
    pub overwrote: bool,
}

impl SavedImage {
    pub fn file_name(&self) -> Option<String> {
        self.image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Saved(SavedImage),
    Failed(GenerationFailure),
    /// The image arrived but could not be written to disk.
    StorageFailed(String),
}

/// A dispatched result after materialization. Only what the gallery shows
/// is kept, so uploaded source images are not held past the request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationEntry {
    pub index: usize,
    pub prompt: String,
    pub model: SdModel,
    pub outcome: EntryOutcome,
}

impl GenerationEntry {
    pub fn saved(&self) -> Option<&SavedImage> {
        match &self.outcome {
            EntryOutcome::Saved(saved) => Some(saved),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            EntryOutcome::Saved(_) => None,
            EntryOutcome::Failed(failure) => Some(format!(
                "Failed to generate with {}: {}",
                self.model, failure
            )),
            EntryOutcome::StorageFailed(reason) => {
                Some(format!("Failed to save image: {}", reason))
            }
        }
    }
}
