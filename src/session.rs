use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{GenerationEntry, SdModel};

/// One press of "Generate": the entries it produced, in dispatch order.
#[derive(Debug, Clone)]
pub struct GenerationBatch {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model: SdModel,
    pub entries: Vec<GenerationEntry>,
}

impl GenerationBatch {
    pub fn new(model: SdModel, entries: Vec<GenerationEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            model,
            entries,
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(GenerationEntry::error_message)
            .collect()
    }
}

/// Results accumulated across UI interactions.
#[derive(Debug, Default)]
pub struct GenerationSession {
    batches: RwLock<Vec<GenerationBatch>>,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, batch: GenerationBatch) {
        self.batches.write().await.push(batch);
    }

    /// Batches, newest first.
    pub async fn batches(&self) -> Vec<GenerationBatch> {
        self.batches.read().await.iter().rev().cloned().collect()
    }

    pub async fn clear(&self) {
        self.batches.write().await.clear();
    }
}
