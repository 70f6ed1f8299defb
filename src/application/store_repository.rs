// Repository trait for the persisted sensor document
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity type `{0}` not found")]
    UnknownEntityType(String),
    #[error("entity with id `{id}` not found in `{entity_type}`")]
    UnknownEntity { entity_type: String, id: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Access to the single JSON document that owns all entities. The core
/// never mutates state itself; it reads full snapshots through this
/// trait and the HTTP layer writes full replacements back.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// The stored document, verbatim. Implementations degrade to the
    /// empty document when nothing has been stored yet.
    async fn load(&self) -> Result<serde_json::Value, StoreError>;

    /// Replaces the whole document, last-writer-wins.
    async fn replace(&self, document: serde_json::Value) -> Result<(), StoreError>;

    /// Shallow-merges a partial object into one entity of one
    /// collection and returns the merged entity.
    async fn patch_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        partial: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError>;
}
