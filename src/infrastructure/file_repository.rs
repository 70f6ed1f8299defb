// File-backed document store with rotating backups
//
// The whole state lives in one JSON document that is read and replaced
// as a unit, last-writer-wins. A short-lived read cache fronts the file;
// every write refreshes it.
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::application::store_repository::{StoreError, StoreRepository};
use crate::infrastructure::config::StoreSettings;

struct CachedDocument {
    document: Value,
    read_at: Instant,
}

pub struct FileRepository {
    data_file: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedDocument>>,
}

fn empty_document() -> Value {
    json!({
        "sensors": [],
        "rooms": [],
        "assets": [],
        "categories": [],
        "favorites": []
    })
}

/// Fills in any of the five top-level collections a stored file may be
/// missing, so consumers always see the full shape.
fn with_default_collections(mut document: Value) -> Value {
    let Some(object) = document.as_object_mut() else {
        return empty_document();
    };
    for key in ["sensors", "rooms", "assets", "categories", "favorites"] {
        object.entry(key).or_insert_with(|| json!([]));
    }
    document
}

fn entity_id_matches(entity: &Value, entity_id: &str) -> bool {
    match entity.get("id") {
        Some(Value::Number(n)) => n.to_string() == entity_id,
        Some(Value::String(s)) => s == entity_id,
        _ => false,
    }
}

impl FileRepository {
    pub fn new(settings: &StoreSettings) -> Self {
        Self {
            data_file: settings.data_file.clone(),
            backup_dir: settings.backup_dir.clone(),
            max_backups: settings.max_backups,
            cache_ttl: Duration::from_secs(settings.cache_ttl_seconds),
            cache: RwLock::new(None),
        }
    }

    /// Reads the document from disk. A missing or unparsable file
    /// degrades to the empty document so one bad write can never take
    /// the dashboard down.
    async fn read_from_disk(&self) -> Value {
        match tokio::fs::read_to_string(&self.data_file).await {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(document) => with_default_collections(document),
                Err(error) => {
                    tracing::error!("stored document is not valid JSON: {error}");
                    empty_document()
                }
            },
            Err(error) => {
                tracing::warn!(
                    "could not read {}: {error}",
                    self.data_file.display()
                );
                empty_document()
            }
        }
    }

    async fn load_fresh(&self) -> Value {
        let document = self.read_from_disk().await;
        let mut cache = self.cache.write().await;
        *cache = Some(CachedDocument {
            document: document.clone(),
            read_at: Instant::now(),
        });
        document
    }

    /// Copies the current file aside and prunes old backups down to the
    /// configured bound, newest kept.
    async fn backup_current(&self) -> Result<(), StoreError> {
        if tokio::fs::try_exists(&self.data_file).await? {
            tokio::fs::create_dir_all(&self.backup_dir).await?;
            let stem = self
                .data_file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("store");
            // fixed-width so the names sort chronologically
            let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();
            let backup_file = self
                .backup_dir
                .join(format!("{stem}.{timestamp}.backup"));
            tokio::fs::copy(&self.data_file, &backup_file).await?;
            self.prune_backups(stem).await?;
        }
        Ok(())
    }

    async fn prune_backups(&self, stem: &str) -> Result<(), StoreError> {
        let mut backups = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.backup_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(stem) && name.ends_with(".backup") {
                backups.push(entry.path());
            }
        }
        // the RFC3339 timestamp in the name sorts chronologically
        backups.sort();
        while backups.len() > self.max_backups {
            let oldest = backups.remove(0);
            tracing::debug!("pruning backup {}", oldest.display());
            tokio::fs::remove_file(oldest).await?;
        }
        Ok(())
    }

    async fn write_document(&self, document: Value) -> Result<(), StoreError> {
        self.backup_current().await?;
        if let Some(parent) = self.data_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pretty = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&self.data_file, pretty).await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedDocument {
            document,
            read_at: Instant::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl StoreRepository for FileRepository {
    async fn load(&self) -> Result<Value, StoreError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.read_at.elapsed() < self.cache_ttl {
                    return Ok(cached.document.clone());
                }
            }
        }
        Ok(self.load_fresh().await)
    }

    async fn replace(&self, document: Value) -> Result<(), StoreError> {
        self.write_document(document).await
    }

    async fn patch_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
        partial: Value,
    ) -> Result<Value, StoreError> {
        let Value::Object(partial) = partial else {
            return Err(StoreError::InvalidDocument(
                "patch body must be a JSON object".to_string(),
            ));
        };

        // bypass the cache so the merge sees the latest write
        let mut document = self.read_from_disk().await;
        let collection = document
            .get_mut(entity_type)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| StoreError::UnknownEntityType(entity_type.to_string()))?;
        let entity = collection
            .iter_mut()
            .find(|entity| entity_id_matches(entity, entity_id))
            .ok_or_else(|| StoreError::UnknownEntity {
                entity_type: entity_type.to_string(),
                id: entity_id.to_string(),
            })?;

        let Some(fields) = entity.as_object_mut() else {
            return Err(StoreError::InvalidDocument(format!(
                "entity {entity_id} in `{entity_type}` is not an object"
            )));
        };
        for (key, value) in partial {
            fields.insert(key, value);
        }
        let merged = entity.clone();

        self.write_document(document).await?;
        Ok(merged)
    }
}
