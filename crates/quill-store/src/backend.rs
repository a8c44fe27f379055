//! Storage backends: a plain in-memory map and a JSON-file store.
//!
//! Backends are synchronous; serialization of concurrent access happens
//! one level up, in the worker that owns the backend (see `lib.rs`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::model::{Document, ExportBundle, Snapshot, EXPORT_VERSION};
use crate::StoreError;

/// Backend contract. Every operation reports failure per-operation; a
/// backend never silently drops data.
pub trait StoreBackend: Send {
    fn save_document(&mut self, doc: Document) -> Result<Document, StoreError>;
    fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;
    fn delete_document(&mut self, id: &str) -> Result<(), StoreError>;
    fn list_documents(&self) -> Result<Vec<Document>, StoreError>;

    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<Snapshot, StoreError>;
    fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, StoreError>;
    /// Snapshots for one document, oldest first by `created_at`
    /// (ties keep insertion order).
    fn snapshots_for(&self, document_id: &str) -> Result<Vec<Snapshot>, StoreError>;
    fn delete_snapshot(&mut self, id: &str) -> Result<(), StoreError>;

    fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
    fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    fn export(&self) -> Result<ExportBundle, StoreError>;
    /// Replace store contents with the bundle's.
    fn import(&mut self, bundle: ExportBundle) -> Result<(), StoreError>;
}

/// In-memory backend. Also the degraded path when a file store cannot
/// be initialized.
#[derive(Default)]
pub struct MemoryBackend {
    documents: Vec<Document>,
    snapshots: Vec<Snapshot>,
    settings: BTreeMap<String, serde_json::Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn save_document(&mut self, doc: Document) -> Result<Document, StoreError> {
        match self.documents.iter_mut().find(|d| d.id == doc.id) {
            Some(slot) => *slot = doc.clone(),
            None => self.documents.push(doc.clone()),
        }
        Ok(doc)
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.iter().find(|d| d.id == id).cloned())
    }

    fn delete_document(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        if self.documents.len() == before {
            return Err(StoreError::NotFound {
                what: "document",
                id: id.to_string(),
            });
        }
        self.snapshots.retain(|s| s.document_id != id);
        Ok(())
    }

    fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.documents.clone())
    }

    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<Snapshot, StoreError> {
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.iter().find(|s| s.id == id).cloned())
    }

    fn snapshots_for(&self, document_id: &str) -> Result<Vec<Snapshot>, StoreError> {
        let mut snaps: Vec<Snapshot> = self
            .snapshots
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        snaps.sort_by_key(|s| s.created_at);
        Ok(snaps)
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        if self.snapshots.len() == before {
            return Err(StoreError::NotFound {
                what: "snapshot",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.settings.insert(key.to_string(), value);
        Ok(())
    }

    fn export(&self) -> Result<ExportBundle, StoreError> {
        Ok(ExportBundle {
            version: EXPORT_VERSION,
            export_date: Some(Utc::now()),
            documents: self.documents.clone(),
            snapshots: self.snapshots.clone(),
            settings: self.settings.clone(),
        })
    }

    fn import(&mut self, bundle: ExportBundle) -> Result<(), StoreError> {
        self.documents = bundle.documents;
        self.snapshots = bundle.snapshots;
        self.settings = bundle.settings;
        Ok(())
    }
}

/// JSON-file backend: the full store as one JSON document, rewritten on
/// every mutation. Documents here are small; simplicity wins over
/// incremental writes.
pub struct JsonFileBackend {
    path: PathBuf,
    inner: MemoryBackend,
}

impl JsonFileBackend {
    /// Open or create the store file. Errors here are what the caller
    /// degrades on (falling back to [`MemoryBackend`]).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut inner = MemoryBackend::new();
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if !raw.trim().is_empty() {
                let bundle: ExportBundle = serde_json::from_str(&raw)?;
                inner.import(bundle)?;
            }
            debug!(path = %path.display(), "opened existing store file");
        } else if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path, inner })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let bundle = self.inner.export()?;
        let json = serde_json::to_string_pretty(&bundle)?;
        // Write-then-rename so a crash mid-write cannot truncate the store.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StoreBackend for JsonFileBackend {
    fn save_document(&mut self, doc: Document) -> Result<Document, StoreError> {
        let doc = self.inner.save_document(doc)?;
        self.persist()?;
        Ok(doc)
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(id)
    }

    fn delete_document(&mut self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_document(id)?;
        self.persist()
    }

    fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        self.inner.list_documents()
    }

    fn save_snapshot(&mut self, snapshot: Snapshot) -> Result<Snapshot, StoreError> {
        let snapshot = self.inner.save_snapshot(snapshot)?;
        self.persist()?;
        Ok(snapshot)
    }

    fn get_snapshot(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.inner.get_snapshot(id)
    }

    fn snapshots_for(&self, document_id: &str) -> Result<Vec<Snapshot>, StoreError> {
        self.inner.snapshots_for(document_id)
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_snapshot(id)?;
        self.persist()
    }

    fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_setting(key)
    }

    fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.inner.set_setting(key, value)?;
        self.persist()
    }

    fn export(&self) -> Result<ExportBundle, StoreError> {
        self.inner.export()
    }

    fn import(&mut self, bundle: ExportBundle) -> Result<(), StoreError> {
        self.inner.import(bundle)?;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_document_upsert() {
        let mut backend = MemoryBackend::new();
        let mut doc = Document::new("title", "v1");
        backend.save_document(doc.clone()).unwrap();

        doc.content = "v2".to_string();
        backend.save_document(doc.clone()).unwrap();

        assert_eq!(backend.list_documents().unwrap().len(), 1);
        assert_eq!(
            backend.get_document(&doc.id).unwrap().unwrap().content,
            "v2"
        );
    }

    #[test]
    fn test_memory_delete_document_drops_snapshots() {
        let mut backend = MemoryBackend::new();
        let doc = Document::new("t", "c");
        backend.save_document(doc.clone()).unwrap();
        backend
            .save_snapshot(Snapshot::new(&doc.id, "c", false))
            .unwrap();

        backend.delete_document(&doc.id).unwrap();
        assert!(backend.snapshots_for(&doc.id).unwrap().is_empty());
    }

    #[test]
    fn test_memory_delete_missing_is_error() {
        let mut backend = MemoryBackend::new();
        assert!(matches!(
            backend.delete_document("nope"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_snapshots_sorted_oldest_first() {
        let mut backend = MemoryBackend::new();
        let mut newer = Snapshot::new("doc", "b", false);
        newer.created_at = Utc::now() + chrono::Duration::seconds(10);
        let older = Snapshot::new("doc", "a", false);
        backend.save_snapshot(newer.clone()).unwrap();
        backend.save_snapshot(older.clone()).unwrap();

        let snaps = backend.snapshots_for("doc").unwrap();
        assert_eq!(snaps[0].id, older.id);
        assert_eq!(snaps[1].id, newer.id);
    }

    #[test]
    fn test_file_backend_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let doc = Document::new("persisted", "body");
        {
            let mut backend = JsonFileBackend::open(&path).unwrap();
            backend.save_document(doc.clone()).unwrap();
            backend
                .set_setting("theme", serde_json::json!("dark"))
                .unwrap();
        }

        let backend = JsonFileBackend::open(&path).unwrap();
        assert_eq!(backend.get_document(&doc.id).unwrap().unwrap().title, "persisted");
        assert_eq!(
            backend.get_setting("theme").unwrap(),
            Some(serde_json::json!("dark"))
        );
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut backend = MemoryBackend::new();
        backend.save_document(Document::new("a", "1")).unwrap();
        backend
            .save_snapshot(Snapshot::new("x", "s", false))
            .unwrap();
        let bundle = backend.export().unwrap();
        assert_eq!(bundle.version, EXPORT_VERSION);

        let mut other = MemoryBackend::new();
        other.import(bundle).unwrap();
        assert_eq!(other.list_documents().unwrap().len(), 1);
        assert_eq!(other.snapshots_for("x").unwrap().len(), 1);
    }
}
