//! quill-history: snapshot versioning on top of the store.
//!
//! A [`HistoryManager`] creates snapshots of document content (encrypted
//! when the vault allows it), keeps the history capped by pruning the
//! oldest entries, restores a snapshot back into its document, and runs
//! the auto-snapshot timer. Snapshot creation never fails just because
//! encryption does: a failed encrypt falls back to plaintext and logs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use quill_crypto::{Vault, VaultError};
use quill_store::{Document, Snapshot, Store, StoreError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default number of snapshots kept per document.
pub const DEFAULT_SNAPSHOT_CAP: usize = 50;

/// Default auto-snapshot interval.
pub const DEFAULT_AUTO_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Maximum snapshots retained per document; oldest pruned beyond it.
    pub cap: usize,
    /// Period of the auto-snapshot timer.
    pub interval: std::time::Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            cap: DEFAULT_SNAPSHOT_CAP,
            interval: DEFAULT_AUTO_INTERVAL,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),
}

struct Inner {
    store: Store,
    vault: Arc<Mutex<Vault>>,
    config: SnapshotConfig,
    /// Auto-snapshot tasks by document id. Policy is single-active:
    /// starting a timer stops whichever one was running, so switching
    /// between documents never leaves a stale timer snapshotting the
    /// previous one.
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct HistoryManager {
    inner: Arc<Inner>,
}

impl HistoryManager {
    pub fn new(store: Store, vault: Arc<Mutex<Vault>>, config: SnapshotConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                vault,
                config,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Snapshot `content` for a document and prune history to the cap.
    ///
    /// When `encrypt` is set the content is sealed with the vault's
    /// session key. If that fails (vault locked, or the cipher errors)
    /// the snapshot is stored as plaintext with `encrypted = false` and
    /// a warning is logged; losing a version is worse than storing it
    /// in the clear.
    pub async fn create_snapshot(
        &self,
        document_id: &str,
        content: &str,
        encrypt: bool,
    ) -> Result<Snapshot, HistoryError> {
        let (payload, encrypted) = if encrypt {
            match self.inner.vault.lock().await.encrypt(content) {
                Ok(ciphertext) => (ciphertext, true),
                Err(err) => {
                    warn!(document_id, %err, "snapshot encryption failed, storing plaintext");
                    (content.to_string(), false)
                }
            }
        } else {
            (content.to_string(), false)
        };

        let snapshot = Snapshot::new(document_id, payload, encrypted);
        let saved = self.inner.store.save_snapshot(snapshot).await?;
        let pruned = self
            .inner
            .store
            .prune_snapshots(document_id, self.inner.config.cap)
            .await?;
        if pruned > 0 {
            debug!(document_id, pruned, "snapshot history pruned to cap");
        }
        Ok(saved)
    }

    /// Restore a snapshot's content into its document.
    ///
    /// The snapshot's own `encrypted` flag decides whether its content
    /// gets decrypted first (with `passphrase` or the unlocked vault);
    /// the *document's* `encrypted` flag decides whether the restored
    /// text is re-encrypted before being written back. The two flags
    /// are independent: restoring a plaintext snapshot into an
    /// encrypted document stores ciphertext.
    pub async fn restore_snapshot(
        &self,
        document_id: &str,
        snapshot_id: &str,
        passphrase: Option<&str>,
    ) -> Result<Document, HistoryError> {
        let snapshot = self
            .inner
            .store
            .get_snapshot(snapshot_id)
            .await?
            .filter(|s| s.document_id == document_id)
            .ok_or_else(|| HistoryError::SnapshotNotFound(snapshot_id.to_string()))?;

        let plaintext = if snapshot.encrypted {
            self.inner
                .vault
                .lock()
                .await
                .decrypt(&snapshot.content, passphrase)?
        } else {
            snapshot.content
        };

        let mut doc = self
            .inner
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| HistoryError::DocumentNotFound(document_id.to_string()))?;

        doc.content = if doc.encrypted {
            let vault = self.inner.vault.lock().await;
            match passphrase {
                Some(pass) if !vault.is_unlocked() => quill_crypto::encrypt_with(&plaintext, pass)?,
                _ => vault.encrypt(&plaintext)?,
            }
        } else {
            plaintext
        };
        doc.updated_at = Utc::now();

        let saved = self.inner.store.save_document(doc).await?;
        info!(document_id, snapshot_id, "snapshot restored");
        Ok(saved)
    }

    /// Snapshots of a document, oldest first.
    pub async fn list_snapshots(&self, document_id: &str) -> Result<Vec<Snapshot>, HistoryError> {
        Ok(self.inner.store.snapshots_for(document_id).await?)
    }

    /// Start the auto-snapshot timer for a document. `source` is polled
    /// at each tick for the current content; `encrypt` is forwarded to
    /// [`create_snapshot`](Self::create_snapshot). Any previously
    /// running timer is stopped first.
    pub async fn start_auto<F>(&self, document_id: &str, encrypt: bool, source: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.stop_all().await;

        let manager = self.clone();
        let id = document_id.to_string();
        let period = self.inner.config.interval;
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            // The first interval tick fires immediately; skip it so the
            // first snapshot happens one full period after start.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let content = source();
                if let Err(err) = manager.create_snapshot(&task_id, &content, encrypt).await {
                    warn!(document_id = %task_id, %err, "auto-snapshot failed");
                }
            }
        });

        debug!(document_id, "auto-snapshot timer started");
        self.inner.timers.lock().await.insert(id, handle);
    }

    /// Stop the auto-snapshot timer for one document, if running.
    pub async fn stop_auto(&self, document_id: &str) {
        if let Some(handle) = self.inner.timers.lock().await.remove(document_id) {
            handle.abort();
            debug!(document_id, "auto-snapshot timer stopped");
        }
    }

    /// Stop every auto-snapshot timer.
    pub async fn stop_all(&self) {
        let mut timers = self.inner.timers.lock().await;
        for (document_id, handle) in timers.drain() {
            handle.abort();
            debug!(document_id = %document_id, "auto-snapshot timer stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PASS: &str = "correct horse";

    fn manager_with(cap: usize, interval: Duration) -> (HistoryManager, Store, Arc<Mutex<Vault>>) {
        let store = Store::in_memory();
        let vault = Arc::new(Mutex::new(Vault::new()));
        let manager = HistoryManager::new(store.clone(), vault.clone(), SnapshotConfig { cap, interval });
        (manager, store, vault)
    }

    #[tokio::test]
    async fn test_cap_prunes_exactly_the_oldest() {
        let (manager, store, _) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        for i in 0..55 {
            manager
                .create_snapshot("doc", &format!("rev {i}"), false)
                .await
                .unwrap();
        }
        let snaps = store.snapshots_for("doc").await.unwrap();
        assert_eq!(snaps.len(), 50);
        assert_eq!(snaps.first().unwrap().content, "rev 5");
        assert_eq!(snaps.last().unwrap().content, "rev 54");
    }

    #[tokio::test]
    async fn test_locked_vault_falls_back_to_plaintext() {
        let (manager, _, _) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        let snap = manager.create_snapshot("doc", "secret", true).await.unwrap();
        assert!(!snap.encrypted);
        assert_eq!(snap.content, "secret");
    }

    #[tokio::test]
    async fn test_encrypted_snapshot_when_unlocked() {
        let (manager, _, vault) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        vault.lock().await.unlock(PASS).unwrap();
        let snap = manager.create_snapshot("doc", "secret", true).await.unwrap();
        assert!(snap.encrypted);
        assert!(quill_crypto::looks_encrypted(&snap.content));
        assert_eq!(
            quill_crypto::decrypt_with(&snap.content, PASS).unwrap(),
            "secret"
        );
    }

    #[tokio::test]
    async fn test_restore_plaintext_snapshot_into_encrypted_document() {
        let (manager, store, vault) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        let mut doc = Document::new("notes", "current ciphertext stand-in");
        doc.encrypted = true;
        let doc = store.save_document(doc).await.unwrap();

        let mut snap = Snapshot::new(&doc.id, "older plaintext revision", false);
        snap.created_at = Utc::now();
        let snap = store.save_snapshot(snap).await.unwrap();

        vault.lock().await.unlock(PASS).unwrap();
        let restored = manager
            .restore_snapshot(&doc.id, &snap.id, None)
            .await
            .unwrap();

        assert!(restored.encrypted);
        assert!(quill_crypto::looks_encrypted(&restored.content));
        assert_eq!(
            quill_crypto::decrypt_with(&restored.content, PASS).unwrap(),
            "older plaintext revision"
        );
    }

    #[tokio::test]
    async fn test_restore_encrypted_snapshot_into_plaintext_document() {
        let (manager, store, _) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        let doc = store.save_document(Document::new("notes", "current")).await.unwrap();

        let ciphertext = quill_crypto::encrypt_with("sealed revision", PASS).unwrap();
        let snap = store
            .save_snapshot(Snapshot::new(&doc.id, ciphertext, true))
            .await
            .unwrap();

        let restored = manager
            .restore_snapshot(&doc.id, &snap.id, Some(PASS))
            .await
            .unwrap();
        assert!(!restored.encrypted);
        assert_eq!(restored.content, "sealed revision");
    }

    #[tokio::test]
    async fn test_restore_encrypted_snapshot_without_key_errors() {
        let (manager, store, _) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        let doc = store.save_document(Document::new("notes", "current")).await.unwrap();
        let ciphertext = quill_crypto::encrypt_with("sealed", PASS).unwrap();
        let snap = store
            .save_snapshot(Snapshot::new(&doc.id, ciphertext, true))
            .await
            .unwrap();

        let err = manager.restore_snapshot(&doc.id, &snap.id, None).await;
        assert!(matches!(err, Err(HistoryError::Vault(_))));
        // Document untouched.
        let doc = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(doc.content, "current");
    }

    #[tokio::test]
    async fn test_restore_missing_snapshot() {
        let (manager, store, _) = manager_with(50, DEFAULT_AUTO_INTERVAL);
        let doc = store.save_document(Document::new("notes", "c")).await.unwrap();
        let err = manager.restore_snapshot(&doc.id, "nope", None).await;
        assert!(matches!(err, Err(HistoryError::SnapshotNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_snapshot_fires_and_stops() {
        let (manager, store, _) = manager_with(50, Duration::from_secs(60));
        manager
            .start_auto("doc", false, || "tick content".to_string())
            .await;

        // Nothing fires before the first full period.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.snapshots_for("doc").await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        let fired = store.snapshots_for("doc").await.unwrap().len();
        assert!(fired >= 1);

        // After stop the count is frozen no matter how far time goes.
        manager.stop_auto("doc").await;
        let frozen = store.snapshots_for("doc").await.unwrap().len();
        tokio::time::sleep(Duration::from_secs(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.snapshots_for("doc").await.unwrap().len(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_documents_stops_the_previous_timer() {
        let (manager, store, _) = manager_with(50, Duration::from_secs(60));
        manager.start_auto("a", false, || "a content".to_string()).await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(!store.snapshots_for("a").await.unwrap().is_empty());

        // Switching to document b stops a's timer; a's count freezes.
        manager.start_auto("b", false, || "b content".to_string()).await;
        let frozen = store.snapshots_for("a").await.unwrap().len();
        tokio::time::sleep(Duration::from_secs(200)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.snapshots_for("a").await.unwrap().len(), frozen);
        assert!(!store.snapshots_for("b").await.unwrap().is_empty());
    }
}
