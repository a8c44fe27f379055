//! quill-store: the storage collaborator behind a serialized worker.
//!
//! A [`Store`] handle is cheap to clone and fully async. Every request
//! travels over one mpsc channel to a single worker thread that owns
//! the backend, so operations on a store are FIFO: two concurrent saves
//! cannot interleave, and a read enqueued after a write observes that
//! write. Each operation resolves to its own `Result`; failures are
//! never silently dropped.

pub mod backend;
pub mod model;

pub use backend::{JsonFileBackend, MemoryBackend, StoreBackend};
pub use model::{Document, ExportBundle, Snapshot, EXPORT_VERSION};

use std::path::Path;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Storage failures, reported per-operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("store worker is gone")]
    WorkerGone,
}

type Responder<T> = oneshot::Sender<Result<T, StoreError>>;

enum Request {
    SaveDocument(Document, Responder<Document>),
    GetDocument(String, Responder<Option<Document>>),
    DeleteDocument(String, Responder<()>),
    ListDocuments(Responder<Vec<Document>>),
    SaveSnapshot(Snapshot, Responder<Snapshot>),
    GetSnapshot(String, Responder<Option<Snapshot>>),
    SnapshotsFor(String, Responder<Vec<Snapshot>>),
    DeleteSnapshot(String, Responder<()>),
    PruneSnapshots {
        document_id: String,
        max: usize,
        resp: Responder<usize>,
    },
    GetSetting(String, Responder<Option<serde_json::Value>>),
    SetSetting(String, serde_json::Value, Responder<()>),
    Export(Responder<ExportBundle>),
    Import(ExportBundle, Responder<()>),
}

/// Async handle to the serialized store worker.
#[derive(Clone)]
pub struct Store {
    tx: mpsc::UnboundedSender<Request>,
}

impl Store {
    /// Store over an in-memory backend.
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// Store over a JSON file. If the file cannot be opened or parsed,
    /// this degrades to the in-memory backend instead of failing the
    /// application — persistence is lost, the session is not.
    pub fn open(path: impl AsRef<Path>) -> Self {
        match JsonFileBackend::open(&path) {
            Ok(backend) => Self::with_backend(Box::new(backend)),
            Err(err) => {
                warn!(
                    path = %path.as_ref().display(),
                    %err,
                    "store init failed, degrading to in-memory backend"
                );
                Self::in_memory()
            }
        }
    }

    /// Spawn the worker thread that owns `backend` and serializes all
    /// access to it.
    pub fn with_backend(mut backend: Box<dyn StoreBackend>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
        thread::spawn(move || {
            while let Some(req) = rx.blocking_recv() {
                handle(&mut *backend, req);
            }
            debug!("store worker shutting down");
        });
        Self { tx }
    }

    fn send<T>(&self, build: impl FnOnce(Responder<T>) -> Request) -> StoreFuture<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let sent = self.tx.send(build(resp_tx)).is_ok();
        StoreFuture {
            rx: sent.then_some(resp_rx),
        }
    }

    pub fn save_document(&self, doc: Document) -> StoreFuture<Document> {
        self.send(|r| Request::SaveDocument(doc, r))
    }

    pub fn get_document(&self, id: &str) -> StoreFuture<Option<Document>> {
        self.send(|r| Request::GetDocument(id.to_string(), r))
    }

    pub fn delete_document(&self, id: &str) -> StoreFuture<()> {
        self.send(|r| Request::DeleteDocument(id.to_string(), r))
    }

    pub fn list_documents(&self) -> StoreFuture<Vec<Document>> {
        self.send(Request::ListDocuments)
    }

    pub fn save_snapshot(&self, snapshot: Snapshot) -> StoreFuture<Snapshot> {
        self.send(|r| Request::SaveSnapshot(snapshot, r))
    }

    pub fn get_snapshot(&self, id: &str) -> StoreFuture<Option<Snapshot>> {
        self.send(|r| Request::GetSnapshot(id.to_string(), r))
    }

    /// Snapshots for a document, oldest first.
    pub fn snapshots_for(&self, document_id: &str) -> StoreFuture<Vec<Snapshot>> {
        self.send(|r| Request::SnapshotsFor(document_id.to_string(), r))
    }

    pub fn delete_snapshot(&self, id: &str) -> StoreFuture<()> {
        self.send(|r| Request::DeleteSnapshot(id.to_string(), r))
    }

    /// Delete oldest snapshots beyond `max`. Returns how many were
    /// deleted.
    pub fn prune_snapshots(&self, document_id: &str, max: usize) -> StoreFuture<usize> {
        self.send(|resp| Request::PruneSnapshots {
            document_id: document_id.to_string(),
            max,
            resp,
        })
    }

    pub fn get_setting(&self, key: &str) -> StoreFuture<Option<serde_json::Value>> {
        self.send(|r| Request::GetSetting(key.to_string(), r))
    }

    pub fn set_setting(&self, key: &str, value: serde_json::Value) -> StoreFuture<()> {
        self.send(|r| Request::SetSetting(key.to_string(), value, r))
    }

    pub fn export(&self) -> StoreFuture<ExportBundle> {
        self.send(Request::Export)
    }

    pub fn import(&self, bundle: ExportBundle) -> StoreFuture<()> {
        self.send(|r| Request::Import(bundle, r))
    }
}

/// Future for one store operation. The request is enqueued when the
/// method is called, not when the future is first polled, so call
/// order is submission order. Resolves to `WorkerGone` if the worker
/// or its channel has died.
pub struct StoreFuture<T> {
    rx: Option<oneshot::Receiver<Result<T, StoreError>>>,
}

impl<T> std::future::Future for StoreFuture<T> {
    type Output = Result<T, StoreError>;

    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let this = self.get_mut();
        match this.rx.as_mut() {
            None => std::task::Poll::Ready(Err(StoreError::WorkerGone)),
            Some(rx) => match std::pin::Pin::new(rx).poll(cx) {
                std::task::Poll::Pending => std::task::Poll::Pending,
                std::task::Poll::Ready(Ok(result)) => std::task::Poll::Ready(result),
                std::task::Poll::Ready(Err(_)) => {
                    std::task::Poll::Ready(Err(StoreError::WorkerGone))
                }
            },
        }
    }
}

fn handle(backend: &mut dyn StoreBackend, req: Request) {
    // A dropped receiver means the caller gave up; nothing to do.
    match req {
        Request::SaveDocument(doc, resp) => {
            let _ = resp.send(backend.save_document(doc));
        }
        Request::GetDocument(id, resp) => {
            let _ = resp.send(backend.get_document(&id));
        }
        Request::DeleteDocument(id, resp) => {
            let _ = resp.send(backend.delete_document(&id));
        }
        Request::ListDocuments(resp) => {
            let _ = resp.send(backend.list_documents());
        }
        Request::SaveSnapshot(snapshot, resp) => {
            let _ = resp.send(backend.save_snapshot(snapshot));
        }
        Request::GetSnapshot(id, resp) => {
            let _ = resp.send(backend.get_snapshot(&id));
        }
        Request::SnapshotsFor(id, resp) => {
            let _ = resp.send(backend.snapshots_for(&id));
        }
        Request::DeleteSnapshot(id, resp) => {
            let _ = resp.send(backend.delete_snapshot(&id));
        }
        Request::PruneSnapshots {
            document_id,
            max,
            resp,
        } => {
            let _ = resp.send(prune(backend, &document_id, max));
        }
        Request::GetSetting(key, resp) => {
            let _ = resp.send(backend.get_setting(&key));
        }
        Request::SetSetting(key, value, resp) => {
            let _ = resp.send(backend.set_setting(&key, value));
        }
        Request::Export(resp) => {
            let _ = resp.send(backend.export());
        }
        Request::Import(bundle, resp) => {
            let _ = resp.send(backend.import(bundle));
        }
    }
}

fn prune(backend: &mut dyn StoreBackend, document_id: &str, max: usize) -> Result<usize, StoreError> {
    let snaps = backend.snapshots_for(document_id)?;
    if snaps.len() <= max {
        return Ok(0);
    }
    let excess = snaps.len() - max;
    // snapshots_for is oldest-first; strictly the oldest excess go.
    for snap in &snaps[..excess] {
        backend.delete_snapshot(&snap.id)?;
    }
    debug!(document_id, deleted = excess, "pruned snapshots");
    Ok(excess)
}
