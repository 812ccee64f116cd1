//! [`Persister`] implementations that plug stores into the auto-saver.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Serialize;

use offerte_autosave::{BoxError, Persister};

use crate::document::save_document_async;
use crate::remote::{Mutation, RemoteStore};

/// Saves every snapshot to a document file.
#[derive(Debug, Clone)]
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    /// Persist to the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Persister<T> for FilePersister
where
    T: Serialize + Send + 'static,
{
    fn persist(&self, data: T) -> impl Future<Output = Result<(), BoxError>> + Send {
        let path = self.path.clone();
        async move {
            save_document_async(data, path).await?;
            Ok(())
        }
    }
}

/// Saves every snapshot as one document in a [`RemoteStore`].
#[derive(Debug, Clone)]
pub struct RemotePersister<R> {
    remote: R,
    id: String,
}

impl<R> RemotePersister<R> {
    /// Persist to document `id` of `remote`.
    pub fn new(remote: R, id: impl Into<String>) -> Self {
        Self {
            remote,
            id: id.into(),
        }
    }
}

impl<T, R> Persister<T> for RemotePersister<R>
where
    T: Serialize + Send + 'static,
    R: RemoteStore,
{
    fn persist(&self, data: T) -> impl Future<Output = Result<(), BoxError>> + Send {
        let document = serde_json::to_value(&data);
        async move {
            let receipt = self
                .remote
                .mutate(Mutation::Put {
                    id: self.id.clone(),
                    document: document?,
                    expected_version: None,
                })
                .await?;
            tracing::debug!(id = %receipt.id, version = receipt.version, "Stored remote document");
            Ok(())
        }
    }
}
