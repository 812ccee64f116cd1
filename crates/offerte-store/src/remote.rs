//! Remote data capability.
//!
//! The backend is modelled as two operations: a reactive `subscribe` that
//! keeps a query result up to date, and an async `mutate`. Nothing in the
//! editors depends on the transport behind them.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{Result, StoreError};

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// A single document.
    Document { id: String },
    /// Every document whose id starts with `prefix`.
    Collection { prefix: String },
}

impl Query {
    /// Watch one document.
    pub fn document(id: impl Into<String>) -> Self {
        Self::Document { id: id.into() }
    }

    /// Watch all documents under a prefix (e.g. `"offerte/"`).
    pub fn collection(prefix: impl Into<String>) -> Self {
        Self::Collection {
            prefix: prefix.into(),
        }
    }

    fn matches(&self, id: &str) -> bool {
        match self {
            Self::Document { id: wanted } => wanted == id,
            Self::Collection { prefix } => id.starts_with(prefix.as_str()),
        }
    }
}

/// A committed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    /// Increases by one on every committed write.
    pub version: u64,
    pub document: Value,
    pub updated_at: DateTime<Utc>,
}

/// Current result of a subscription, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<StoredDocument>,
}

impl QueryResult {
    /// The first (or only) document.
    pub fn first(&self) -> Option<&StoredDocument> {
        self.documents.first()
    }
}

/// A write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Create or replace a document. With `expected_version`, the write only
    /// succeeds if the stored version still matches.
    Put {
        id: String,
        document: Value,
        expected_version: Option<u64>,
    },
    /// Remove a document.
    Delete { id: String },
}

impl Mutation {
    fn id(&self) -> &str {
        match self {
            Self::Put { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// Confirmation of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    pub id: String,
    /// Version after the write; `0` for deletes.
    pub version: u64,
}

/// Backend capability consumed by editors and persisters.
pub trait RemoteStore: Send + Sync + 'static {
    /// Follow the result of `query`. The receiver holds the current result
    /// immediately and changes after every committed mutation it covers.
    fn subscribe(&self, query: Query) -> watch::Receiver<QueryResult>;

    /// Apply a write.
    fn mutate(&self, mutation: Mutation) -> impl Future<Output = Result<MutationReceipt>> + Send;
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, StoredDocument>,
    subscriptions: Vec<(Query, watch::Sender<QueryResult>)>,
    failures: Vec<String>,
    mutations: usize,
}

impl State {
    fn result_for(&self, query: &Query) -> QueryResult {
        QueryResult {
            documents: self
                .documents
                .values()
                .filter(|doc| query.matches(&doc.id))
                .cloned()
                .collect(),
        }
    }

    fn notify(&mut self, id: &str) {
        self.subscriptions.retain(|(_, sender)| !sender.is_closed());
        for (query, sender) in &self.subscriptions {
            if query.matches(id) {
                sender.send_replace(self.result_for(query));
            }
        }
    }
}

/// In-process [`RemoteStore`] for tests, demos and offline use.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<State>>,
    latency: Duration,
}

impl MemoryRemote {
    /// An empty store without latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every mutation by `latency` before it commits.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject the next mutation with `reason`. Calls queue up.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.lock().failures.push(reason.into());
    }

    /// Read a document directly.
    pub fn get(&self, id: &str) -> Option<StoredDocument> {
        self.lock().documents.get(id).cloned()
    }

    /// Number of mutation attempts received, rejected ones included.
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, mutation: Mutation) -> Result<MutationReceipt> {
        let mut state = self.lock();
        if !state.failures.is_empty() {
            let reason = state.failures.remove(0);
            tracing::debug!(id = mutation.id(), %reason, "Rejected remote mutation");
            return Err(StoreError::Rejected { reason });
        }

        let receipt = match mutation {
            Mutation::Put {
                id,
                document,
                expected_version,
            } => {
                let current = state.documents.get(&id).map_or(0, |doc| doc.version);
                if let Some(expected) = expected_version
                    && expected != current
                {
                    return Err(StoreError::Conflict {
                        id,
                        expected,
                        actual: current,
                    });
                }
                let stored = StoredDocument {
                    id: id.clone(),
                    version: current + 1,
                    document,
                    updated_at: Utc::now(),
                };
                state.documents.insert(id.clone(), stored);
                MutationReceipt {
                    id,
                    version: current + 1,
                }
            }
            Mutation::Delete { id } => {
                if state.documents.remove(&id).is_none() {
                    return Err(StoreError::NotFound { id });
                }
                MutationReceipt { id, version: 0 }
            }
        };

        state.notify(&receipt.id);
        Ok(receipt)
    }
}

impl RemoteStore for MemoryRemote {
    fn subscribe(&self, query: Query) -> watch::Receiver<QueryResult> {
        let mut state = self.lock();
        let (sender, receiver) = watch::channel(state.result_for(&query));
        state.subscriptions.push((query, sender));
        receiver
    }

    fn mutate(&self, mutation: Mutation) -> impl Future<Output = Result<MutationReceipt>> + Send {
        self.lock().mutations += 1;
        let store = self.clone();
        async move {
            if !store.latency.is_zero() {
                tokio::time::sleep(store.latency).await;
            }
            store.commit(mutation)
        }
    }
}

impl std::fmt::Debug for MemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryRemote")
            .field("documents", &state.documents.len())
            .field("subscriptions", &state.subscriptions.len())
            .field("latency", &self.latency)
            .finish()
    }
}
