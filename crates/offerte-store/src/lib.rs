//! Storage for offerte editors.
//!
//! # Features
//!
//! - **Document files** with a format marker and schema version
//! - **Atomic writes** (write to temp, then rename)
//! - **Scoped key/value state** for UI flags, owned by whoever creates it
//! - **Remote store capability** (`subscribe` + `mutate`) with an in-memory
//!   implementation
//! - **Persisters** that plug both into [`offerte_autosave::AutoSave`]
//!
//! # Example
//!
//! ```ignore
//! use offerte_autosave::{AutoSave, AutoSaveConfig};
//! use offerte_store::FilePersister;
//!
//! let autosave = AutoSave::spawn(
//!     quote,
//!     FilePersister::new("offerte-2024-017.json"),
//!     AutoSaveConfig::default(),
//! )?;
//! ```

mod document;
mod error;
mod io;
mod persister;
mod remote;
mod scoped;

pub use document::{
    CURRENT_SCHEMA_VERSION, DOCUMENT_FORMAT, DocumentFile, load_document, load_document_async,
    load_document_optional, save_document, save_document_async,
};
pub use error::{Result, StoreError};
pub use persister::{FilePersister, RemotePersister};
pub use remote::{
    MemoryRemote, Mutation, MutationReceipt, Query, QueryResult, RemoteStore, StoredDocument,
};
pub use scoped::{ScopedStore, StoreChange};
