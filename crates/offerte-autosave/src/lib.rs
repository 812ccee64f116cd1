//! Debounced auto-save for offerte, project and invoice editors.
//!
//! The editor reports its data after every change; this crate decides when
//! to call the persister, makes sure only one save is ever in flight, and
//! publishes a coherent `{ is_saving, is_dirty, last_saved, error }` view for
//! the "Opgeslagen" / "Niet opgeslagen" indicators.
//!
//! # Features
//!
//! - **Value-based change detection** via SHA-256 of canonical JSON
//! - **Debounce** with an optional max-delay cap
//! - **Single in-flight save**; later changes are saved right after it
//! - **Manual save** that resolves with the outcome
//! - **Teardown safety**: late results never touch a disposed session
//!
//! # Example
//!
//! ```ignore
//! use offerte_autosave::{AutoSave, AutoSaveConfig, persist_fn};
//!
//! let autosave = AutoSave::spawn(quote.clone(), persist_fn(move |quote| {
//!     let api = api.clone();
//!     async move { api.save_quote(quote).await }
//! }), AutoSaveConfig::default())?;
//!
//! autosave.update(edited_quote)?;
//! autosave.save_now().await?; // e.g. before closing the dialog
//! ```
//!
//! # Architecture
//!
//! - `reconciler.rs` - I/O-free state machine (the source of truth)
//! - `driver.rs` - tokio task that runs timers and persists for it
//! - `snapshot.rs` - snapshots and fingerprints
//! - `status.rs` - consumer-facing projection
//! - `config.rs`, `persist.rs`, `error.rs`

mod config;
mod driver;
mod error;
mod persist;
mod reconciler;
mod snapshot;
mod status;

// Re-export main types
pub use config::AutoSaveConfig;
pub use driver::AutoSave;
pub use error::{AutoSaveError, BoxError, Result, SaveFailure};
pub use persist::{FnPersister, Persister, persist_fn};
pub use reconciler::{AttemptId, Effect, Reconciler, TimerToken, WaiterId};
pub use snapshot::{Fingerprint, Snapshot};
pub use status::{SaveState, SaveStatus};
