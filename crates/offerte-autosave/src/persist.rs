//! The persist callback contract.

use std::future::Future;

use crate::error::BoxError;

/// Durably stores one value of the auto-saved data.
///
/// The auto-saver treats a persister as a black box: `Ok` confirms the data
/// is stored, any `Err` is captured verbatim and shown to the user. At most
/// one call is in flight per auto-saver at any time.
pub trait Persister<T>: Send + Sync + 'static {
    /// Store `data`.
    fn persist(&self, data: T) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// A [`Persister`] backed by an async closure. See [`persist_fn`].
#[derive(Debug, Clone)]
pub struct FnPersister<F>(F);

/// Wrap an async closure as a [`Persister`].
///
/// ```ignore
/// let persister = persist_fn(|quote: Quote| async move {
///     api.update_quote(&quote).await
/// });
/// ```
pub fn persist_fn<F>(f: F) -> FnPersister<F> {
    FnPersister(f)
}

impl<T, F, Fut, E> Persister<T> for FnPersister<F>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError>,
{
    fn persist(&self, data: T) -> impl Future<Output = Result<(), BoxError>> + Send {
        let pending = (self.0)(data);
        async move { pending.await.map_err(Into::into) }
    }
}
