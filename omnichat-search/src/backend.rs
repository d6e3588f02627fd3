//! Trait definition for pluggable search backends.
//!
//! Every backend, whether a scraping target or a vendor API, implements
//! [`SearchBackend`] so the retry wrapper and the priority chain can treat
//! them uniformly.

use crate::error::SearchError;
use crate::types::{BackendKind, SearchResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A single external search provider.
///
/// Implementors perform exactly one external call per [`search`](Self::search)
/// and parse the response into [`SearchResult`] values:
///
/// - `Ok(vec![])` means the backend answered but found nothing.
/// - `Err(_)` means the backend is unavailable right now (network, parse,
///   rate limit, missing credential).
///
/// Backends never retry internally; that is [`crate::retry::with_retry`]'s job.
/// A backend whose credentials are absent must return
/// [`SearchError::MissingCredential`] without touching the network.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Human-readable backend name, used to tag results and in logs.
    fn name(&self) -> &str;

    /// Cost tier of this backend.
    fn kind(&self) -> BackendKind;

    /// Perform one search request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the response cannot be
    /// parsed, the backend is throttling, or a credential is missing.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// A backend registered in the chain.
#[derive(Clone)]
pub struct BackendDescriptor {
    /// Name copied from the backend at registration.
    pub name: String,
    /// Cost tier copied from the backend at registration.
    pub kind: BackendKind,
    /// The backend itself.
    pub invoker: Arc<dyn SearchBackend>,
}

impl BackendDescriptor {
    /// Register a backend.
    pub fn new(backend: impl SearchBackend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Register a backend that is shared elsewhere (e.g. a test double
    /// whose call counter the test inspects).
    pub fn from_arc(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            name: backend.name().to_owned(),
            kind: backend.kind(),
            invoker: backend,
        }
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
