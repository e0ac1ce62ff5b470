//! Single-flight cache for the session CSRF token.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::errors::ApiError;

/// Cached CSRF token.
///
/// Concurrent callers that find the cache empty share one fetch: the first
/// caller takes the gate and fetches, the rest wait on the gate and then
/// read the cached value. An invalidation that lands while a fetch is in
/// flight bumps the generation, so the stale result is returned to its
/// caller but never cached.
#[derive(Debug, Default)]
pub struct CsrfCache {
    token: Mutex<Option<String>>,
    gate: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl CsrfCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Return the cached token, fetching it with `fetch` when absent.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let _gate = self.gate.lock().await;
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let token = fetch().await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        } else {
            tracing::debug!("CSRF cache invalidated during fetch; not caching result");
        }
        Ok(token)
    }
}
