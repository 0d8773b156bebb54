use super::Runtime;
use crate::Result;
use crate::container::Container;
use std::collections::HashMap;
use std::sync::Mutex;

/// Caches successful runs by [`Container::cache_key`].
///
/// Two containers with identical images, environment, secret names and steps
/// share one result. Callers that need a fresh run must make the container
/// differ, e.g. with a unique environment variable. Failures are not cached.
pub struct Memoized<R> {
    inner: R,
    results: Mutex<HashMap<String, String>>,
}

impl<R: Runtime> Memoized<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            results: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Runtime> Runtime for Memoized<R> {
    fn stdout(&self, container: &Container) -> Result<String> {
        let key = container.cache_key();

        if let Ok(results) = self.results.lock() {
            if let Some(cached) = results.get(&key) {
                tracing::debug!(runtime = self.inner.name(), "reusing cached container result");
                return Ok(cached.clone());
            }
        }

        let output = self.inner.stdout(container)?;
        if let Ok(mut results) = self.results.lock() {
            results.insert(key, output.clone());
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
