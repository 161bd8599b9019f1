//! Memoized callables
//!
//! A [`Memoized`] function keeps its results in a bounded LRU table. Cached
//! results are ordinary [`Value`]s, so a cached file handle keeps its
//! payload alive exactly as long as the entry stays in the table. Dropping
//! the table (eviction, [`Memoized::cache_clear`], or dropping the function
//! itself) releases the claims it held.

use crate::context::ExecutionContext;
use crate::error::KernelError;
use crate::function::Callable;
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hashable form of a call's arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<KeyPart>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    None,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl CacheKey {
    /// Build a key from scalar arguments
    ///
    /// # Errors
    /// `Unhashable` if any argument is a file, list, composite or function.
    pub fn from_args(args: &[Value]) -> Result<Self, KernelError> {
        args.iter()
            .map(|arg| match arg {
                Value::None => Ok(KeyPart::None),
                Value::Bool(b) => Ok(KeyPart::Bool(*b)),
                Value::Int(i) => Ok(KeyPart::Int(*i)),
                Value::Text(s) => Ok(KeyPart::Text(s.clone())),
                other => Err(KernelError::Unhashable(other.kind())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// Zero means unbounded
    pub capacity: usize,
}

/// LRU-memoized wrapper around another callable
pub struct Memoized {
    inner: Arc<dyn Callable>,
    capacity: usize,
    cache: Mutex<IndexMap<CacheKey, Value>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Memoized {
    /// Memoize `inner`, keeping at most `capacity` results (0 for unbounded)
    pub fn new(inner: impl Callable + 'static, capacity: usize) -> Self {
        Self::wrap(Arc::new(inner), capacity)
    }

    /// Memoize an already shared callable
    #[must_use]
    pub fn wrap(inner: Arc<dyn Callable>, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            cache: Mutex::new(IndexMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Current statistics
    #[must_use]
    pub fn cache_info(&self) -> CacheInfo {
        CacheInfo {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.capacity,
        }
    }

    /// Drop every cached result
    pub fn cache_clear(&self) {
        let cleared = std::mem::take(&mut *self.cache.lock());
        tracing::debug!(function = %self.inner.name(), entries = cleared.len(), "memo cache cleared");
        drop(cleared);
    }

    fn lookup(&self, key: &CacheKey) -> Option<Value> {
        let mut cache = self.cache.lock();
        // re-insert to mark as most recently used
        let value = cache.shift_remove(key)?;
        cache.insert(key.clone(), value.clone());
        Some(value)
    }
}

impl Callable for Memoized {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn call(&self, ctx: &ExecutionContext, args: &[Value]) -> Result<Value, KernelError> {
        let key = CacheKey::from_args(args)?;
        if let Some(hit) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // not holding the table lock: the body may call back into us
        let value = self.inner.call(ctx, args)?;

        let evicted = {
            let mut cache = self.cache.lock();
            cache.insert(key, value.clone());
            if self.capacity > 0 && cache.len() > self.capacity {
                cache.shift_remove_index(0)
            } else {
                None
            }
        };
        if let Some((_, old)) = evicted {
            tracing::trace!(function = %self.inner.name(), kind = old.kind(), "memo entry evicted");
        }
        Ok(value)
    }

    fn retained(&self) -> Vec<Value> {
        self.cache.lock().values().cloned().collect()
    }
}

impl fmt::Debug for Memoized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.inner.name())
            .field("info", &self.cache_info())
            .finish()
    }
}
