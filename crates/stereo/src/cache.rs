//! Distortion map cache.
//!
//! Read-mostly: lookups share a read lock; builds take the write lock with a
//! second lookup so each map is built once per parameter set. Maps of a
//! previous parameter generation are evicted as soon as a new one is requested.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{DistortionKey, EyeParameters, EyeSide};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::DistortionMap;

#[derive(Debug, Default)]
struct CacheInner {
    /// Fingerprint of the parameters the cached maps belong to
    generation: Option<u64>,
    maps: HashMap<DistortionKey, Arc<DistortionMap>>,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub entries: usize,
}

/// Memoised distortion maps keyed by (parameters, eye)
#[derive(Debug, Default)]
pub struct DistortionCache {
    inner: RwLock<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl DistortionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map for one eye, built on first use
    pub fn map_for(&self, params: &EyeParameters, side: EyeSide) -> Arc<DistortionMap> {
        let key = params.distortion_key(side);
        let fingerprint = params.fingerprint();

        {
            let inner = self.inner.read();
            if inner.generation == Some(fingerprint) {
                if let Some(map) = inner.maps.get(&key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Arc::clone(map);
                }
            }
        }

        let mut inner = self.inner.write();

        if inner.generation != Some(fingerprint) {
            if !inner.maps.is_empty() {
                debug!(
                    old = ?inner.generation,
                    new = fingerprint,
                    evicted = inner.maps.len(),
                    "eye parameters changed, evicting distortion maps"
                );
                inner.maps.clear();
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
            inner.generation = Some(fingerprint);
        }

        // Another caller may have built it while we waited for the write lock
        if let Some(map) = inner.maps.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(map);
        }

        let started = Instant::now();
        let map = Arc::new(DistortionMap::build(params, side));
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        observability::record_distortion_build(side.as_str(), elapsed_ms);
        info!(
            side = side.as_str(),
            width = map.width,
            height = map.height,
            fingerprint = format_args!("{fingerprint:016x}"),
            elapsed_ms = elapsed_ms,
            "distortion map built"
        );

        self.misses.fetch_add(1, Ordering::Relaxed);
        inner.maps.insert(key, Arc::clone(&map));
        map
    }

    /// Drop every cached map
    pub fn invalidate(&self) {
        let mut inner = self.inner.write();
        inner.maps.clear();
        inner.generation = None;
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.inner.read().maps.len(),
        }
    }
}
