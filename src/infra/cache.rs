// ============================================================
// Layer 6 — Result Cache
// ============================================================
// Memoises prediction responses for a short TTL, keyed by a
// fingerprint of the request:
//
//   fingerprint = SHA-256 hex of (method, path, exact body bytes)
//
// Two bodies that differ only in key order or whitespace get
// different fingerprints and are cached separately.
//
// The ResultCache trait is the seam to the cache backend. Every
// call is individually atomic; lookup-then-store is not, so two
// concurrent identical misses may both run the model and both
// store.
//
// MemoryCache is the in-process backend: a DashMap of entries
// with an expiry instant. Expired entries are removed only when a
// lookup finds them.
//
// The backend address comes from the `redis_url` environment
// variable (default redis://localhost:6379). A networked backend
// implements ResultCache against that address and reports outages
// as PredictorError::CacheUnavailable. MemoryCache never fails.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;

pub const REDIS_URL_VAR:     &str = "redis_url";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_PREFIX:    &str = "api-cache";
pub const DEFAULT_TTL_SECS:  u64  = 60;

// ─── ResultCache ──────────────────────────────────────────────────────────────
/// Fingerprint → serialized response store with per-entry expiry.
///
/// A backend that cannot be reached returns
/// `PredictorError::CacheUnavailable`; callers serve without the cache.
pub trait ResultCache: Send + Sync {
    /// The live value for `fingerprint`, if any
    fn lookup(&self, fingerprint: &str) -> Result<Option<String>>;

    /// Insert or replace; the entry stops being returned after `ttl`
    fn store(&self, fingerprint: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Deterministic request fingerprint. Fields are length-prefixed so
/// that ("a", "bc") and ("ab", "c") hash differently.
pub fn fingerprint(method: &str, path: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for part in [method.as_bytes(), path.as_bytes(), body] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}

// ─── CacheConfig ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub url:      String,
    pub prefix:   String,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url:      DEFAULT_REDIS_URL.to_string(),
            prefix:   DEFAULT_PREFIX.to_string(),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Read `redis_url` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = lookup(REDIS_URL_VAR).filter(|u| !u.trim().is_empty()) {
            cfg.url = url;
        }
        cfg
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Build the backend for this configuration.
    ///
    /// Always the in-process MemoryCache: `url` is not dialled and is
    /// only logged, so a configured `redis_url` has no effect here.
    pub fn connect(&self) -> Arc<dyn ResultCache> {
        tracing::info!(
            "Result cache: in-process backend, prefix '{}', ttl {}s (redis_url {} ignored)",
            self.prefix,
            self.ttl_secs,
            self.url
        );
        Arc::new(MemoryCache::with_prefix(&self.prefix))
    }
}

// ─── MemoryCache ──────────────────────────────────────────────────────────────
struct CacheEntry {
    value:      String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    prefix:  String,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self { entries: DashMap::new(), prefix: prefix.to_string() }
    }

    /// Entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(&self, fingerprint: &str) -> String {
        format!("{}:{}", self.prefix, fingerprint)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache for MemoryCache {
    fn lookup(&self, fingerprint: &str) -> Result<Option<String>> {
        let key = self.key(fingerprint);
        let now = Instant::now();

        // The map guard must be released before remove_if on the same shard
        let found = self
            .entries
            .get(&key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(&key, |_, entry| !entry.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn store(&self, fingerprint: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value:      value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(self.key(fingerprint), entry);
        Ok(())
    }
}
