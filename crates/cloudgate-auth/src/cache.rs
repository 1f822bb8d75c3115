//! Process-wide tenant cache with single-flight discovery deduplication.
//!
//! The cache is the only state shared across concurrent requests. Lookups
//! are a read-lock away; a miss (or an expired entry) collapses all
//! concurrent callers for the same issuer onto one shared discovery future,
//! so discovery fan-out is bounded to one outstanding call per issuer no
//! matter how bursty the traffic. Neither table lock is ever held across
//! the network call, so one issuer's discovery latency cannot block another
//! issuer's lookups.
//!
//! Successful records are stored under the canonical issuer reported by the
//! provider, with a fixed TTL; re-discovery after expiry is the only key
//! rotation mechanism. Failures are never cached; the next request simply
//! retries discovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::discovery::{TenantDiscovery, TenantRecord};
use crate::error::AuthError;

type ResolveResult = Result<Arc<TenantRecord>, AuthError>;
type InflightDiscovery = Shared<BoxFuture<'static, ResolveResult>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: Arc<TenantRecord>,
    expires_at: SystemTime,
}

/// Issuer → tenant record cache.
///
/// Constructor-injected into the middleware (never a hidden global), so
/// tests run against isolated instances. Cloning is cheap and shares the
/// underlying tables.
#[derive(Clone)]
pub struct TenantCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, InflightDiscovery>>,
}

impl TenantCache {
    /// Create an empty cache whose entries live for `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl,
                entries: RwLock::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolve `issuer` to a tenant record, discovering it if absent or
    /// expired.
    ///
    /// Concurrent calls for the same issuer key join a single discovery
    /// and receive its result, success or the identical error.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unverifiable`] wrapping the discovery failure.
    pub async fn resolve(
        &self,
        issuer: &str,
        issuer_url: &Url,
        discovery: Arc<dyn TenantDiscovery>,
    ) -> ResolveResult {
        if let Some(record) = self.lookup(issuer).await {
            debug!(issuer, "tenant cache hit");
            return Ok(record);
        }

        let flight = {
            let mut inflight = self.inner.inflight.lock().await;
            if let Some(existing) = inflight.get(issuer) {
                debug!(issuer, "joining in-flight tenant discovery");
                existing.clone()
            } else if let Some(record) = self.lookup(issuer).await {
                // A discovery finished between the fast-path miss and
                // taking the in-flight lock.
                return Ok(record);
            } else {
                let flight =
                    self.start_discovery(issuer.to_string(), issuer_url.clone(), discovery);
                inflight.insert(issuer.to_string(), flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Insert a record directly, keyed by its canonical issuer.
    ///
    /// Intended for tests and deployments with statically known tenants.
    pub async fn seed(&self, record: TenantRecord) {
        self.inner.store(Arc::new(record)).await;
    }

    /// Number of live (possibly expired) entries. Test visibility only.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    async fn lookup(&self, issuer: &str) -> Option<Arc<TenantRecord>> {
        let entries = self.inner.entries.read().await;
        let entry = entries.get(issuer)?;
        if SystemTime::now() >= entry.expires_at {
            return None;
        }
        Some(Arc::clone(&entry.record))
    }

    fn start_discovery(
        &self,
        key: String,
        issuer_url: Url,
        discovery: Arc<dyn TenantDiscovery>,
    ) -> InflightDiscovery {
        let inner = Arc::clone(&self.inner);
        async move {
            info!(issuer = %key, "starting tenant discovery");
            let result = match discovery.discover(&issuer_url).await {
                Ok(record) => {
                    let record = Arc::new(record);
                    inner.store(Arc::clone(&record)).await;
                    Ok(record)
                }
                Err(err) => {
                    warn!(issuer = %key, error = %err, "tenant discovery failed");
                    Err(AuthError::Unverifiable(format!(
                        "unable to perform oidc discovery: {err}"
                    )))
                }
            };
            // Remove the join handle last: late joiners either caught the
            // handle before this point or re-check the entry table first.
            inner.inflight.lock().await.remove(&key);
            result
        }
        .boxed()
        .shared()
    }
}

impl CacheInner {
    /// Store under the provider-reported issuer, replacing any prior entry.
    async fn store(&self, record: Arc<TenantRecord>) {
        let entry = CacheEntry {
            expires_at: SystemTime::now() + self.ttl,
            record: Arc::clone(&record),
        };
        let mut entries = self.entries.write().await;
        entries.insert(record.issuer().to_string(), entry);
    }
}

impl std::fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantCache")
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}
