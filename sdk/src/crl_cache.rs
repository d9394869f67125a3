// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Two-tier CRL cache.
//!
//! Lookups go process memory first, then the durable [`CrlStore`], then the
//! [`CrlDirectory`]. Directory failures are logged and reported as a miss.
//! Concurrent lookups for the same issuer and country share one directory
//! fetch.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    crl::Crl,
    ports::{CrlDirectory, CrlRecord, CrlStore},
    settings::CrlCacheSettings,
    utils::time::utc_now,
};

/// Where a cached CRL was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrlSource {
    /// The in-process tier.
    Memory,

    /// The durable store.
    Store,

    /// A fresh directory fetch.
    Directory,
}

/// A successful cache lookup.
#[derive(Clone, Debug)]
pub struct CrlLookup {
    pub crl: Arc<Crl>,
    pub source: CrlSource,
}

impl CrlLookup {
    /// `true` unless the CRL was fetched from the directory by this lookup.
    pub fn from_cache(&self) -> bool {
        self.source != CrlSource::Directory
    }
}

#[derive(Clone, Debug)]
struct CachedCrl {
    crl: Arc<Crl>,
    expires_at: DateTime<Utc>,
}

/// Counters reported by [`CrlCache::stats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub memory_hits: u64,
    pub store_hits: u64,
    pub directory_fetches: u64,
    pub directory_failures: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    memory_hits: AtomicU64,
    store_hits: AtomicU64,
    directory_fetches: AtomicU64,
    directory_failures: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Cache of parsed CRLs keyed by `country:issuerDn`.
pub struct CrlCache {
    entries: DashMap<String, CachedCrl>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    store: Arc<dyn CrlStore>,
    directory: Arc<dyn CrlDirectory>,
    default_ttl: chrono::Duration,
    counters: Counters,
}

impl fmt::Debug for CrlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrlCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl CrlCache {
    pub fn new(
        store: Arc<dyn CrlStore>,
        directory: Arc<dyn CrlDirectory>,
        settings: &CrlCacheSettings,
    ) -> Self {
        let default_ttl = i64::try_from(settings.default_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::days(1));

        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            store,
            directory,
            default_ttl,
            counters: Counters::default(),
        }
    }

    /// The cache key for an issuer and country.
    pub fn cache_key(issuer_dn: &str, country_code: &str) -> String {
        format!("{country_code}:{issuer_dn}")
    }

    /// Returns the CRL for an issuer and country, or `None` if no tier has
    /// one.
    pub async fn get(&self, issuer_dn: &str, country_code: &str) -> Option<Arc<Crl>> {
        self.lookup(issuer_dn, country_code)
            .await
            .map(|found| found.crl)
    }

    /// Like [`CrlCache::get`], also reporting which tier answered.
    pub async fn lookup(&self, issuer_dn: &str, country_code: &str) -> Option<CrlLookup> {
        self.lookup_at(issuer_dn, country_code, utc_now()).await
    }

    /// Looks up a CRL as of `now`.
    pub async fn lookup_at(
        &self,
        issuer_dn: &str,
        country_code: &str,
        now: DateTime<Utc>,
    ) -> Option<CrlLookup> {
        let key = Self::cache_key(issuer_dn, country_code);

        if let Some(crl) = self.from_memory(&key, now) {
            return Some(CrlLookup {
                crl,
                source: CrlSource::Memory,
            });
        }

        let gate = self.in_flight.entry(key.clone()).or_default().clone();
        let found = {
            let _guard = gate.lock().await;
            self.fill(&key, issuer_dn, country_code, now).await
        };
        drop(gate);

        // Only the map holds the gate once no other lookup is using it.
        self.in_flight
            .remove_if(&key, |_, g| Arc::strong_count(g) == 1);
        found
    }

    // Runs under the key's gate.
    async fn fill(
        &self,
        key: &str,
        issuer_dn: &str,
        country_code: &str,
        now: DateTime<Utc>,
    ) -> Option<CrlLookup> {
        // Another task may have filled the entry while this one waited.
        if let Some(crl) = self.from_memory(key, now) {
            return Some(CrlLookup {
                crl,
                source: CrlSource::Memory,
            });
        }

        if let Some(crl) = self.from_store(key, issuer_dn, country_code, now).await {
            return Some(CrlLookup {
                crl,
                source: CrlSource::Store,
            });
        }

        match self.from_directory(key, issuer_dn, country_code, now).await {
            Some(crl) => Some(CrlLookup {
                crl,
                source: CrlSource::Directory,
            }),
            None => {
                bump(&self.counters.misses);
                None
            }
        }
    }

    /// Adds a CRL obtained outside the directory (bulk ingestion) to both
    /// tiers.
    pub async fn ingest(&self, country_code: &str, crl: Crl) -> Arc<Crl> {
        let key = Self::cache_key(crl.issuer_name(), country_code);
        let crl = Arc::new(crl);
        self.persist(&crl, country_code).await;
        self.remember(key, crl.clone(), utc_now());
        crl
    }

    /// Evicts every in-process entry that expired before now.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(utc_now())
    }

    /// Evicts every in-process entry that expired before `now`.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        let evicted = before.saturating_sub(self.entries.len());

        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            info!("CRL cache sweep evicted {evicted} entries");
        }
        evicted
    }

    /// Starts a task that sweeps this cache every `interval`. The task ends
    /// once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.sweep_expired();
                    }
                    None => break,
                }
            }
        })
    }

    /// Number of in-process entries, including expired ones not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            entries: self.entries.len(),
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            store_hits: c.store_hits.load(Ordering::Relaxed),
            directory_fetches: c.directory_fetches.load(Ordering::Relaxed),
            directory_failures: c.directory_failures.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
        }
    }

    fn from_memory(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<Crl>> {
        let cached = self.entries.get(key).map(|e| e.value().clone())?;

        if now <= cached.expires_at {
            bump(&self.counters.memory_hits);
            debug!("CRL cache hit for {key}");
            return Some(cached.crl);
        }

        if self
            .entries
            .remove_if(key, |_, e| e.expires_at < now)
            .is_some()
        {
            bump(&self.counters.evictions);
            debug!("evicted expired CRL for {key}");
        }
        None
    }

    async fn from_store(
        &self,
        key: &str,
        issuer_dn: &str,
        country_code: &str,
        now: DateTime<Utc>,
    ) -> Option<Arc<Crl>> {
        let record = match self
            .store
            .find_by_issuer_and_country(issuer_dn, country_code)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!("CRL store lookup for {key} failed: {err}");
                return None;
            }
        };

        if record.is_stale_at(now) {
            debug!("stored CRL for {key} is stale");
            return None;
        }

        match Crl::from_der(&record.der) {
            Ok(crl) => {
                bump(&self.counters.store_hits);
                let crl = Arc::new(crl);
                self.remember(key.to_owned(), crl.clone(), now);
                Some(crl)
            }
            Err(err) => {
                warn!("stored CRL for {key} does not parse: {err}");
                None
            }
        }
    }

    async fn from_directory(
        &self,
        key: &str,
        issuer_dn: &str,
        country_code: &str,
        now: DateTime<Utc>,
    ) -> Option<Arc<Crl>> {
        bump(&self.counters.directory_fetches);

        let der = match self
            .directory
            .find_crl_by_issuer(issuer_dn, country_code)
            .await
        {
            Ok(Some(der)) => der,
            Ok(None) => {
                info!("directory has no CRL for {key}");
                return None;
            }
            Err(err) => {
                bump(&self.counters.directory_failures);
                warn!("directory fetch for {key} failed: {err}");
                return None;
            }
        };

        let crl = match Crl::from_der(&der) {
            Ok(crl) => Arc::new(crl),
            Err(err) => {
                bump(&self.counters.directory_failures);
                warn!("directory returned an unparseable CRL for {key}: {err}");
                return None;
            }
        };

        self.persist(&crl, country_code).await;
        self.remember(key.to_owned(), crl.clone(), now);
        Some(crl)
    }

    fn remember(&self, key: String, crl: Arc<Crl>, now: DateTime<Utc>) {
        let expires_at = crl.next_update().unwrap_or(now + self.default_ttl);
        self.entries.insert(key, CachedCrl { crl, expires_at });
    }

    // Skips the write when the store already holds this CRL or a newer one.
    async fn persist(&self, crl: &Crl, country_code: &str) {
        match self
            .store
            .find_by_issuer_and_country(crl.issuer_name(), country_code)
            .await
        {
            Ok(Some(existing)) if existing.this_update >= crl.this_update() => {
                debug!(
                    "store already holds a CRL for {country_code}:{} from {}",
                    crl.issuer_name(),
                    existing.this_update
                );
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!("CRL store lookup before save failed: {err}");
            }
        }

        if let Err(err) = self.store.save(CrlRecord::from_crl(crl, country_code)).await {
            warn!("saving CRL for {country_code}:{} failed: {err}", crl.issuer_name());
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::{
        ports::memory::{MemoryCrlDirectory, MemoryCrlStore},
        Error, Result,
    };

    const REVOKING: &[u8] = include_bytes!("../tests/fixtures/pki/csca_revoking.crl");
    const STALE: &[u8] = include_bytes!("../tests/fixtures/pki/csca_stale.crl");

    #[derive(Default)]
    struct CountingDirectory {
        inner: MemoryCrlDirectory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CrlDirectory for CountingDirectory {
        async fn find_crl_by_issuer(&self, issuer: &str, country: &str) -> Result<Option<Vec<u8>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.find_crl_by_issuer(issuer, country).await
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl CrlDirectory for FailingDirectory {
        async fn find_crl_by_issuer(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>> {
            Err(Error::Port("directory offline".into()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap()
    }

    fn issuer() -> String {
        Crl::from_der(REVOKING).unwrap().issuer_name().to_owned()
    }

    fn cache_with(
        store: Arc<MemoryCrlStore>,
        directory: Arc<dyn CrlDirectory>,
    ) -> CrlCache {
        CrlCache::new(store, directory, &CrlCacheSettings::default())
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_memory() {
        let directory = Arc::new(CountingDirectory::default());
        directory
            .inner
            .publish("UT", &Crl::from_der(REVOKING).unwrap());
        let store = Arc::new(MemoryCrlStore::new());
        let cache = cache_with(store.clone(), directory.clone());

        let first = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(first.source, CrlSource::Directory);
        assert!(!first.from_cache());

        let second = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(second.source, CrlSource::Memory);
        assert!(second.from_cache());

        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_share_one_fetch() {
        let directory = Arc::new(CountingDirectory::default());
        directory
            .inner
            .publish("UT", &Crl::from_der(REVOKING).unwrap());
        let cache = Arc::new(cache_with(Arc::new(MemoryCrlStore::new()), directory.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.lookup_at(&issuer(), "UT", now()).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test]
    async fn settled_lookups_leave_no_gates() {
        let directory = Arc::new(CountingDirectory::default());
        directory
            .inner
            .publish("UT", &Crl::from_der(REVOKING).unwrap());
        let cache = cache_with(Arc::new(MemoryCrlStore::new()), directory);

        for n in 0..100 {
            let issuer = format!("CN=Unknown CSCA {n},C=UT");
            assert!(cache.lookup_at(&issuer, "UT", now()).await.is_none());
        }
        assert!(cache.lookup_at(&issuer(), "UT", now()).await.is_some());

        assert!(cache.in_flight.is_empty());
        assert_eq!(cache.stats().misses, 100);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test]
    async fn store_tier_populates_memory() {
        let store = Arc::new(MemoryCrlStore::new());
        store
            .save(CrlRecord::from_crl(&Crl::from_der(REVOKING).unwrap(), "UT"))
            .await
            .unwrap();
        let directory = Arc::new(CountingDirectory::default());
        let cache = cache_with(store, directory.clone());

        let found = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(found.source, CrlSource::Store);
        let again = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(again.source, CrlSource::Memory);

        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().store_hits, 1);
    }

    #[tokio::test]
    async fn stale_store_entry_goes_to_directory() {
        let store = Arc::new(MemoryCrlStore::new());
        store
            .save(CrlRecord::from_crl(&Crl::from_der(STALE).unwrap(), "UT"))
            .await
            .unwrap();
        let directory = Arc::new(CountingDirectory::default());
        directory
            .inner
            .publish("UT", &Crl::from_der(REVOKING).unwrap());
        let cache = cache_with(store.clone(), directory.clone());

        let found = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(found.source, CrlSource::Directory);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        // The fresher CRL supersedes the stale record.
        let record = store
            .find_by_issuer_and_country(&issuer(), "UT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.this_update, Crl::from_der(REVOKING).unwrap().this_update());
    }

    #[tokio::test]
    async fn expired_memory_entry_is_refetched() {
        let directory = Arc::new(CountingDirectory::default());
        directory.inner.publish("UT", &Crl::from_der(STALE).unwrap());
        let cache = cache_with(Arc::new(MemoryCrlStore::new()), directory.clone());

        // The directory only has a stale CRL: it is returned, but it is never
        // served from memory afterwards.
        let jan_2025 = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert!(cache.lookup_at(&issuer(), "UT", jan_2025).await.is_some());
        assert_eq!(
            cache.lookup_at(&issuer(), "UT", jan_2025).await.unwrap().source,
            CrlSource::Memory
        );

        let found = cache.lookup_at(&issuer(), "UT", now()).await.unwrap();
        assert_eq!(found.source, CrlSource::Directory);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn directory_failure_is_a_miss() {
        let cache = cache_with(Arc::new(MemoryCrlStore::new()), Arc::new(FailingDirectory));

        assert!(cache.lookup_at(&issuer(), "UT", now()).await.is_none());
        let stats = cache.stats();
        assert_eq!(stats.directory_failures, 1);
        assert_eq!(stats.misses, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn newer_stored_record_is_not_overwritten() {
        let store = Arc::new(MemoryCrlStore::new());
        let cache = cache_with(store.clone(), Arc::new(MemoryCrlDirectory::new()));

        cache.ingest("UT", Crl::from_der(REVOKING).unwrap()).await;
        cache.ingest("UT", Crl::from_der(STALE).unwrap()).await;

        let record = store
            .find_by_issuer_and_country(&issuer(), "UT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.this_update, Crl::from_der(REVOKING).unwrap().this_update());
    }

    #[tokio::test]
    async fn sweep_evicts_expired_entries() {
        let cache = cache_with(
            Arc::new(MemoryCrlStore::new()),
            Arc::new(MemoryCrlDirectory::new()),
        );
        cache.ingest("UT", Crl::from_der(REVOKING).unwrap()).await;
        cache.ingest("ZZ", Crl::from_der(STALE).unwrap()).await;
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.sweep_expired_at(now()), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_periodically() {
        let cache = Arc::new(cache_with(
            Arc::new(MemoryCrlStore::new()),
            Arc::new(MemoryCrlDirectory::new()),
        ));
        cache.ingest("ZZ", Crl::from_der(STALE).unwrap()).await;

        let handle = cache.spawn_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(cache.is_empty());
        drop(cache);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(handle.await.is_ok());
    }
}
