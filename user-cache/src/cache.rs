//! User Cache: per-customer JSON snapshot with coalesced
//! concurrent initialization and atomic writes.

use crate::source::UserDataSource;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("upstream tool call failed: {0}")]
    Source(#[from] crate::source::SourceError),
    #[error("timed out waiting for concurrent initialization")]
    CoalesceTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub account: Value,
    pub transactions: Value,
    pub beneficiaries: Value,
    pub limits: Value,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserCacheConfig {
    pub dir: PathBuf,
    pub ttl: Duration,
    pub cleanup_age: Duration,
}

impl Default for UserCacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/banking-fabric/user-cache"),
            ttl: Duration::from_secs(300),
            cleanup_age: Duration::from_secs(3600),
        }
    }
}

const COALESCE_CAP: Duration = Duration::from_secs(25);
const READ_RETRY_ATTEMPTS: u32 = 3;
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct UserCache {
    config: UserCacheConfig,
    in_flight: DashMap<String, Arc<Notify>>,
}

impl UserCache {
    pub fn new(config: UserCacheConfig) -> Self {
        Self {
            config,
            in_flight: DashMap::new(),
        }
    }

    fn path_for(&self, customer_id: &str) -> PathBuf {
        self.config.dir.join(format!("{customer_id}.json"))
    }

    async fn read_with_retry(path: &Path) -> Result<Option<Snapshot>, CacheError> {
        let mut last_err = None;
        for attempt in 0..READ_RETRY_ATTEMPTS {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => return Ok(Some(serde_json::from_str(&content)?)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < READ_RETRY_ATTEMPTS {
                        tokio::time::sleep(READ_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.unwrap().into())
    }

    async fn write_atomic(&self, customer_id: &str, snapshot: &Snapshot) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.config.dir).await?;
        let path = self.path_for(customer_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Fetches and caches a customer's snapshot. A second caller for the
    /// same `customer_id` while a fetch is in flight waits (up to 25s) on
    /// the first caller's result instead of re-issuing tool calls.
    pub async fn initialize(
        &self,
        customer_id: &str,
        user_email: &str,
        source: &dyn UserDataSource,
    ) -> Result<Snapshot, CacheError> {
        use dashmap::mapref::entry::Entry;

        // entry() holds the shard lock for the whole occupied/vacant check,
        // so two truly concurrent first-time callers can't both see Vacant.
        let notify = match self.in_flight.entry(customer_id.to_string()) {
            Entry::Occupied(entry) => {
                let notify = entry.get().clone();
                drop(entry);
                let waited = tokio::time::timeout(COALESCE_CAP, notify.notified()).await;
                if waited.is_err() {
                    return Err(CacheError::CoalesceTimeout);
                }
                return Self::read_with_retry(&self.path_for(customer_id))
                    .await?
                    .ok_or(CacheError::CoalesceTimeout);
            }
            Entry::Vacant(entry) => {
                let notify = Arc::new(Notify::new());
                entry.insert(notify.clone());
                notify
            }
        };

        let result = self.initialize_uncoalesced(customer_id, user_email, source).await;

        self.in_flight.remove(customer_id);
        notify.notify_waiters();
        result
    }

    async fn initialize_uncoalesced(
        &self,
        customer_id: &str,
        user_email: &str,
        source: &dyn UserDataSource,
    ) -> Result<Snapshot, CacheError> {
        let account = source.primary_account(user_email).await?;
        let account_id = account
            .get("account_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let (transactions, beneficiaries, limits) = futures::try_join!(
            source.recent_transactions(&account_id, 5),
            source.beneficiaries(&account_id),
            source.limits(&account_id),
        )?;

        let snapshot = Snapshot {
            account,
            transactions,
            beneficiaries,
            limits,
            cached_at: Utc::now(),
        };
        self.write_atomic(customer_id, &snapshot).await?;
        Ok(snapshot)
    }

    /// Returns `None` if missing, expired, or (for `key == "balance"`) the
    /// stored value is exactly `0`, the documented stale sentinel,
    /// rather than treated as a real zero balance.
    pub async fn get(&self, customer_id: &str, key: Option<&str>) -> Option<Value> {
        let snapshot = Self::read_with_retry(&self.path_for(customer_id)).await.ok()??;
        if Utc::now().signed_duration_since(snapshot.cached_at)
            > chrono::Duration::from_std(self.config.ttl).unwrap_or_default()
        {
            return None;
        }

        let data = serde_json::to_value(&snapshot).ok()?;
        let Some(key) = key else {
            return Some(data);
        };

        let value = data
            .get(key)
            .cloned()
            .or_else(|| data.get("account").and_then(|a| a.get(key)).cloned())?;

        if key == "balance" && is_zero(&value) {
            return None;
        }
        Some(value)
    }

    pub async fn update(&self, customer_id: &str, partial: Value) -> Result<(), CacheError> {
        let mut snapshot = Self::read_with_retry(&self.path_for(customer_id))
            .await?
            .unwrap_or(Snapshot {
                account: Value::Null,
                transactions: Value::Null,
                beneficiaries: Value::Null,
                limits: Value::Null,
                cached_at: Utc::now(),
            });

        if let Value::Object(partial_map) = partial {
            let mut data = serde_json::to_value(&snapshot)?;
            if let Value::Object(data_map) = &mut data {
                for (key, value) in partial_map {
                    data_map.insert(key, value);
                }
            }
            snapshot = serde_json::from_value(data)?;
        }
        snapshot.cached_at = Utc::now();
        self.write_atomic(customer_id, &snapshot).await
    }

    pub async fn invalidate(&self, customer_id: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(customer_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes snapshot files older than `cleanup_age`, meant
    /// to be driven by a periodic background loop, as with the Health
    /// Monitor.
    pub async fn cleanup_old(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.config.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let metadata = entry.metadata().await?;
            if let Ok(modified) = metadata.modified() {
                if modified.elapsed().unwrap_or_default() > self.config.cleanup_age {
                    tokio::fs::remove_file(entry.path()).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.parse::<f64>() == Ok(0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        fetches: AtomicUsize,
        balance: f64,
    }

    #[async_trait]
    impl UserDataSource for StubSource {
        async fn primary_account(&self, _user_email: &str) -> Result<Value, crate::source::SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"account_id": "acc-1", "balance": self.balance}))
        }
        async fn recent_transactions(&self, _account_id: &str, _limit: u32) -> Result<Value, crate::source::SourceError> {
            Ok(json!([]))
        }
        async fn beneficiaries(&self, _account_id: &str) -> Result<Value, crate::source::SourceError> {
            Ok(json!([]))
        }
        async fn limits(&self, _account_id: &str) -> Result<Value, crate::source::SourceError> {
            Ok(json!({"daily_transfer_limit": 5000}))
        }
    }

    fn cache(dir: &Path) -> UserCache {
        UserCache::new(UserCacheConfig {
            dir: dir.to_path_buf(),
            ttl: Duration::from_secs(300),
            cleanup_age: Duration::from_secs(3600),
        })
    }

    #[tokio::test]
    async fn initialize_then_get_round_trips_account() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = StubSource { fetches: AtomicUsize::new(0), balance: 100.0 };
        cache.initialize("cust-1", "a@b.com", &source).await.unwrap();

        let balance = cache.get("cust-1", Some("balance")).await.unwrap();
        assert_eq!(balance, json!(100.0));
    }

    #[tokio::test]
    async fn zero_balance_is_treated_as_stale_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = StubSource { fetches: AtomicUsize::new(0), balance: 0.0 };
        cache.initialize("cust-1", "a@b.com", &source).await.unwrap();

        assert!(cache.get("cust-1", Some("balance")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_initialize_coalesces_into_one_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(cache(dir.path()));
        let source = Arc::new(StubSource { fetches: AtomicUsize::new(0), balance: 50.0 });

        let (a, b) = tokio::join!(
            {
                let cache = cache.clone();
                let source = source.clone();
                async move { cache.initialize("cust-1", "a@b.com", &*source).await }
            },
            {
                let cache = cache.clone();
                let source = source.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    cache.initialize("cust-1", "a@b.com", &*source).await
                }
            }
        );
        assert!(a.is_ok());
        assert!(b.is_ok() || matches!(b, Err(CacheError::CoalesceTimeout)));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn truly_simultaneous_initializers_still_fetch_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(cache(dir.path()));
        let source = Arc::new(StubSource { fetches: AtomicUsize::new(0), balance: 50.0 });
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let source = source.clone();
            let barrier = barrier.clone();
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                cache.initialize("cust-1", "a@b.com", &*source).await
            }));
        }
        for task in tasks {
            let outcome = task.await.unwrap();
            assert!(outcome.is_ok() || matches!(outcome, Err(CacheError::CoalesceTimeout)));
        }
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = StubSource { fetches: AtomicUsize::new(0), balance: 50.0 };
        cache.initialize("cust-1", "a@b.com", &source).await.unwrap();
        cache.invalidate("cust-1").await.unwrap();
        assert!(cache.get("cust-1", None).await.is_none());
    }

    #[tokio::test]
    async fn update_merges_and_refreshes_cached_at() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let source = StubSource { fetches: AtomicUsize::new(0), balance: 50.0 };
        cache.initialize("cust-1", "a@b.com", &source).await.unwrap();

        cache
            .update("cust-1", json!({"transactions": [{"id": "tx-1"}]}))
            .await
            .unwrap();
        let transactions = cache.get("cust-1", Some("transactions")).await.unwrap();
        assert_eq!(transactions, json!([{"id": "tx-1"}]));
    }
}
