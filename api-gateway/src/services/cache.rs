use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, Script};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Key/value store with per-key expiry, used for one-time codes.
#[async_trait]
pub trait SideCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value and its expiry.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), anyhow::Error>;

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;

    /// Remove `key`; `true` when a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error>;

    /// Remove `key` only while it still holds `expected`; `true` when removed.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, anyhow::Error>;

    /// Add one to the counter at `key` and return the new value. A new
    /// counter expires after `ttl`; later increments keep that expiry.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

const DELETE_IF_EQUALS: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const INCREMENT_WITH_EXPIRY: &str = r#"
local n = redis.call('INCR', KEYS[1])
if n == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return n
"#;

#[derive(Clone)]
pub struct RedisService {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisService {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl SideCache for RedisService {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set cache entry: {}", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get cache entry: {}", e))
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete cache entry: {}", e))?;
        Ok(removed > 0)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();
        let script = Script::new(DELETE_IF_EQUALS);
        let removed: i64 = script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete cache entry: {}", e))?;
        Ok(removed > 0)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, anyhow::Error> {
        let mut conn = self.manager.clone();
        let script = Script::new(INCREMENT_WITH_EXPIRY);
        let count: i64 = script
            .key(key)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to increment cache counter: {}", e))?;
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-process cache honouring TTLs on the tokio clock, so paused-time tests
/// can step past an expiry.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable cache.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, anyhow::Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("cache unavailable");
        }
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("cache lock poisoned"))
    }
}

#[async_trait]
impl SideCache for MockCache {
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), anyhow::Error> {
        self.entries()?
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut entries = self.entries()?;
        let now = Instant::now();
        let live = entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone());

        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn delete(&self, key: &str) -> Result<bool, anyhow::Error> {
        let removed = self.entries()?.remove(key);
        Ok(matches!(removed, Some((_, expires_at)) if expires_at > Instant::now()))
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, anyhow::Error> {
        let mut entries = self.entries()?;
        let now = Instant::now();
        let matches = matches!(
            entries.get(key),
            Some((value, expires_at)) if *expires_at > now && value == expected
        );

        if matches {
            entries.remove(key);
        }
        Ok(matches)
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, anyhow::Error> {
        let mut entries = self.entries()?;
        let now = Instant::now();
        let (count, expires_at) = match entries.get(key) {
            Some((value, expires_at)) if *expires_at > now => {
                let current: i64 = value.parse()?;
                (current + 1, *expires_at)
            }
            _ => (1, now + ttl),
        };

        entries.insert(key.to_string(), (count.to_string(), expires_at));
        Ok(count)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.entries().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mock_cache_expires_entries() {
        let cache = MockCache::new();
        cache
            .set_with_expiry("otp-a@x.com", "123456", Duration::from_secs(300))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("otp-a@x.com").await.unwrap().as_deref(), Some("123456"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("otp-a@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_cache_overwrite_and_delete() {
        let cache = MockCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_with_expiry("k", "1", ttl).await.unwrap();
        cache.set_with_expiry("k", "2", ttl).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("2"));
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_mock_cache_delete_if_equals() {
        let cache = MockCache::new();
        let ttl = Duration::from_secs(60);
        cache.set_with_expiry("k", "new", ttl).await.unwrap();

        assert!(!cache.delete_if_equals("k", "old").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
        assert!(cache.delete_if_equals("k", "new").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_cache_counter_keeps_first_expiry() {
        let cache = MockCache::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.increment("n", ttl).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(40)).await;
        assert_eq!(cache.increment("n", ttl).await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(cache.increment("n", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mock_cache_outage() {
        let cache = MockCache::new();
        cache.set_unavailable(true);
        assert!(cache.get("k").await.is_err());
        assert!(cache.health_check().await.is_err());
    }
}
