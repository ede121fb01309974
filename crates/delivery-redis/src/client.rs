//! Redis client implementation with connection management

use crate::Result;
use redis::aio::ConnectionManager;

/// INCR a key and set its TTL only on the first increment.
/// Runs server-side as one atomic step.
const INCR_WITH_EXPIRY_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Redis client with automatic reconnection
///
/// Cloning is cheap: every clone shares the same multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    incr_script: redis::Script,
}

impl RedisClient {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            incr_script: redis::Script::new(INCR_WITH_EXPIRY_SCRIPT),
        })
    }

    // ============================================================================
    // Atomic Operations
    // ============================================================================

    /// Increment a windowed counter, starting the window on the first hit
    ///
    /// Returns the count after the increment.
    pub async fn incr_with_expiry(&mut self, key: &str, window_seconds: u64) -> Result<i64> {
        self.incr_script
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut self.conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_incr_with_expiry() -> Result<()> {
        let mut client = RedisClient::connect("redis://localhost:6379").await?;
        let key = format!("test:incr_with_expiry:{}", std::process::id());

        assert_eq!(client.incr_with_expiry(&key, 1).await?, 1);
        assert_eq!(client.incr_with_expiry(&key, 1).await?, 2);

        // The window set on the first hit expires the counter
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(client.incr_with_expiry(&key, 1).await?, 1);
        Ok(())
    }
}
