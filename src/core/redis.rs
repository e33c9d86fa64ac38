use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, RedisError};
use tokio::sync::RwLock;

const LOGIN_KEY_PREFIX: &str = "exam:rl:login";

/// Fixed-window counter: the first hit in a window sets the expiry.
const FIXED_WINDOW_SCRIPT: &str = r#"
    local current = redis.call("INCR", KEYS[1])
    if current == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return current
"#;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHealth {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            RedisHealth::Healthy => "healthy",
            RedisHealth::Disconnected => "disconnected",
            RedisHealth::Unhealthy(_) => "unhealthy",
        }
    }
}

/// Counter key for login attempts of one account kind and identifier.
pub(crate) fn login_attempt_key(scope: &str, identifier: &str) -> String {
    format!("{LOGIN_KEY_PREFIX}:{scope}:{}", identifier.trim().to_lowercase())
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        *self.manager.write().await = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        *self.manager.write().await = None;
    }

    async fn manager(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Some(mut manager) = self.manager().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    /// Returns `false` once `key` has been hit more than `limit` times in the window.
    /// Without a connection every request is allowed.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(true);
        };

        let current: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds as i64)
            .invoke_async(&mut manager)
            .await?;

        Ok(current <= limit as i64)
    }

    /// Drops a counter, e.g. after a successful login.
    pub(crate) async fn clear_counter(&self, key: &str) -> Result<(), RedisError> {
        let Some(mut manager) = self.manager().await else {
            return Ok(());
        };
        cmd("DEL").arg(key).query_async::<_, ()>(&mut manager).await
    }
}

#[cfg(test)]
mod tests {
    use super::{login_attempt_key, RedisHandle};
    use crate::core::config::Settings;
    use crate::test_support;
    use uuid::Uuid;

    #[test]
    fn login_keys_ignore_case_and_padding() {
        assert_eq!(login_attempt_key("student", " S2025001 "), "exam:rl:login:student:s2025001");
        assert_ne!(login_attempt_key("admin", "root"), login_attempt_key("student", "root"));
    }

    #[tokio::test]
    async fn disconnected_handle_allows_everything() {
        let redis = RedisHandle::new("redis://127.0.0.1:1/0".to_string());
        assert!(redis.rate_limit("any", 0, 5).await.expect("rate limit"));
        redis.clear_counter("any").await.expect("clear");
        assert_eq!(redis.health().await.label(), "disconnected");
    }

    #[tokio::test]
    async fn login_counter_blocks_then_clears() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        test_support::reset_redis(settings.redis().redis_url()).await.expect("redis reset");

        let redis = RedisHandle::new(settings.redis().redis_url());
        redis.connect().await.expect("redis connect");

        let key = login_attempt_key("student", &Uuid::new_v4().to_string());
        assert!(redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
        assert!(!redis.rate_limit(&key, 1, 5).await.expect("rate limit"));

        redis.clear_counter(&key).await.expect("clear");
        assert!(redis.rate_limit(&key, 1, 5).await.expect("rate limit"));
    }
}
