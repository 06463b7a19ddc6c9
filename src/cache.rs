use std::time::Duration;

use anyhow::{bail, Context};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use crate::config::RedisConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Plain key/value client. Nothing in the request path depends on it.
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
}

impl CacheClient {
    /// Opens a managed connection and checks it with `PING`, giving up after five seconds.
    pub async fn connect(cfg: &RedisConfig) -> anyhow::Result<Self> {
        let client = Client::open(cfg.url()).context("invalid redis url")?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let conn = ConnectionManager::new(client).await?;
            let mut check = conn.clone();
            let _: String = redis::cmd("PING").query_async(&mut check).await?;
            Ok::<_, redis::RedisError>(conn)
        })
        .await
        .context("redis connect timed out")?
        .context("connect to redis")?;

        info!(host = %cfg.host, port = cfg.port, db = cfg.db, "redis connected");
        Ok(Self { conn })
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        debug!(key, "cache set");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    /// Deletes every given key; returns how many existed.
    pub async fn delete(&self, keys: &[&str]) -> anyhow::Result<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del(keys).await?)
    }

    pub async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            bail!("unexpected PING reply: {pong}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> RedisConfig {
        RedisConfig {
            host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }

    #[tokio::test]
    #[ignore = "needs a running redis"]
    async fn set_get_delete_roundtrip() {
        let cache = CacheClient::connect(&local()).await.unwrap();
        cache.ping().await.unwrap();

        cache
            .set("user-api:test", "value", Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert_eq!(cache.get("user-api:test").await.unwrap().as_deref(), Some("value"));
        assert!(cache.exists("user-api:test").await.unwrap());

        assert_eq!(cache.delete(&["user-api:test", "user-api:absent"]).await.unwrap(), 1);
        assert!(cache.get("user-api:test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_server_fails_fast() {
        let cfg = RedisConfig {
            host: "127.0.0.1".into(),
            port: 1,
            password: String::new(),
            db: 0,
        };
        assert!(CacheClient::connect(&cfg).await.is_err());
    }
}
