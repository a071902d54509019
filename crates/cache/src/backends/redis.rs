//! Redis cache backend using hash commands.

use crate::error::{CacheError, CacheResult};
use crate::traits::{CacheStore, FieldMap};
use ::redis::aio::{ConnectionManager, ConnectionManagerConfig};
use ::redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Reconnect attempts after the first failed connect.
const CONNECT_RETRIES: usize = 2;
/// Upper bound on the delay between connect attempts, in milliseconds.
const CONNECT_MAX_DELAY_MS: u64 = 500;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache store backed by Redis hashes (`HGETALL` / `HSET`).
///
/// Holds a `ConnectionManager`, which multiplexes one connection across
/// callers and reconnects on failure. Cloning it is cheap.
pub struct RedisCache {
    conn: ConnectionManager,
    addr: String,
}

impl RedisCache {
    /// Connect to Redis and verify the connection with `PING`.
    pub async fn connect(
        host: &str,
        port: u16,
        db: i64,
        username: Option<String>,
        password: Option<String>,
    ) -> CacheResult<Self> {
        let addr = format!("{host}:{port}");
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db,
                username,
                password,
                ..Default::default()
            },
        };

        tracing::info!(addr = %addr, db = db, "Connecting to Redis");

        let client = ::redis::Client::open(info).map_err(|source| CacheError::Connect {
            addr: addr.clone(),
            source,
        })?;
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_max_delay(CONNECT_MAX_DELAY_MS)
            .set_connection_timeout(CONNECT_TIMEOUT);
        let conn = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|source| CacheError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let cache = Self { conn, addr };
        cache.ping().await?;
        Ok(cache)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    #[instrument(skip(self), fields(backend = "redis"))]
    async fn hash_get_all(&self, key: &str) -> CacheResult<Option<FieldMap>> {
        let mut conn = self.conn.clone();
        let fields: FieldMap = conn.hgetall(key).await?;
        // HGETALL on a missing key returns an empty map.
        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    #[instrument(skip(self, fields), fields(backend = "redis"))]
    async fn hash_set(&self, key: &str, fields: &FieldMap) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut conn = self.conn.clone();
        let _: () = conn.hset_multiple(key, items.as_slice()).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let reply: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::Unavailable(format!(
                "unexpected PING reply from {}: {reply}",
                self.addr
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
