//! Redis-backed banner cache. Values are the JSON form of `BannerContent`
//! stored under `"<feature>:<tag>"` with a per-key expiry.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::application::cache::{BannerCache, BannerKey, CacheError};
use crate::domain::entities::BannerContent;
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct RedisBannerCache {
    connection: ConnectionManager,
}

impl RedisBannerCache {
    /// Connect once at startup; the manager reconnects on its own afterwards.
    pub async fn connect(url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(url)
            .map_err(|err| InfraError::cache(format!("invalid cache url: {err}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| InfraError::cache(format!("failed to connect to cache: {err}")))?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl BannerCache for RedisBannerCache {
    async fn get(&self, key: BannerKey) -> Result<Option<BannerContent>, CacheError> {
        let mut connection = self.connection.clone();
        let payload: Option<String> = connection
            .get(key.to_string())
            .await
            .map_err(CacheError::unavailable)?;

        payload
            .map(|raw| serde_json::from_str(&raw).map_err(CacheError::codec))
            .transpose()
    }

    async fn put(
        &self,
        key: BannerKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(content).map_err(CacheError::codec)?;
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key.to_string(), payload, ttl.as_secs().max(1))
            .await
            .map_err(CacheError::unavailable)
    }
}
