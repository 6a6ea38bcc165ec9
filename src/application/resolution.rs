//! End-user banner resolution with cache-aside reads.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::cache::{BannerCache, BannerKey, CacheError};
use crate::application::repos::{BannersRepo, RepoError, with_deadline};
use crate::domain::entities::BannerContent;

const TARGET: &str = "vitrine::resolution";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no active banner for feature {feature_id} and tag {tag_id}")]
    NotFound { feature_id: i64, tag_id: i64 },
    #[error(transparent)]
    Repo(RepoError),
}

#[derive(Debug, Clone, Copy)]
pub struct ResolutionSettings {
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_timeout: Duration::from_millis(250),
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct ResolutionService {
    repo: Arc<dyn BannersRepo>,
    cache: Arc<dyn BannerCache>,
    settings: ResolutionSettings,
}

impl ResolutionService {
    pub fn new(
        repo: Arc<dyn BannersRepo>,
        cache: Arc<dyn BannerCache>,
        settings: ResolutionSettings,
    ) -> Self {
        Self {
            repo,
            cache,
            settings,
        }
    }

    /// Resolve the active banner content for `(feature_id, tag_id)`.
    ///
    /// With `use_last_revision` the cached copy is skipped and the store of
    /// record is read; the fresh value then replaces the cached one.
    pub async fn resolve(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_last_revision: bool,
    ) -> Result<BannerContent, ResolutionError> {
        let key = BannerKey::new(feature_id, tag_id);

        if !use_last_revision && let Some(content) = self.read_cache(key).await {
            return Ok(content);
        }

        counter!("vitrine_store_read_total").increment(1);
        let content = with_deadline(
            self.settings.store_timeout,
            self.repo.find_active_content(feature_id, tag_id),
        )
        .await
        .map_err(|err| match err {
            RepoError::NotFound => ResolutionError::NotFound { feature_id, tag_id },
            other => ResolutionError::Repo(other),
        })?;

        self.write_cache(key, &content).await;
        Ok(content)
    }

    async fn read_cache(&self, key: BannerKey) -> Option<BannerContent> {
        let lookup = tokio::time::timeout(self.settings.cache_timeout, self.cache.get(key))
            .await
            .unwrap_or(Err(CacheError::Timeout));

        match lookup {
            Ok(Some(content)) => {
                counter!("vitrine_cache_hit_total").increment(1);
                Some(content)
            }
            Ok(None) => {
                counter!("vitrine_cache_miss_total").increment(1);
                debug!(target = TARGET, key = %key, "cache miss");
                None
            }
            Err(err) => {
                counter!("vitrine_cache_miss_total").increment(1);
                warn!(
                    target = TARGET,
                    key = %key,
                    error = %err,
                    "cache read failed; falling back to store"
                );
                None
            }
        }
    }

    /// Populate the cache before answering. The write is bounded by the cache
    /// deadline and a failure only costs the next reader a store read.
    async fn write_cache(&self, key: BannerKey, content: &BannerContent) {
        let write = tokio::time::timeout(
            self.settings.cache_timeout,
            self.cache.put(key, content, self.settings.cache_ttl),
        )
        .await
        .unwrap_or(Err(CacheError::Timeout));

        if let Err(err) = write {
            counter!("vitrine_cache_write_failure_total").increment(1);
            warn!(
                target = TARGET,
                key = %key,
                error = %err,
                "failed to populate banner cache"
            );
        }
    }
}
