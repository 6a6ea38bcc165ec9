//! Cache port for resolved banner content.
//!
//! The cache is never authoritative. Every failure here is recoverable by
//! reading the store of record.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::BannerContent;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cached payload could not be decoded: {0}")]
    Codec(String),
}

impl CacheError {
    pub fn unavailable(err: impl fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn codec(err: impl fmt::Display) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Cache key for one `(feature, tag)` resolution, rendered as `"<feature>:<tag>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BannerKey {
    pub feature_id: i64,
    pub tag_id: i64,
}

impl BannerKey {
    pub fn new(feature_id: i64, tag_id: i64) -> Self {
        Self { feature_id, tag_id }
    }
}

impl fmt::Display for BannerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feature_id, self.tag_id)
    }
}

#[async_trait]
pub trait BannerCache: Send + Sync {
    /// `Ok(None)` is a plain miss.
    async fn get(&self, key: BannerKey) -> Result<Option<BannerContent>, CacheError>;

    async fn put(
        &self,
        key: BannerKey,
        content: &BannerContent,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}
