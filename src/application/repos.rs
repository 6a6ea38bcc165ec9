//! Repository traits describing persistence adapters.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{BannerContent, BannerRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Run a store call under `deadline`. On expiry the call is dropped, which
/// abandons the in-flight statement.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(RepoError::Timeout),
    }
}

/// Optional listing selectors. `None` leaves the dimension unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BannerListFilter {
    pub feature_id: Option<i64>,
    pub tag_id: Option<i64>,
}

impl BannerListFilter {
    /// Build a filter from boundary values where `0` means "unset".
    pub fn from_sentinels(feature_id: i64, tag_id: i64) -> Self {
        Self {
            feature_id: (feature_id != 0).then_some(feature_id),
            tag_id: (tag_id != 0).then_some(tag_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBannerParams {
    pub content: BannerContent,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateBannerParams {
    pub content: BannerContent,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub is_active: bool,
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait BannersRepo: Send + Sync {
    /// Insert the banner and one association per tag id in one transaction.
    async fn create_banner(&self, params: CreateBannerParams) -> Result<i64, RepoError>;

    async fn find_banner(&self, id: i64) -> Result<BannerRecord, RepoError>;

    /// Rewrite the banner row and replace its whole association set.
    async fn update_banner(&self, id: i64, params: UpdateBannerParams) -> Result<(), RepoError>;

    async fn delete_banner(&self, id: i64) -> Result<(), RepoError>;

    /// Content of the active banner bound to `(feature_id, tag_id)`.
    async fn find_active_content(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<BannerContent, RepoError>;

    async fn list_banners(
        &self,
        filter: BannerListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BannerRecord>, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_selectors_are_unset() {
        assert_eq!(
            BannerListFilter::from_sentinels(0, 0),
            BannerListFilter::default()
        );
        assert_eq!(
            BannerListFilter::from_sentinels(5, 0),
            BannerListFilter {
                feature_id: Some(5),
                tag_id: None
            }
        );
        assert_eq!(
            BannerListFilter::from_sentinels(0, 7),
            BannerListFilter {
                feature_id: None,
                tag_id: Some(7)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_maps_to_timeout() {
        let result: Result<(), RepoError> = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(RepoError::Timeout)));
    }
}
