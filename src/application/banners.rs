use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{
    BannerListFilter, BannersRepo, CreateBannerParams, RepoError, UpdateBannerParams,
    with_deadline,
};
use crate::domain::entities::{BannerContent, BannerRecord, normalize_tag_ids};
use crate::domain::error::{DomainError, ensure_valid_id};
use crate::domain::patch::BannerPatch;

const TARGET: &str = "vitrine::banners";

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum AdminBannerError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("banner not found")]
    NotFound,
    #[error("banner update could not be written: {0}")]
    WriteFailed(RepoError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateBannerCommand {
    pub content: BannerContent,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ListingSettings {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

#[derive(Clone)]
pub struct AdminBannerService {
    repo: Arc<dyn BannersRepo>,
    listing: ListingSettings,
    store_timeout: Duration,
}

impl AdminBannerService {
    pub fn new(
        repo: Arc<dyn BannersRepo>,
        listing: ListingSettings,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            listing,
            store_timeout,
        }
    }

    pub async fn create_banner(
        &self,
        command: CreateBannerCommand,
    ) -> Result<BannerRecord, AdminBannerError> {
        let CreateBannerCommand {
            content,
            feature_id,
            tag_ids,
            is_active,
        } = command;

        ensure_valid_id(feature_id, "feature_id")?;
        let tag_ids = normalize_tag_ids(tag_ids);
        for tag_id in &tag_ids {
            ensure_valid_id(*tag_id, "tag_ids")?;
        }

        let now = OffsetDateTime::now_utc();
        let params = CreateBannerParams {
            content: content.clone(),
            feature_id,
            tag_ids: tag_ids.clone(),
            is_active,
            created_at: now,
            updated_at: now,
        };

        let id = with_deadline(self.store_timeout, self.repo.create_banner(params)).await?;
        info!(
            target = TARGET,
            banner_id = id,
            feature_id,
            tags = tag_ids.len(),
            "banner created"
        );

        Ok(BannerRecord {
            id,
            content,
            feature_id,
            tag_ids,
            is_active,
            created_at: now,
            updated_at: now,
        })
    }

    /// List banners for the admin surface. A zero `limit` selects the default
    /// page size; zero selectors leave that dimension unconstrained.
    pub async fn list_banners(
        &self,
        feature_id: i64,
        tag_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BannerRecord>, AdminBannerError> {
        let limit = if limit <= 0 {
            self.listing.default_limit
        } else {
            limit.min(self.listing.max_limit)
        };
        let offset = offset.max(0);
        let filter = BannerListFilter::from_sentinels(feature_id, tag_id);

        with_deadline(
            self.store_timeout,
            self.repo.list_banners(filter, limit, offset),
        )
        .await
        .map_err(AdminBannerError::from)
    }

    pub async fn update_banner(&self, id: i64, patch: BannerPatch) -> Result<(), AdminBannerError> {
        if let Some(feature_id) = patch.feature_id.as_present() {
            ensure_valid_id(*feature_id, "feature_id")?;
        }
        if let Some(tag_ids) = patch.tag_ids.as_present() {
            for tag_id in tag_ids {
                ensure_valid_id(*tag_id, "tag_ids")?;
            }
        }

        let mut banner = match with_deadline(self.store_timeout, self.repo.find_banner(id)).await
        {
            Ok(banner) => banner,
            Err(RepoError::NotFound) => return Err(AdminBannerError::NotFound),
            Err(err) => return Err(AdminBannerError::Repo(err)),
        };

        patch.apply_to(&mut banner);

        let params = UpdateBannerParams {
            content: banner.content,
            feature_id: banner.feature_id,
            tag_ids: banner.tag_ids,
            is_active: banner.is_active,
            updated_at: OffsetDateTime::now_utc(),
        };

        match with_deadline(self.store_timeout, self.repo.update_banner(id, params)).await {
            Ok(()) => {
                info!(target = TARGET, banner_id = id, "banner updated");
                Ok(())
            }
            Err(err) => {
                warn!(
                    target = TARGET,
                    banner_id = id,
                    error = %err,
                    "banner update failed after read"
                );
                Err(AdminBannerError::WriteFailed(err))
            }
        }
    }

    pub async fn delete_banner(&self, id: i64) -> Result<(), AdminBannerError> {
        match with_deadline(self.store_timeout, self.repo.delete_banner(id)).await {
            Ok(()) => {
                info!(target = TARGET, banner_id = id, "banner deleted");
                Ok(())
            }
            Err(RepoError::NotFound) => Err(AdminBannerError::NotFound),
            Err(err) => Err(AdminBannerError::Repo(err)),
        }
    }

    pub async fn health_check(&self) -> Result<(), RepoError> {
        with_deadline(self.store_timeout, self.repo.health_check()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::domain::patch::{ContentPatch, Patch};

    #[derive(Default)]
    struct MemoryRepo {
        banners: Mutex<BTreeMap<i64, BannerRecord>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl BannersRepo for MemoryRepo {
        async fn create_banner(&self, params: CreateBannerParams) -> Result<i64, RepoError> {
            let mut banners = self.banners.lock().await;
            let id = banners.keys().next_back().copied().unwrap_or(0) + 1;
            banners.insert(
                id,
                BannerRecord {
                    id,
                    content: params.content,
                    feature_id: params.feature_id,
                    tag_ids: params.tag_ids,
                    is_active: params.is_active,
                    created_at: params.created_at,
                    updated_at: params.updated_at,
                },
            );
            Ok(id)
        }

        async fn find_banner(&self, id: i64) -> Result<BannerRecord, RepoError> {
            self.banners
                .lock()
                .await
                .get(&id)
                .cloned()
                .ok_or(RepoError::NotFound)
        }

        async fn update_banner(
            &self,
            id: i64,
            params: UpdateBannerParams,
        ) -> Result<(), RepoError> {
            if self.fail_writes {
                return Err(RepoError::from_persistence("connection reset"));
            }
            let mut banners = self.banners.lock().await;
            let banner = banners.get_mut(&id).ok_or(RepoError::NotFound)?;
            banner.content = params.content;
            banner.feature_id = params.feature_id;
            banner.tag_ids = params.tag_ids;
            banner.is_active = params.is_active;
            banner.updated_at = params.updated_at;
            Ok(())
        }

        async fn delete_banner(&self, id: i64) -> Result<(), RepoError> {
            self.banners
                .lock()
                .await
                .remove(&id)
                .map(|_| ())
                .ok_or(RepoError::NotFound)
        }

        async fn find_active_content(
            &self,
            _feature_id: i64,
            _tag_id: i64,
        ) -> Result<BannerContent, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn list_banners(
            &self,
            _filter: BannerListFilter,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<BannerRecord>, RepoError> {
            Ok(self
                .banners
                .lock()
                .await
                .values()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn health_check(&self) -> Result<(), RepoError> {
            Ok(())
        }
    }

    fn service(repo: Arc<MemoryRepo>) -> AdminBannerService {
        AdminBannerService::new(repo, ListingSettings::default(), Duration::from_secs(1))
    }

    fn command(feature_id: i64, tag_ids: Vec<i64>) -> CreateBannerCommand {
        CreateBannerCommand {
            content: BannerContent {
                title: "Title".to_string(),
                text: "Body".to_string(),
                url: "https://example.com".to_string(),
            },
            feature_id,
            tag_ids,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn create_returns_assembled_record() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());

        let created = service
            .create_banner(command(5, vec![2, 1, 2]))
            .await
            .expect("create");

        assert_eq!(created.id, 1);
        assert_eq!(created.tag_ids, vec![1, 2]);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(repo.find_banner(1).await.expect("stored"), created);
    }

    #[tokio::test]
    async fn create_rejects_reserved_zero_ids() {
        let service = service(Arc::new(MemoryRepo::default()));

        let err = service
            .create_banner(command(0, vec![1]))
            .await
            .expect_err("feature 0 is reserved");
        assert!(matches!(err, AdminBannerError::Invalid(_)));

        let err = service
            .create_banner(command(3, vec![1, 0]))
            .await
            .expect_err("tag 0 is reserved");
        assert!(matches!(err, AdminBannerError::Invalid(_)));
    }

    #[tokio::test]
    async fn update_of_active_flag_keeps_other_fields() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let created = service
            .create_banner(command(5, vec![1, 2]))
            .await
            .expect("create");

        service
            .update_banner(
                created.id,
                BannerPatch {
                    is_active: Patch::Present(false),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        let stored = repo.find_banner(created.id).await.expect("stored");
        assert!(!stored.is_active);
        assert_eq!(stored.content, created.content);
        assert_eq!(stored.feature_id, 5);
        assert_eq!(stored.tag_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn update_replaces_tags_and_content_fields() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let created = service
            .create_banner(command(5, vec![1, 2]))
            .await
            .expect("create");

        service
            .update_banner(
                created.id,
                BannerPatch {
                    content: ContentPatch {
                        url: Patch::Present("https://example.com/new".to_string()),
                        ..Default::default()
                    },
                    tag_ids: Patch::Present(vec![3, 4]),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        let stored = repo.find_banner(created.id).await.expect("stored");
        assert_eq!(stored.tag_ids, vec![3, 4]);
        assert_eq!(stored.content.url, "https://example.com/new");
        assert_eq!(stored.content.text, "Body");
    }

    #[tokio::test]
    async fn update_of_missing_banner_is_not_found() {
        let service = service(Arc::new(MemoryRepo::default()));

        let err = service
            .update_banner(42, BannerPatch::default())
            .await
            .expect_err("missing");
        assert!(matches!(err, AdminBannerError::NotFound));
    }

    #[tokio::test]
    async fn write_failure_after_read_is_distinct_from_not_found() {
        let repo = Arc::new(MemoryRepo {
            fail_writes: true,
            ..Default::default()
        });
        let service = service(repo.clone());
        let created = service
            .create_banner(command(5, vec![1]))
            .await
            .expect("create");

        let err = service
            .update_banner(
                created.id,
                BannerPatch {
                    is_active: Patch::Present(false),
                    ..Default::default()
                },
            )
            .await
            .expect_err("write fails");
        assert!(matches!(err, AdminBannerError::WriteFailed(_)));
    }

    #[tokio::test]
    async fn delete_surfaces_not_found() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        let created = service
            .create_banner(command(5, vec![1]))
            .await
            .expect("create");

        service.delete_banner(created.id).await.expect("delete");
        let err = service
            .delete_banner(created.id)
            .await
            .expect_err("already gone");
        assert!(matches!(err, AdminBannerError::NotFound));
    }

    #[tokio::test]
    async fn zero_limit_uses_default_page_and_large_limits_clamp() {
        let repo = Arc::new(MemoryRepo::default());
        let service = service(repo.clone());
        for _ in 0..12 {
            service
                .create_banner(command(5, Vec::new()))
                .await
                .expect("create");
        }

        let page = service.list_banners(0, 0, 0, 0).await.expect("list");
        assert_eq!(page.len(), DEFAULT_PAGE_LIMIT as usize);

        let page = service.list_banners(0, 0, 1000, 10).await.expect("list");
        assert_eq!(page.len(), 2);
    }
}
