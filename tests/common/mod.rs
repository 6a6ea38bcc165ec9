#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use vitrine::application::repos::{
    BannerListFilter, BannersRepo, CreateBannerParams, RepoError, UpdateBannerParams,
};
use vitrine::domain::entities::{BannerContent, BannerRecord};

/// In-memory store of record that counts end-user content reads.
#[derive(Default)]
pub struct CountingRepo {
    banners: Mutex<BTreeMap<i64, BannerRecord>>,
    content_reads: AtomicUsize,
    read_delay: Option<Duration>,
    fail_reads: bool,
}

impl CountingRepo {
    pub fn with_read_delay(delay: Duration) -> Self {
        Self {
            read_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub fn content_reads(&self) -> usize {
        self.content_reads.load(Ordering::SeqCst)
    }

    pub async fn seed(
        &self,
        feature_id: i64,
        tag_ids: &[i64],
        is_active: bool,
        content: BannerContent,
    ) -> i64 {
        let now = OffsetDateTime::now_utc();
        self.create_banner(CreateBannerParams {
            content,
            feature_id,
            tag_ids: tag_ids.to_vec(),
            is_active,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed banner")
    }

    pub async fn set_content(&self, id: i64, content: BannerContent) {
        let mut banners = self.banners.lock().await;
        let banner = banners.get_mut(&id).expect("seeded banner");
        banner.content = content;
    }
}

#[async_trait]
impl BannersRepo for CountingRepo {
    async fn create_banner(&self, params: CreateBannerParams) -> Result<i64, RepoError> {
        let mut banners = self.banners.lock().await;
        let taken = banners.values().any(|banner| {
            banner.feature_id == params.feature_id
                && banner.tag_ids.iter().any(|tag| params.tag_ids.contains(tag))
        });
        if taken {
            return Err(RepoError::Duplicate {
                constraint: "banner_tag_feature_tag_key".to_string(),
            });
        }

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

    async fn update_banner(&self, id: i64, params: UpdateBannerParams) -> Result<(), RepoError> {
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
        feature_id: i64,
        tag_id: i64,
    ) -> Result<BannerContent, RepoError> {
        self.content_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads {
            return Err(RepoError::from_persistence("connection reset by peer"));
        }

        self.banners
            .lock()
            .await
            .values()
            .find(|banner| {
                banner.is_active && banner.feature_id == feature_id && banner.tag_ids.contains(&tag_id)
            })
            .map(|banner| banner.content.clone())
            .ok_or(RepoError::NotFound)
    }

    async fn list_banners(
        &self,
        filter: BannerListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BannerRecord>, RepoError> {
        Ok(self
            .banners
            .lock()
            .await
            .values()
            .filter(|banner| filter.feature_id.is_none_or(|id| banner.feature_id == id))
            .filter(|banner| filter.tag_id.is_none_or(|id| banner.tag_ids.contains(&id)))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub fn content(title: &str) -> BannerContent {
    BannerContent {
        title: title.to_string(),
        text: format!("{title} body"),
        url: format!("https://example.com/{title}"),
    }
}
