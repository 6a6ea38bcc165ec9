use serde::Deserialize;

use crate::application::banners::CreateBannerCommand;
use crate::domain::entities::BannerContent;
use crate::domain::patch::{BannerPatch, ContentPatch, Patch};

#[derive(Debug, Deserialize)]
pub struct BannerCreateRequest {
    pub content: BannerContent,
    pub feature_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub is_active: bool,
}

impl From<BannerCreateRequest> for CreateBannerCommand {
    fn from(request: BannerCreateRequest) -> Self {
        Self {
            content: request.content,
            feature_id: request.feature_id,
            tag_ids: request.tag_ids,
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContentPatchRequest {
    pub title: Patch<String>,
    pub text: Patch<String>,
    pub url: Patch<String>,
}

/// Every field is optional; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BannerPatchRequest {
    pub content: ContentPatchRequest,
    pub feature_id: Patch<i64>,
    pub tag_ids: Patch<Vec<i64>>,
    pub is_active: Patch<bool>,
}

impl From<BannerPatchRequest> for BannerPatch {
    fn from(request: BannerPatchRequest) -> Self {
        Self {
            content: ContentPatch {
                title: request.content.title,
                text: request.content.text,
                url: request.content.url,
            },
            feature_id: request.feature_id,
            tag_ids: request.tag_ids,
            is_active: request.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserBannerQuery {
    pub feature_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub use_last_revision: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BannerListQuery {
    pub feature_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lenient boolean flag: unrecognised values read as `false`.
pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "t" | "true" | "yes" | "on")
    )
}
