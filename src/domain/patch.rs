//! Partial-update payloads.
//!
//! Every attribute of a banner update is either absent (keep the stored value)
//! or present with a replacement value. Tag ids are replaced as a whole set.

use serde::{Deserialize, Deserializer};

use super::entities::{BannerRecord, normalize_tag_ids};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Present(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn apply(self, target: &mut T) {
        if let Self::Present(value) = self {
            *target = value;
        }
    }
}

/// A field that is missing from the payload deserializes through
/// `#[serde(default)]` as `Absent`; a field that is present always carries a value.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::Present)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub title: Patch<String>,
    pub text: Patch<String>,
    pub url: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerPatch {
    pub content: ContentPatch,
    pub feature_id: Patch<i64>,
    pub tag_ids: Patch<Vec<i64>>,
    pub is_active: Patch<bool>,
}

impl BannerPatch {
    pub fn is_empty(&self) -> bool {
        !(self.content.title.is_present()
            || self.content.text.is_present()
            || self.content.url.is_present()
            || self.feature_id.is_present()
            || self.tag_ids.is_present()
            || self.is_active.is_present())
    }

    /// Merge the patch into `record`, leaving absent fields untouched.
    pub fn apply_to(self, record: &mut BannerRecord) {
        let Self {
            content,
            feature_id,
            tag_ids,
            is_active,
        } = self;

        content.title.apply(&mut record.content.title);
        content.text.apply(&mut record.content.text);
        content.url.apply(&mut record.content.url);
        feature_id.apply(&mut record.feature_id);
        if let Patch::Present(tag_ids) = tag_ids {
            record.tag_ids = normalize_tag_ids(tag_ids);
        }
        is_active.apply(&mut record.is_active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::BannerContent;
    use serde::Deserialize;
    use time::OffsetDateTime;

    fn record() -> BannerRecord {
        BannerRecord {
            id: 1,
            content: BannerContent {
                title: "title".to_string(),
                text: "text".to_string(),
                url: "https://example.com".to_string(),
            },
            feature_id: 5,
            tag_ids: vec![1, 2],
            is_active: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default)]
        value: Patch<i64>,
    }

    #[test]
    fn missing_field_is_absent() {
        let probe: Probe = serde_json::from_str("{}").expect("parse");
        assert_eq!(probe.value, Patch::Absent);
    }

    #[test]
    fn present_field_carries_value() {
        let probe: Probe = serde_json::from_str(r#"{"value": 0}"#).expect("parse");
        assert_eq!(probe.value, Patch::Present(0));
    }

    #[test]
    fn null_is_rejected_for_non_optional_fields() {
        assert!(serde_json::from_str::<Probe>(r#"{"value": null}"#).is_err());
    }

    #[test]
    fn only_active_flag_changes() {
        let mut banner = record();
        let patch = BannerPatch {
            is_active: Patch::Present(true),
            ..Default::default()
        };

        patch.apply_to(&mut banner);

        let mut expected = record();
        expected.is_active = true;
        assert_eq!(banner, expected);
    }

    #[test]
    fn tag_ids_are_replaced_not_merged() {
        let mut banner = record();
        let patch = BannerPatch {
            tag_ids: Patch::Present(vec![4, 3, 4]),
            ..Default::default()
        };

        patch.apply_to(&mut banner);
        assert_eq!(banner.tag_ids, vec![3, 4]);
    }

    #[test]
    fn content_fields_apply_independently() {
        let mut banner = record();
        let patch = BannerPatch {
            content: ContentPatch {
                text: Patch::Present("new text".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        patch.apply_to(&mut banner);
        assert_eq!(banner.content.title, "title");
        assert_eq!(banner.content.text, "new text");
        assert_eq!(banner.content.url, "https://example.com");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(BannerPatch::default().is_empty());
        assert!(
            !BannerPatch {
                feature_id: Patch::Present(3),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
