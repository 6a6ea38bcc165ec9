//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The payload served to end users and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerContent {
    pub title: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerRecord {
    pub id: i64,
    pub content: BannerContent,
    pub feature_id: i64,
    pub tag_ids: Vec<i64>,
    pub is_active: bool,
    #[serde(rename = "create_time", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "update_time", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Sort and deduplicate a tag id list so it behaves as a set.
pub fn normalize_tag_ids(mut tag_ids: Vec<i64>) -> Vec<i64> {
    tag_ids.sort_unstable();
    tag_ids.dedup();
    tag_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn normalize_tag_ids_sorts_and_dedups() {
        assert_eq!(normalize_tag_ids(vec![4, 1, 4, 3, 1]), vec![1, 3, 4]);
        assert!(normalize_tag_ids(Vec::new()).is_empty());
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = BannerRecord {
            id: 7,
            content: BannerContent {
                title: "Spring sale".to_string(),
                text: "Everything must go".to_string(),
                url: "https://example.com/sale".to_string(),
            },
            feature_id: 2,
            tag_ids: vec![1, 3],
            is_active: true,
            created_at: datetime!(2024-04-01 12:00 UTC),
            updated_at: datetime!(2024-04-02 08:30 UTC),
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["content"]["text"], "Everything must go");
        assert_eq!(value["tag_ids"], serde_json::json!([1, 3]));
        assert_eq!(value["create_time"], "2024-04-01T12:00:00Z");
        assert_eq!(value["update_time"], "2024-04-02T08:30:00Z");
        assert!(value.get("created_at").is_none());
    }
}
