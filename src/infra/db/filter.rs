//! Predicate planning for the admin banner listing.

use sqlx::{Postgres, QueryBuilder};

use crate::application::repos::BannerListFilter;

/// One of the four selector combinations of a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPlan {
    FeatureAndTag { feature_id: i64, tag_id: i64 },
    Feature { feature_id: i64 },
    Tag { tag_id: i64 },
    Unconstrained,
}

impl From<BannerListFilter> for FilterPlan {
    fn from(filter: BannerListFilter) -> Self {
        match (filter.feature_id, filter.tag_id) {
            (Some(feature_id), Some(tag_id)) => Self::FeatureAndTag { feature_id, tag_id },
            (Some(feature_id), None) => Self::Feature { feature_id },
            (None, Some(tag_id)) => Self::Tag { tag_id },
            (None, None) => Self::Unconstrained,
        }
    }
}

impl FilterPlan {
    /// Append the plan's predicates to a query whose `WHERE` clause is already
    /// open and whose banner table is aliased `b`.
    pub fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match *self {
            Self::FeatureAndTag { feature_id, tag_id } => {
                push_feature(qb, feature_id);
                push_tag(qb, tag_id);
            }
            Self::Feature { feature_id } => push_feature(qb, feature_id),
            Self::Tag { tag_id } => push_tag(qb, tag_id),
            Self::Unconstrained => {}
        }
    }
}

fn push_feature(qb: &mut QueryBuilder<'_, Postgres>, feature_id: i64) {
    qb.push(" AND b.feature_id = ");
    qb.push_bind(feature_id);
}

// EXISTS keeps the outer tag aggregate intact: every listed banner still
// reports its whole tag set.
fn push_tag(qb: &mut QueryBuilder<'_, Postgres>, tag_id: i64) {
    qb.push(
        " AND EXISTS (SELECT 1 FROM banner_tag ft WHERE ft.banner_id = b.id AND ft.tag_id = ",
    );
    qb.push_bind(tag_id);
    qb.push(")");
}
