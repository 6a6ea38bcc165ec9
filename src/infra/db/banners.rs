use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;

use crate::application::repos::{
    BannerListFilter, BannersRepo, CreateBannerParams, RepoError, UpdateBannerParams,
};
use crate::domain::entities::{BannerContent, BannerRecord};

use super::filter::FilterPlan;
use super::{PostgresRepositories, map_sqlx_error};

const BANNER_SELECT: &str = "SELECT b.id, b.title, b.banner_data, b.url, b.feature_id, \
    b.is_active, b.create_time, b.update_time, \
    COALESCE(array_agg(bt.tag_id ORDER BY bt.tag_id) FILTER (WHERE bt.tag_id IS NOT NULL), '{}') AS tag_ids \
    FROM banner b \
    LEFT JOIN banner_tag bt ON bt.banner_id = b.id";

#[derive(Debug, FromRow)]
struct BannerRow {
    id: i64,
    title: String,
    banner_data: String,
    url: String,
    feature_id: i64,
    is_active: bool,
    create_time: OffsetDateTime,
    update_time: OffsetDateTime,
    tag_ids: Vec<i64>,
}

impl From<BannerRow> for BannerRecord {
    fn from(row: BannerRow) -> Self {
        Self {
            id: row.id,
            content: BannerContent {
                title: row.title,
                text: row.banner_data,
                url: row.url,
            },
            feature_id: row.feature_id,
            tag_ids: row.tag_ids,
            is_active: row.is_active,
            created_at: row.create_time,
            updated_at: row.update_time,
        }
    }
}

#[derive(Debug, FromRow)]
struct ContentRow {
    title: String,
    banner_data: String,
    url: String,
}

impl From<ContentRow> for BannerContent {
    fn from(row: ContentRow) -> Self {
        Self {
            title: row.title,
            text: row.banner_data,
            url: row.url,
        }
    }
}

async fn insert_associations(
    tx: &mut Transaction<'_, Postgres>,
    banner_id: i64,
    feature_id: i64,
    tag_ids: &[i64],
) -> Result<(), RepoError> {
    for &tag_id in tag_ids {
        sqlx::query("INSERT INTO banner_tag (banner_id, tag_id, feature_id) VALUES ($1, $2, $3)")
            .bind(banner_id)
            .bind(tag_id)
            .bind(feature_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

#[async_trait]
impl BannersRepo for PostgresRepositories {
    async fn create_banner(&self, params: CreateBannerParams) -> Result<i64, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO banner (title, feature_id, banner_data, url, create_time, update_time, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&params.content.title)
        .bind(params.feature_id)
        .bind(&params.content.text)
        .bind(&params.content.url)
        .bind(params.created_at)
        .bind(params.updated_at)
        .bind(params.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        insert_associations(&mut tx, id, params.feature_id, &params.tag_ids).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn find_banner(&self, id: i64) -> Result<BannerRecord, RepoError> {
        let sql = format!("{BANNER_SELECT} WHERE b.id = $1 GROUP BY b.id");
        let row = sqlx::query_as::<_, BannerRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BannerRecord::from).ok_or(RepoError::NotFound)
    }

    async fn update_banner(&self, id: i64, params: UpdateBannerParams) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE banner
            SET title = $2, banner_data = $3, url = $4, feature_id = $5, is_active = $6, update_time = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&params.content.title)
        .bind(&params.content.text)
        .bind(&params.content.url)
        .bind(params.feature_id)
        .bind(params.is_active)
        .bind(params.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query("DELETE FROM banner_tag WHERE banner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        insert_associations(&mut tx, id, params.feature_id, &params.tag_ids).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_banner(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM banner_tag WHERE banner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM banner WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_active_content(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<BannerContent, RepoError> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT b.title, b.banner_data, b.url
            FROM banner_tag bt
            JOIN banner b ON b.id = bt.banner_id
            WHERE bt.feature_id = $1 AND bt.tag_id = $2 AND b.is_active
            LIMIT 1
            "#,
        )
        .bind(feature_id)
        .bind(tag_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(BannerContent::from).ok_or(RepoError::NotFound)
    }

    async fn list_banners(
        &self,
        filter: BannerListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BannerRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BANNER_SELECT);
        qb.push(" WHERE TRUE");
        FilterPlan::from(filter).push_predicates(&mut qb);
        qb.push(" GROUP BY b.id ORDER BY b.id LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<BannerRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BannerRecord::from).collect())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
