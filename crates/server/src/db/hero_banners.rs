//! Hero banner repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::HeroBannerId;
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::{CatalogFilter, HeroBanner, HeroBannerPatch, NewHeroBanner, ReorderRequest};

/// Sort keys accepted by banner lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("sortOrder", "h.sort_order"),
        ("title", "h.title"),
        ("startsAt", "h.starts_at"),
        ("createdAt", "h.created_at"),
    ],
    default_column: "h.sort_order",
    default_order: SortOrder::Asc,
};

const SELECT_BANNER: &str = "SELECT h.id, h.title, h.subtitle, h.description, h.image_url, \
     h.mobile_image_url, h.button_text, h.button_link, h.sort_order, h.is_active, \
     h.starts_at, h.ends_at, h.created_at, h.updated_at \
     FROM hero_banner h";

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q CatalogFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.active {
        cond.eq("h.is_active", active);
    }
    if let Some(term) = &filter.search {
        cond.search(&["h.title", "h.subtitle"], term);
    }
}

/// Repository for hero banner database operations.
pub struct HeroBannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeroBannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &CatalogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<HeroBanner>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM hero_banner h");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(SELECT_BANNER);
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let banners = query.build_query_as::<HeroBanner>().fetch_all(self.pool).await?;

        Ok((banners, total))
    }

    /// Active banners whose schedule window contains `now`, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_live(&self, now: DateTime<Utc>) -> Result<Vec<HeroBanner>, RepositoryError> {
        let banners = sqlx::query_as::<_, HeroBanner>(&format!(
            "{SELECT_BANNER} WHERE h.is_active \
             AND (h.starts_at IS NULL OR h.starts_at <= $1) \
             AND (h.ends_at IS NULL OR h.ends_at > $1) \
             ORDER BY h.sort_order, h.id"
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(banners)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: HeroBannerId) -> Result<Option<HeroBanner>, RepositoryError> {
        let banner = sqlx::query_as::<_, HeroBanner>(&format!("{SELECT_BANNER} WHERE h.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(banner)
    }

    /// Without an explicit `sortOrder` the banner goes last.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewHeroBanner) -> Result<HeroBanner, RepositoryError> {
        let banner = sqlx::query_as::<_, HeroBanner>(
            "INSERT INTO hero_banner AS h (title, subtitle, description, image_url, \
             mobile_image_url, button_text, button_link, sort_order, is_active, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, \
                     COALESCE($8, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM hero_banner)), \
                     $9, $10, $11) \
             RETURNING h.id, h.title, h.subtitle, h.description, h.image_url, h.mobile_image_url, \
                       h.button_text, h.button_link, h.sort_order, h.is_active, h.starts_at, \
                       h.ends_at, h.created_at, h.updated_at",
        )
        .bind(new.title.trim())
        .bind(&new.subtitle)
        .bind(&new.description)
        .bind(&new.image_url)
        .bind(&new.mobile_image_url)
        .bind(&new.button_text)
        .bind(&new.button_link)
        .bind(new.sort_order)
        .bind(new.is_active)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .fetch_one(self.pool)
        .await?;
        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound`, or `RepositoryError::Invalid` if
    /// the merged banner breaks a cross-field rule.
    pub async fn update(
        &self,
        id: HeroBannerId,
        patch: HeroBannerPatch,
    ) -> Result<HeroBanner, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut banner = sqlx::query_as::<_, HeroBanner>(&format!(
            "{SELECT_BANNER} WHERE h.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut banner).map_err(RepositoryError::Invalid)?;

        sqlx::query(
            "UPDATE hero_banner SET title = $2, subtitle = $3, description = $4, image_url = $5, \
             mobile_image_url = $6, button_text = $7, button_link = $8, sort_order = $9, \
             is_active = $10, starts_at = $11, ends_at = $12, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&banner.title)
        .bind(&banner.subtitle)
        .bind(&banner.description)
        .bind(&banner.image_url)
        .bind(&banner.mobile_image_url)
        .bind(&banner.button_text)
        .bind(&banner.button_link)
        .bind(banner.sort_order)
        .bind(banner.is_active)
        .bind(banner.starts_at)
        .bind(banner.ends_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete(&self, id: HeroBannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM hero_banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Apply every `sortOrder` in one transaction; nothing changes if any id
    /// is unknown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if any banner does not exist.
    pub async fn reorder(&self, request: &ReorderRequest) -> Result<Vec<HeroBanner>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in &request.items {
            let result = sqlx::query(
                "UPDATE hero_banner SET sort_order = $2, updated_at = now() WHERE id = $1",
            )
            .bind(item.id)
            .bind(item.sort_order)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        let banners = sqlx::query_as::<_, HeroBanner>(&format!(
            "{SELECT_BANNER} ORDER BY h.sort_order, h.id"
        ))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(banners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_filter() {
        let filter = CatalogFilter {
            search: Some("winter".to_string()),
            active: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM hero_banner h");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM hero_banner h WHERE \
             (h.title ILIKE $1 ESCAPE '\\' OR h.subtitle ILIKE $2 ESCAPE '\\')"
        );
    }
}
