//! Brand repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::BrandId;
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::{Brand, BrandPatch, CatalogFilter, NewBrand};

/// Sort keys accepted by brand lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("name", "b.name"),
        ("slug", "b.slug"),
        ("createdAt", "b.created_at"),
        ("updatedAt", "b.updated_at"),
        ("productCount", "product_count"),
    ],
    default_column: "b.name",
    default_order: SortOrder::Asc,
};

const SELECT_BRAND: &str = "SELECT b.id, b.name, b.slug, b.description, b.logo_url, \
     b.website_url, b.is_active, \
     (SELECT COUNT(*) FROM product p WHERE p.brand_id = b.id AND p.is_active) AS product_count, \
     b.created_at, b.updated_at \
     FROM brand b";

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q CatalogFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.active {
        cond.eq("b.is_active", active);
    }
    if let Some(term) = &filter.search {
        cond.search(&["b.name", "b.slug", "b.description"], term);
    }
}

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of brands plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &CatalogFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Brand>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM brand b");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(SELECT_BRAND);
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let brands = query.build_query_as::<Brand>().fetch_all(self.pool).await?;

        Ok((brands, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!("{SELECT_BRAND} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(brand)
    }

    /// Look up by slug; `active_only` hides inactive brands from the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        active_only: bool,
    ) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "{SELECT_BRAND} WHERE b.slug = $1 AND (b.is_active OR NOT $2)"
        ))
        .bind(slug)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;
        Ok(brand)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, new: &NewBrand, slug: &str) -> Result<Brand, RepositoryError> {
        let id: BrandId = sqlx::query_scalar(
            "INSERT INTO brand (name, slug, description, logo_url, website_url, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(new.name.trim())
        .bind(slug)
        .bind(&new.description)
        .bind(&new.logo_url)
        .bind(&new.website_url)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "A brand with this slug already exists"))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Lock the row, merge the patch, write every column back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(&self, id: BrandId, patch: BrandPatch) -> Result<Brand, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut brand = sqlx::query_as::<_, Brand>(&format!(
            "{SELECT_BRAND} WHERE b.id = $1 FOR UPDATE OF b"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut brand);

        sqlx::query(
            "UPDATE brand SET name = $2, slug = $3, description = $4, logo_url = $5, \
             website_url = $6, is_active = $7, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&brand.name)
        .bind(&brand.slug)
        .bind(&brand.description)
        .bind(&brand.logo_url)
        .bind(&brand.website_url)
        .bind(brand.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "A brand with this slug already exists"))?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Products of the brand keep existing with no brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    pub async fn delete(&self, id: BrandId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM brand WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
