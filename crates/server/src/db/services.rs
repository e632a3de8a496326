//! Workshop service and service-category repositories.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};
use tireshop_core::{ServiceCategoryId, ServiceId};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::service::ServiceFilter;
use crate::models::{
    CatalogFilter, CatalogRef, NewService, NewServiceCategory, Service, ServiceCategory,
    ServiceCategoryPatch, ServicePatch,
};

/// Sort keys accepted by service lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("name", "s.name"),
        ("basePrice", "s.base_price"),
        ("durationMinutes", "s.duration_minutes"),
        ("createdAt", "s.created_at"),
        ("updatedAt", "s.updated_at"),
    ],
    default_column: "s.name",
    default_order: SortOrder::Asc,
};

/// Sort keys accepted by service-category lists.
pub const CATEGORY_SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("name", "sc.name"),
        ("sortOrder", "sc.sort_order"),
        ("createdAt", "sc.created_at"),
    ],
    default_column: "sc.sort_order",
    default_order: SortOrder::Asc,
};

const FROM_SERVICE: &str =
    " FROM service s LEFT JOIN service_category sc ON sc.id = s.category_id";

const SERVICE_COLUMNS: &str = "SELECT s.id, s.name, s.slug, s.description, \
     s.short_description, s.base_price, s.hourly_rate, s.duration_minutes, s.features, \
     s.category_id, sc.name AS category_name, sc.slug AS category_slug, \
     s.is_active, s.is_featured, s.created_at, s.updated_at";

const SELECT_CATEGORY: &str = "SELECT sc.id, sc.name, sc.slug, sc.description, sc.icon, \
     sc.sort_order, sc.is_active, \
     (SELECT COUNT(*) FROM service s WHERE s.category_id = sc.id AND s.is_active) AS service_count, \
     sc.created_at, sc.updated_at \
     FROM service_category sc";

const SERVICE_CONFLICT: &str =
    "A service with this slug already exists, or the category does not exist";
const CATEGORY_CONFLICT: &str = "A service category with this slug already exists";

fn select_service() -> String {
    format!("{SERVICE_COLUMNS}{FROM_SERVICE}")
}

fn push_service_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q ServiceFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.active {
        cond.eq("s.is_active", active);
    }
    match &filter.category {
        Some(CatalogRef::Id(id)) => cond.eq("s.category_id", *id),
        Some(CatalogRef::Slug(slug)) => cond.eq("sc.slug", slug.as_str()),
        None => {}
    }
    if let Some(featured) = filter.featured {
        cond.eq("s.is_featured", featured);
    }
    if let Some(term) = &filter.search {
        cond.search(&["s.name", "s.short_description", "s.description"], term);
    }
}

fn push_category_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q CatalogFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.active {
        cond.eq("sc.is_active", active);
    }
    if let Some(term) = &filter.search {
        cond.search(&["sc.name", "sc.slug"], term);
    }
}

/// Repository for workshop services.
pub struct ServiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of services plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ServiceFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Service>, i64), RepositoryError> {
        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM_SERVICE}"));
        push_service_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(select_service());
        push_service_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let services = query.build_query_as::<Service>().fetch_all(self.pool).await?;

        Ok((services, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let service = sqlx::query_as::<_, Service>(&format!("{} WHERE s.id = $1", select_service()))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(service)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        active_only: bool,
    ) -> Result<Option<Service>, RepositoryError> {
        let service = sqlx::query_as::<_, Service>(&format!(
            "{} WHERE s.slug = $1 AND (s.is_active OR NOT $2)",
            select_service()
        ))
        .bind(slug)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;
        Ok(service)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    pub async fn create(&self, new: &NewService, slug: &str) -> Result<Service, RepositoryError> {
        let id: ServiceId = sqlx::query_scalar(
            "INSERT INTO service (name, slug, description, short_description, base_price, \
             hourly_rate, duration_minutes, features, category_id, is_active, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
        )
        .bind(new.name.trim())
        .bind(slug)
        .bind(&new.description)
        .bind(&new.short_description)
        .bind(new.base_price)
        .bind(new.hourly_rate)
        .bind(new.duration_minutes)
        .bind(&new.features)
        .bind(new.category_id)
        .bind(new.is_active)
        .bind(new.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, SERVICE_CONFLICT))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Lock the row, merge the patch, write every column back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the service does not exist, or
    /// `RepositoryError::Conflict` for a taken slug or missing category.
    pub async fn update(
        &self,
        id: ServiceId,
        patch: ServicePatch,
    ) -> Result<Service, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut service = sqlx::query_as::<_, Service>(&format!(
            "{} WHERE s.id = $1 FOR UPDATE OF s",
            select_service()
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut service);

        sqlx::query(
            "UPDATE service SET name = $2, slug = $3, description = $4, short_description = $5, \
             base_price = $6, hourly_rate = $7, duration_minutes = $8, features = $9, \
             category_id = $10, is_active = $11, is_featured = $12, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&service.name)
        .bind(&service.slug)
        .bind(&service.description)
        .bind(&service.short_description)
        .bind(service.base_price)
        .bind(service.hourly_rate)
        .bind(service.duration_minutes)
        .bind(&service.features)
        .bind(service.category_id)
        .bind(service.is_active)
        .bind(service.is_featured)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, SERVICE_CONFLICT))?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Appointments and quote lines that referenced the service keep their data.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the service does not exist.
    pub async fn delete(&self, id: ServiceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM service WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Repository for service categories.
pub struct ServiceCategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceCategoryRepository<'a> {
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
    ) -> Result<(Vec<ServiceCategory>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM service_category sc");
        push_category_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(SELECT_CATEGORY);
        push_category_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let categories = query
            .build_query_as::<ServiceCategory>()
            .fetch_all(self.pool)
            .await?;

        Ok((categories, total))
    }

    /// Every active category in display order (storefront menu).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<ServiceCategory>, RepositoryError> {
        let categories = sqlx::query_as::<_, ServiceCategory>(&format!(
            "{SELECT_CATEGORY} WHERE sc.is_active ORDER BY sc.sort_order, sc.name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: ServiceCategoryId,
    ) -> Result<Option<ServiceCategory>, RepositoryError> {
        let category =
            sqlx::query_as::<_, ServiceCategory>(&format!("{SELECT_CATEGORY} WHERE sc.id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        new: &NewServiceCategory,
        slug: &str,
    ) -> Result<ServiceCategory, RepositoryError> {
        let id: ServiceCategoryId = sqlx::query_scalar(
            "INSERT INTO service_category (name, slug, description, icon, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(new.name.trim())
        .bind(slug)
        .bind(&new.description)
        .bind(&new.icon)
        .bind(new.sort_order)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, CATEGORY_CONFLICT))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ServiceCategoryId,
        patch: ServiceCategoryPatch,
    ) -> Result<ServiceCategory, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut category = sqlx::query_as::<_, ServiceCategory>(&format!(
            "{SELECT_CATEGORY} WHERE sc.id = $1 FOR UPDATE OF sc"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut category);

        sqlx::query(
            "UPDATE service_category SET name = $2, slug = $3, description = $4, icon = $5, \
             sort_order = $6, is_active = $7, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(category.sort_order)
        .bind(category.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, CATEGORY_CONFLICT))?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Services in the category become uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: ServiceCategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM service_category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_slug_filter_uses_join() {
        let filter = ServiceFilter {
            search: None,
            category: Some(CatalogRef::Slug("maintenance".to_string())),
            featured: Some(true),
            active: Some(true),
        };
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){FROM_SERVICE}"));
        push_service_filters(&mut qb, &filter);
        assert!(qb.sql().ends_with(
            "WHERE s.is_active = $1 AND sc.slug = $2 AND s.is_featured = $3"
        ));
    }

    #[test]
    fn test_sort_columns() {
        assert_eq!(SORT_COLUMNS.resolve(Some("nope"), Some("desc")).to_sql(), "s.name DESC");
        assert_eq!(
            CATEGORY_SORT_COLUMNS.resolve(None, None).to_sql(),
            "sc.sort_order ASC"
        );
    }
}
