//! Category repository.
//!
//! Categories form a tree through `parent_id`. Updates reject a parent that
//! would create a cycle, and deletes are refused while children exist.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::CategoryId;
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::category::{CategoryFilter, ParentFilter};
use crate::models::{Category, CategoryPatch, NewCategory};

/// Advisory lock key taken by every parent change.
const TREE_MOVE_LOCK: i64 = 0x7469_7265_5f63_6174;

/// Sort keys accepted by category lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("name", "c.name"),
        ("sortOrder", "c.sort_order"),
        ("createdAt", "c.created_at"),
        ("updatedAt", "c.updated_at"),
    ],
    default_column: "c.sort_order",
    default_order: SortOrder::Asc,
};

const SELECT_CATEGORY: &str = "SELECT c.id, c.name, c.slug, c.description, c.image_url, \
     c.parent_id, c.sort_order, c.is_active, \
     (SELECT COUNT(*) FROM product p WHERE p.category_id = c.id AND p.is_active) AS product_count, \
     c.created_at, c.updated_at \
     FROM category c";

const SLUG_TAKEN: &str = "A category with this slug already exists or the parent does not exist";

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q CategoryFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.catalog.active {
        cond.eq("c.is_active", active);
    }
    match filter.parent {
        Some(ParentFilter::Root) => cond.raw("c.parent_id IS NULL"),
        Some(ParentFilter::Of(parent)) => cond.eq("c.parent_id", parent),
        None => {}
    }
    if let Some(term) = &filter.catalog.search {
        cond.search(&["c.name", "c.slug", "c.description"], term);
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of categories plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &CategoryFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Category>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM category c");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(SELECT_CATEGORY);
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let categories = query.build_query_as::<Category>().fetch_all(self.pool).await?;

        Ok((categories, total))
    }

    /// Every category in display order, for building the tree.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, active_only: bool) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE (c.is_active OR NOT $1) ORDER BY c.sort_order, c.name"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!("{SELECT_CATEGORY} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        active_only: bool,
    ) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE c.slug = $1 AND (c.is_active OR NOT $2)"
        ))
        .bind(slug)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Direct children of a category, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn children(
        &self,
        parent: CategoryId,
        active_only: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE c.parent_id = $1 AND (c.is_active OR NOT $2) \
             ORDER BY c.sort_order, c.name"
        ))
        .bind(parent)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the parent
    /// does not exist.
    pub async fn create(&self, new: &NewCategory, slug: &str) -> Result<Category, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            "INSERT INTO category (name, slug, description, image_url, parent_id, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(new.name.trim())
        .bind(slug)
        .bind(&new.description)
        .bind(&new.image_url)
        .bind(new.parent_id)
        .bind(new.sort_order)
        .bind(new.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, SLUG_TAKEN))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Lock, merge, reject cycles, write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist,
    /// `RepositoryError::Rejected` if the new parent is the category itself
    /// or one of its descendants, or `RepositoryError::Conflict` for a taken
    /// slug or missing parent.
    pub async fn update(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut category = sqlx::query_as::<_, Category>(&format!(
            "{SELECT_CATEGORY} WHERE c.id = $1 FOR UPDATE OF c"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let previous_parent = category.parent_id;
        patch.apply(&mut category);

        if let Some(parent) = category.parent_id
            && category.parent_id != previous_parent
        {
            // One re-parent at a time, so the walk below sees every
            // committed move (A under B racing B under A).
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(TREE_MOVE_LOCK)
                .execute(&mut *tx)
                .await?;

            // Walk up from the proposed parent; meeting `id` means a cycle.
            let creates_cycle: bool = sqlx::query_scalar(
                "WITH RECURSIVE ancestors(id, parent_id) AS ( \
                     SELECT id, parent_id FROM category WHERE id = $1 \
                     UNION \
                     SELECT c.id, c.parent_id FROM category c \
                     JOIN ancestors a ON c.id = a.parent_id \
                 ) \
                 SELECT EXISTS (SELECT 1 FROM ancestors WHERE id = $2)",
            )
            .bind(parent)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if creates_cycle {
                return Err(RepositoryError::Rejected(
                    "A category cannot be moved under itself or one of its subcategories"
                        .to_string(),
                ));
            }
        }

        sqlx::query(
            "UPDATE category SET name = $2, slug = $3, description = $4, image_url = $5, \
             parent_id = $6, sort_order = $7, is_active = $8, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.image_url)
        .bind(category.parent_id)
        .bind(category.sort_order)
        .bind(category.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, SLUG_TAKEN))?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a leaf category. Its products keep existing uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::Rejected` if it still has subcategories.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<CategoryId> =
            sqlx::query_scalar("SELECT id FROM category WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let has_children: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM category WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_children {
            return Err(RepositoryError::Rejected(
                "Cannot delete a category that has subcategories".to_string(),
            ));
        }

        sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::CatalogFilter;

    use super::*;

    #[test]
    fn test_root_filter_adds_no_bind() {
        let filter = CategoryFilter {
            catalog: CatalogFilter {
                search: None,
                active: Some(true),
            },
            parent: Some(ParentFilter::Root),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM category c");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM category c WHERE c.is_active = $1 AND c.parent_id IS NULL"
        );
    }

    #[test]
    fn test_default_sort_is_display_order() {
        assert_eq!(SORT_COLUMNS.resolve(None, None).to_sql(), "c.sort_order ASC");
    }
}
