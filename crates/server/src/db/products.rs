//! Product repository.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::ProductId;
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::product::{ProductFilter, StockLevel};
use crate::models::{CatalogRef, NewProduct, Product, ProductPatch};

/// Sort keys accepted by product lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("name", "p.name"),
        ("price", "p.price"),
        ("sku", "p.sku"),
        ("stockQuantity", "p.stock_quantity"),
        ("createdAt", "p.created_at"),
        ("updatedAt", "p.updated_at"),
        ("brand", "b.name"),
    ],
    default_column: "p.created_at",
    default_order: SortOrder::Desc,
};

const FROM_PRODUCT: &str = " FROM product p \
     LEFT JOIN brand b ON b.id = p.brand_id \
     LEFT JOIN category c ON c.id = p.category_id";

const PRODUCT_COLUMNS: &str = "SELECT p.id, p.name, p.slug, p.sku, p.description, p.price, \
     p.compare_at_price, p.stock_quantity, p.low_stock_threshold, p.is_active, p.is_featured, \
     p.size, p.width, p.aspect_ratio, p.rim_diameter, p.season, p.speed_rating, p.load_index, \
     p.run_flat, p.image_url, p.images, \
     p.brand_id, b.name AS brand_name, b.slug AS brand_slug, \
     p.category_id, c.name AS category_name, c.slug AS category_slug, \
     p.created_at, p.updated_at";

const CONFLICT: &str = "A product with this slug or SKU already exists, or the brand or category does not exist";

fn select_product() -> String {
    format!("{PRODUCT_COLUMNS}{FROM_PRODUCT}")
}

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q ProductFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(active) = filter.active {
        cond.eq("p.is_active", active);
    }
    match &filter.category {
        Some(CatalogRef::Id(id)) => cond.eq("p.category_id", *id),
        Some(CatalogRef::Slug(slug)) => cond.eq("c.slug", slug.as_str()),
        None => {}
    }
    match &filter.brand {
        Some(CatalogRef::Id(id)) => cond.eq("p.brand_id", *id),
        Some(CatalogRef::Slug(slug)) => cond.eq("b.slug", slug.as_str()),
        None => {}
    }
    if let Some(season) = filter.season {
        cond.eq("p.season", season);
    }
    if let Some(featured) = filter.featured {
        cond.eq("p.is_featured", featured);
    }
    if let Some(min) = filter.min_price {
        cond.gte("p.price", min);
    }
    if let Some(max) = filter.max_price {
        cond.lte("p.price", max);
    }
    if let Some(width) = filter.width {
        cond.eq("p.width", width);
    }
    if let Some(aspect_ratio) = filter.aspect_ratio {
        cond.eq("p.aspect_ratio", aspect_ratio);
    }
    if let Some(rim_diameter) = filter.rim_diameter {
        cond.eq("p.rim_diameter", rim_diameter);
    }
    if let Some(run_flat) = filter.run_flat {
        cond.eq("p.run_flat", run_flat);
    }
    match filter.stock {
        Some(StockLevel::Low) => {
            cond.raw("p.stock_quantity > 0 AND p.stock_quantity <= p.low_stock_threshold");
        }
        Some(StockLevel::Out) => cond.raw("p.stock_quantity = 0"),
        Some(StockLevel::In) => cond.raw("p.stock_quantity > 0"),
        None => {}
    }
    if let Some(term) = &filter.search {
        cond.search(&["p.name", "p.sku", "p.size"], term);
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM_PRODUCT}"));
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(select_product());
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let products = query.build_query_as::<Product>().fetch_all(self.pool).await?;

        Ok((products, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("{} WHERE p.id = $1", select_product()))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        active_only: bool,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "{} WHERE p.slug = $1 AND (p.is_active OR NOT $2)",
            select_product()
        ))
        .bind(slug)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or SKU is taken, or
    /// the referenced brand or category does not exist.
    pub async fn create(&self, new: &NewProduct, slug: &str) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            "INSERT INTO product (name, slug, sku, description, price, compare_at_price, \
             stock_quantity, low_stock_threshold, is_active, is_featured, size, width, \
             aspect_ratio, rim_diameter, season, speed_rating, load_index, run_flat, \
             image_url, images, brand_id, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
             $16, $17, $18, $19, $20, $21, $22) RETURNING id",
        )
        .bind(new.name.trim())
        .bind(slug)
        .bind(new.sku.trim())
        .bind(&new.description)
        .bind(new.price)
        .bind(new.compare_at_price)
        .bind(new.stock_quantity)
        .bind(new.low_stock_threshold)
        .bind(new.is_active)
        .bind(new.is_featured)
        .bind(new.effective_size())
        .bind(new.width)
        .bind(new.aspect_ratio)
        .bind(new.rim_diameter)
        .bind(new.season)
        .bind(&new.speed_rating)
        .bind(&new.load_index)
        .bind(new.run_flat)
        .bind(&new.image_url)
        .bind(&new.images)
        .bind(new.brand_id)
        .bind(new.category_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, CONFLICT))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Lock the row, merge the patch, write every column back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` for a taken slug/SKU or a missing reference.
    pub async fn update(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut product = sqlx::query_as::<_, Product>(&format!(
            "{} WHERE p.id = $1 FOR UPDATE OF p",
            select_product()
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut product);

        sqlx::query(
            "UPDATE product SET name = $2, slug = $3, sku = $4, description = $5, price = $6, \
             compare_at_price = $7, stock_quantity = $8, low_stock_threshold = $9, \
             is_active = $10, is_featured = $11, size = $12, width = $13, aspect_ratio = $14, \
             rim_diameter = $15, season = $16, speed_rating = $17, load_index = $18, \
             run_flat = $19, image_url = $20, images = $21, brand_id = $22, category_id = $23, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.compare_at_price)
        .bind(product.stock_quantity)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.is_featured)
        .bind(&product.size)
        .bind(product.width)
        .bind(product.aspect_ratio)
        .bind(product.rim_diameter)
        .bind(product.season)
        .bind(&product.speed_rating)
        .bind(&product.load_index)
        .bind(product.run_flat)
        .bind(&product.image_url)
        .bind(&product.images)
        .bind(product.brand_id)
        .bind(product.category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, CONFLICT))?;

        tx.commit().await?;
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Quote lines that referenced the product keep their text and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
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
    use rust_decimal::Decimal;
    use tireshop_core::TireSeason;

    use super::*;

    #[test]
    fn test_filters_render_in_order() {
        let filter = ProductFilter {
            active: Some(true),
            brand: Some(CatalogRef::Slug("michelin".to_string())),
            season: Some(TireSeason::Winter),
            min_price: Some(Decimal::from(50)),
            stock: Some(StockLevel::Low),
            search: Some("205".to_string()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){FROM_PRODUCT}"));
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        let (_, predicates) = sql.split_once(" WHERE ").unwrap_or_default();
        assert_eq!(
            predicates,
            "p.is_active = $1 AND b.slug = $2 AND p.season = $3 AND p.price >= $4 AND \
             p.stock_quantity > 0 AND p.stock_quantity <= p.low_stock_threshold AND \
             (p.name ILIKE $5 ESCAPE '\\' OR p.sku ILIKE $6 ESCAPE '\\' OR p.size ILIKE $7 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_no_filters_matches_all() {
        let filter = ProductFilter::default();
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){FROM_PRODUCT}"));
        push_filters(&mut qb, &filter);
        assert!(!qb.sql().contains("WHERE"));
    }

    #[test]
    fn test_sort_fallback() {
        assert_eq!(SORT_COLUMNS.resolve(Some("password"), None).to_sql(), "p.created_at DESC");
        assert_eq!(SORT_COLUMNS.resolve(Some("price"), Some("asc")).to_sql(), "p.price ASC");
    }
}
