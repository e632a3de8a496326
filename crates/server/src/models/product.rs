//! Tire products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tireshop_core::listing::parse_flag;
use tireshop_core::{BrandId, CategoryId, Money, ProductId, TireSeason};

use super::{Audience, CatalogRef, ListParams, active_filter, default_true, enum_filter};
use crate::error::AppError;
use crate::validation::{FieldErrors, Validate};

/// Maximum number of gallery images per product.
pub const MAX_IMAGES: usize = 20;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub size: Option<String>,
    pub width: Option<i32>,
    pub aspect_ratio: Option<i32>,
    pub rim_diameter: Option<i32>,
    pub season: Option<TireSeason>,
    pub speed_rating: Option<String>,
    pub load_index: Option<String>,
    pub run_flat: bool,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,
    pub brand_slug: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// In stock but at or below the reorder threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= self.low_stock_threshold
    }
}

/// Format a metric tire size such as `205/55R16`.
#[must_use]
pub fn tire_size(width: Option<i32>, aspect_ratio: Option<i32>, rim_diameter: Option<i32>) -> Option<String> {
    match (width, aspect_ratio, rim_diameter) {
        (Some(w), Some(a), Some(r)) => Some(format!("{w}/{a}R{r}")),
        _ => None,
    }
}

/// Stock level filter for admin listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// `0 < stock <= threshold`
    Low,
    /// `stock = 0`
    Out,
    /// `stock > 0`
    In,
}

impl std::str::FromStr for StockLevel {
    type Err = tireshop_core::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "out" => Ok(Self::Out),
            "in" => Ok(Self::In),
            other => Err(tireshop_core::ParseEnumError {
                kind: "stock level",
                value: other.to_string(),
            }),
        }
    }
}

/// Raw `GET /api/products` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(flatten)]
    pub list: ListParams,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub season: Option<String>,
    pub featured: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub width: Option<String>,
    pub aspect_ratio: Option<String>,
    pub rim_diameter: Option<String>,
    pub run_flat: Option<String>,
    /// Admin only: `active` | `inactive` | `all`
    pub status: Option<String>,
    /// Admin only: `low` | `out` | `in`
    pub stock: Option<String>,
}

/// Typed product predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<CatalogRef>,
    pub brand: Option<CatalogRef>,
    pub season: Option<TireSeason>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub width: Option<i32>,
    pub aspect_ratio: Option<i32>,
    pub rim_diameter: Option<i32>,
    pub run_flat: Option<bool>,
    pub active: Option<bool>,
    pub stock: Option<StockLevel>,
}

impl ProductQuery {
    /// Parse into predicates. Public callers only ever see active products.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for unknown enum values or malformed numbers.
    pub fn filter(&self, audience: Audience) -> Result<ProductFilter, AppError> {
        let (active, stock) = match audience {
            Audience::Public => (Some(true), None),
            Audience::Admin => (
                active_filter(self.status.as_deref())?,
                enum_filter(self.stock.as_deref(), "stock")?,
            ),
        };

        Ok(ProductFilter {
            search: self.list.search_term(),
            category: CatalogRef::parse(self.category.as_deref()),
            brand: CatalogRef::parse(self.brand.as_deref()),
            season: enum_filter(self.season.as_deref(), "season")?,
            featured: parse_flag(self.featured.as_deref()),
            min_price: number_filter(self.min_price.as_deref(), "minPrice")?,
            max_price: number_filter(self.max_price.as_deref(), "maxPrice")?,
            width: number_filter(self.width.as_deref(), "width")?,
            aspect_ratio: number_filter(self.aspect_ratio.as_deref(), "aspectRatio")?,
            rim_diameter: number_filter(self.rim_diameter.as_deref(), "rimDiameter")?,
            run_flat: parse_flag(self.run_flat.as_deref()),
            active,
            stock,
        })
    }
}

fn number_filter<T: std::str::FromStr>(raw: Option<&str>, param: &str) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {param}: {value}"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub description: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub size: Option<String>,
    pub width: Option<i32>,
    pub aspect_ratio: Option<i32>,
    pub rim_diameter: Option<i32>,
    pub season: Option<TireSeason>,
    pub speed_rating: Option<String>,
    pub load_index: Option<String>,
    #[serde(default)]
    pub run_flat: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub brand_id: Option<BrandId>,
    pub category_id: Option<CategoryId>,
}

const fn default_low_stock_threshold() -> i32 {
    5
}

impl NewProduct {
    /// The explicit size, or one derived from width/aspect/rim.
    #[must_use]
    pub fn effective_size(&self) -> Option<String> {
        self.size
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| tire_size(self.width, self.aspect_ratio, self.rim_diameter))
    }
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 200);
        errors.slug("slug", self.slug.as_deref());
        errors.required_text("sku", &self.sku, 64);
        errors.max_len("description", self.description.as_deref(), 10_000);
        errors.money("price", Some(self.price));
        errors.money("compareAtPrice", self.compare_at_price);
        errors.non_negative_int("stockQuantity", Some(self.stock_quantity));
        errors.non_negative_int("lowStockThreshold", Some(self.low_stock_threshold));
        check_tire_attributes(
            &mut errors,
            self.width,
            self.aspect_ratio,
            self.rim_diameter,
            self.speed_rating.as_deref(),
            self.load_index.as_deref(),
        );
        if self.images.len() > MAX_IMAGES {
            errors.add("images", format!("at most {MAX_IMAGES} images"));
        }
        errors.finish()
    }
}

fn check_tire_attributes(
    errors: &mut FieldErrors,
    width: Option<i32>,
    aspect_ratio: Option<i32>,
    rim_diameter: Option<i32>,
    speed_rating: Option<&str>,
    load_index: Option<&str>,
) {
    errors.positive_int("width", width);
    errors.positive_int("aspectRatio", aspect_ratio);
    errors.positive_int("rimDiameter", rim_diameter);
    errors.max_len("speedRating", speed_rating, 4);
    errors.max_len("loadIndex", load_index, 8);
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<Money>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub compare_at_price: Option<Option<Money>>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub size: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub width: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub aspect_ratio: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub rim_diameter: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub season: Option<Option<TireSeason>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub speed_rating: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub load_index: Option<Option<String>>,
    pub run_flat: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub image_url: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub brand_id: Option<Option<BrandId>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub category_id: Option<Option<CategoryId>>,
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("name", self.name.as_deref(), 200);
        errors.slug("slug", self.slug.as_deref());
        errors.optional_text("sku", self.sku.as_deref(), 64);
        errors.money("price", self.price);
        errors.money("compareAtPrice", self.compare_at_price.flatten());
        errors.non_negative_int("stockQuantity", self.stock_quantity);
        errors.non_negative_int("lowStockThreshold", self.low_stock_threshold);
        check_tire_attributes(
            &mut errors,
            self.width.flatten(),
            self.aspect_ratio.flatten(),
            self.rim_diameter.flatten(),
            self.speed_rating.as_ref().and_then(|s| s.as_deref()),
            self.load_index.as_ref().and_then(|s| s.as_deref()),
        );
        if self.images.as_ref().is_some_and(|i| i.len() > MAX_IMAGES) {
            errors.add("images", format!("at most {MAX_IMAGES} images"));
        }
        errors.finish()
    }
}

impl ProductPatch {
    /// Merge onto the current row.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name.trim().to_string();
        }
        if let Some(slug) = self.slug {
            product.slug = tireshop_core::slug::slugify(&slug);
        }
        if let Some(sku) = self.sku {
            product.sku = sku.trim().to_string();
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(compare_at_price) = self.compare_at_price {
            product.compare_at_price = compare_at_price;
        }
        if let Some(stock_quantity) = self.stock_quantity {
            product.stock_quantity = stock_quantity;
        }
        if let Some(threshold) = self.low_stock_threshold {
            product.low_stock_threshold = threshold;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(is_featured) = self.is_featured {
            product.is_featured = is_featured;
        }
        if let Some(width) = self.width {
            product.width = width;
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            product.aspect_ratio = aspect_ratio;
        }
        if let Some(rim_diameter) = self.rim_diameter {
            product.rim_diameter = rim_diameter;
        }
        match self.size {
            Some(size) => product.size = size,
            None if product.size.is_none() => {
                product.size = tire_size(product.width, product.aspect_ratio, product.rim_diameter);
            }
            None => {}
        }
        if let Some(season) = self.season {
            product.season = season;
        }
        if let Some(speed_rating) = self.speed_rating {
            product.speed_rating = speed_rating;
        }
        if let Some(load_index) = self.load_index {
            product.load_index = load_index;
        }
        if let Some(run_flat) = self.run_flat {
            product.run_flat = run_flat;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(brand_id) = self.brand_id {
            product.brand_id = brand_id;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(pairs: &str) -> ProductQuery {
        serde_json::from_str(pairs).unwrap()
    }

    #[test]
    fn test_tire_size() {
        assert_eq!(tire_size(Some(205), Some(55), Some(16)).as_deref(), Some("205/55R16"));
        assert_eq!(tire_size(Some(205), None, Some(16)), None);
    }

    #[test]
    fn test_public_filter_forces_active_and_ignores_admin_params() {
        let filter = query(r#"{"status": "inactive", "stock": "low", "season": "winter"}"#)
            .filter(Audience::Public)
            .unwrap();
        assert_eq!(filter.active, Some(true));
        assert_eq!(filter.stock, None);
        assert_eq!(filter.season, Some(TireSeason::Winter));
    }

    #[test]
    fn test_admin_filter() {
        let filter = query(r#"{"status": "all", "stock": "out", "brand": "3", "minPrice": "50"}"#)
            .filter(Audience::Admin)
            .unwrap();
        assert_eq!(filter.active, None);
        assert_eq!(filter.stock, Some(StockLevel::Out));
        assert_eq!(filter.brand, Some(CatalogRef::Id(3)));
        assert_eq!(filter.min_price, Some(Decimal::from(50)));
    }

    #[test]
    fn test_filter_rejects_unknown_values() {
        assert!(matches!(
            query(r#"{"season": "monsoon"}"#).filter(Audience::Public),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            query(r#"{"maxPrice": "cheap"}"#).filter(Audience::Public),
            Err(AppError::BadRequest(msg)) if msg == "Invalid maxPrice: cheap"
        ));
    }

    #[test]
    fn test_new_product_validation() {
        let product: NewProduct = serde_json::from_str(
            r#"{"name": "Pilot Sport 5", "sku": "MI-PS5-2055516", "price": "129.90",
                "width": 205, "aspectRatio": 55, "rimDiameter": 16, "season": "summer"}"#,
        )
        .unwrap();
        assert!(product.validate().is_ok());
        assert_eq!(product.effective_size().as_deref(), Some("205/55R16"));
        assert_eq!(product.low_stock_threshold, 5);
        assert!(product.is_active);

        let product: NewProduct = serde_json::from_str(
            r#"{"name": "X", "sku": "", "price": "-1", "stockQuantity": -2, "width": 0}"#,
        )
        .unwrap();
        let errors = product.validate().unwrap_err();
        for field in ["sku", "price", "stockQuantity", "width"] {
            assert!(errors.get(field).is_some(), "{field} should fail");
        }

        // Fits a Decimal but not the NUMERIC(12,2) column.
        let product: NewProduct = serde_json::from_str(
            r#"{"name": "X", "sku": "X1", "price": "100000000000", "compareAtPrice": "9999999999.99"}"#,
        )
        .unwrap();
        let errors = product.validate().unwrap_err();
        assert_eq!(errors.get("price"), Some("must be at most 9999999999.99"));
        assert_eq!(errors.get("compareAtPrice"), None);
    }

    #[test]
    fn test_patch_stock_and_clear_brand() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"stockQuantity": 0, "brandId": null, "price": 99.5}"#).unwrap();
        assert!(patch.validate().is_ok());
        assert_eq!(patch.brand_id, Some(None));
        assert_eq!(patch.price.map(|p| p.to_string()).as_deref(), Some("99.50"));
    }
}
