//! Seed the catalog from a YAML file.
//!
//! Rows reference each other by slug (`parent`, `brand`, `category`), so the
//! file stays readable and independent of database ids. Rows whose slug
//! already exists are skipped, which makes re-running a seed harmless.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use tireshop_core::{BrandId, CategoryId, ServiceCategoryId};
use tireshop_server::db::{
    BrandRepository, CategoryRepository, HeroBannerRepository, ProductRepository,
    RepositoryError, ServiceCategoryRepository, ServiceRepository,
};
use tireshop_server::models::{
    NewBrand, NewCategory, NewHeroBanner, NewProduct, NewService, NewServiceCategory,
};
use tireshop_server::validation::{FieldErrors, Validate, resolve_slug};

use super::connect;

/// Contents of a seed file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedFile {
    pub brands: Vec<NewBrand>,
    pub categories: Vec<SeedCategory>,
    pub service_categories: Vec<NewServiceCategory>,
    pub services: Vec<SeedService>,
    pub products: Vec<SeedProduct>,
    pub hero_banners: Vec<NewHeroBanner>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    #[serde(flatten)]
    pub category: NewCategory,
    /// Slug of a category listed earlier in the file.
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedService {
    #[serde(flatten)]
    pub service: NewService,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(flatten)]
    pub product: NewProduct,
    pub brand: Option<String>,
    pub category: Option<String>,
}

/// Counters printed at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
}

impl SeedResult {
    /// Count an insert; a slug conflict is a skip, anything else is fatal.
    fn record<T>(
        &mut self,
        what: &str,
        name: &str,
        outcome: Result<T, RepositoryError>,
    ) -> Result<Option<T>, RepositoryError> {
        match outcome {
            Ok(row) => {
                self.inserted += 1;
                Ok(Some(row))
            }
            Err(RepositoryError::Conflict(reason)) => {
                self.skipped += 1;
                warn!(what, name, %reason, "Skipped");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

/// Every problem in the file, as `"<section>[<index>].<field>: <message>"`.
#[must_use]
pub fn validate_file(file: &SeedFile) -> Vec<String> {
    let mut problems = Vec::new();
    let mut check = |section: &str, index: usize, result: Result<(), FieldErrors>| {
        if let Err(errors) = result {
            problems.extend(
                errors
                    .iter()
                    .map(|(field, message)| format!("{section}[{index}].{field}: {message}")),
            );
        }
    };

    for (i, brand) in file.brands.iter().enumerate() {
        check("brands", i, brand.validate());
    }
    for (i, category) in file.categories.iter().enumerate() {
        check("categories", i, category.category.validate());
    }
    for (i, category) in file.service_categories.iter().enumerate() {
        check("serviceCategories", i, category.validate());
    }
    for (i, service) in file.services.iter().enumerate() {
        check("services", i, service.service.validate());
    }
    for (i, product) in file.products.iter().enumerate() {
        check("products", i, product.product.validate());
    }
    for (i, banner) in file.hero_banners.iter().enumerate() {
        check("heroBanners", i, banner.validate());
    }
    problems
}

fn slug_of(explicit: Option<&str>, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    resolve_slug(explicit, name).ok_or_else(|| format!("No usable slug for '{name}'").into())
}

fn lookup<Id: Copy>(
    ids: &HashMap<String, Id>,
    what: &str,
    slug: Option<&str>,
) -> Result<Option<Id>, Box<dyn std::error::Error>> {
    let Some(slug) = slug else {
        return Ok(None);
    };
    match ids.get(slug) {
        Some(id) => Ok(Some(*id)),
        None => Err(format!("Unknown {what} '{slug}'").into()),
    }
}

/// Load, validate and insert a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// references an unknown slug, or a database write fails.
pub async fn catalog(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    info!(path = %path.display(), "Loading seed file");

    // Parse and validate before touching the database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let problems = validate_file(&file);
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("  - {problem}");
        }
        return Err(format!("{} validation errors found", problems.len()).into());
    }

    let pool = connect().await?;
    let result = insert(&pool, file).await?;

    info!("Seeding complete!");
    info!("  Inserted: {}", result.inserted);
    info!("  Skipped (already exist): {}", result.skipped);
    Ok(())
}

async fn insert(pool: &PgPool, file: SeedFile) -> Result<SeedResult, Box<dyn std::error::Error>> {
    let mut result = SeedResult::default();

    let brands_repo = BrandRepository::new(pool);
    let mut brands: HashMap<String, BrandId> = HashMap::new();
    for brand in &file.brands {
        let slug = slug_of(brand.slug.as_deref(), &brand.name)?;
        let created = brands_repo.create(brand, &slug).await;
        let id = match result.record("brand", &brand.name, created)? {
            Some(row) => Some(row.id),
            None => brands_repo.get_by_slug(&slug, false).await?.map(|b| b.id),
        };
        if let Some(id) = id {
            brands.insert(slug, id);
        }
    }

    let categories_repo = CategoryRepository::new(pool);
    let mut categories: HashMap<String, CategoryId> = HashMap::new();
    for SeedCategory { mut category, parent } in file.categories {
        category.parent_id =
            lookup(&categories, "category", parent.as_deref())?.or(category.parent_id);
        let slug = slug_of(category.slug.as_deref(), &category.name)?;
        let created = categories_repo.create(&category, &slug).await;
        let id = match result.record("category", &category.name, created)? {
            Some(row) => Some(row.id),
            None => categories_repo.get_by_slug(&slug, false).await?.map(|c| c.id),
        };
        if let Some(id) = id {
            categories.insert(slug, id);
        }
    }

    let service_categories_repo = ServiceCategoryRepository::new(pool);
    let mut service_categories: HashMap<String, ServiceCategoryId> = service_categories_repo
        .list_active()
        .await?
        .into_iter()
        .map(|c| (c.slug, c.id))
        .collect();
    for category in &file.service_categories {
        let slug = slug_of(category.slug.as_deref(), &category.name)?;
        let created = service_categories_repo.create(category, &slug).await;
        if let Some(row) = result.record("service category", &category.name, created)? {
            service_categories.insert(slug, row.id);
        }
    }

    let services_repo = ServiceRepository::new(pool);
    for SeedService { mut service, category } in file.services {
        service.category_id = lookup(&service_categories, "service category", category.as_deref())?
            .or(service.category_id);
        let slug = slug_of(service.slug.as_deref(), &service.name)?;
        let created = services_repo.create(&service, &slug).await;
        result.record("service", &service.name, created)?;
    }

    let products_repo = ProductRepository::new(pool);
    for SeedProduct { mut product, brand, category } in file.products {
        product.brand_id = lookup(&brands, "brand", brand.as_deref())?.or(product.brand_id);
        product.category_id =
            lookup(&categories, "category", category.as_deref())?.or(product.category_id);
        let slug = slug_of(product.slug.as_deref(), &product.name)?;
        let created = products_repo.create(&product, &slug).await;
        result.record("product", &product.name, created)?;
    }

    let banners_repo = HeroBannerRepository::new(pool);
    for banner in &file.hero_banners {
        let created = banners_repo.create(banner).await;
        result.record("hero banner", &banner.title, created)?;
    }

    Ok(result)
}
