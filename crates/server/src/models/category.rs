//! Product categories, arranged as a tree through `parent_id`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::CategoryId;

use tireshop_core::listing::parse_flag;

use super::{Audience, CatalogFilter, CatalogQuery, default_true};
use crate::error::AppError;
use crate::validation::{FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `GET /api/categories` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    #[serde(flatten)]
    pub catalog: CatalogQuery,
    /// `true` returns the nested tree instead of a flat page.
    pub tree: Option<String>,
    /// Parent id, or `root` for top-level categories.
    pub parent: Option<String>,
}

/// Restriction on `parent_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    Root,
    Of(CategoryId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub catalog: CatalogFilter,
    pub parent: Option<ParentFilter>,
}

impl CategoryQuery {
    #[must_use]
    pub fn wants_tree(&self) -> bool {
        parse_flag(self.tree.as_deref()).unwrap_or(false)
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown `status` or `parent`.
    pub fn filter(&self, audience: Audience) -> Result<CategoryFilter, AppError> {
        let parent = match self.parent.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if value.eq_ignore_ascii_case("root") => Some(ParentFilter::Root),
            Some(value) => Some(ParentFilter::Of(CategoryId::new(value.parse().map_err(
                |_| AppError::BadRequest(format!("Invalid parent: {value}")),
            )?))),
        };
        Ok(CategoryFilter {
            catalog: self.catalog.filter(audience)?,
            parent,
        })
    }
}

/// A category with its descendants, for `?tree=true`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Assemble a forest from a flat list ordered by `sort_order, name`.
///
/// Rows whose parent is absent from `categories` (e.g. an inactive parent in
/// a public listing) become roots. Sibling order follows the input order.
#[must_use]
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let present: std::collections::HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
    let mut children_of: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|p| present.contains(p));
        children_of.entry(parent).or_default().push(category);
    }
    attach(None, &mut children_of)
}

fn attach(
    parent: Option<CategoryId>,
    children_of: &mut HashMap<Option<CategoryId>, Vec<Category>>,
) -> Vec<CategoryNode> {
    children_of
        .remove(&parent)
        .unwrap_or_default()
        .into_iter()
        .map(|category| {
            let children = attach(Some(category.id), children_of);
            CategoryNode { category, children }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.slug("slug", self.slug.as_deref());
        errors.max_len("description", self.description.as_deref(), 5000);
        errors.max_len("imageUrl", self.image_url.as_deref(), 2048);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for CategoryPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("name", self.name.as_deref(), 120);
        errors.slug("slug", self.slug.as_deref());
        errors.finish()
    }
}

impl CategoryPatch {
    /// Merge onto the current row.
    pub fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name.trim().to_string();
        }
        if let Some(slug) = self.slug {
            category.slug = tireshop_core::slug::slugify(&slug);
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(image_url) = self.image_url {
            category.image_url = image_url;
        }
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(sort_order) = self.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
    }
}
