//! Tire brands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::BrandId;

use super::default_true;
use crate::validation::{FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub is_active: bool,
    /// Active products of this brand (public listings only count active ones).
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBrand {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for NewBrand {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.slug("slug", self.slug.as_deref());
        errors.max_len("description", self.description.as_deref(), 5000);
        errors.max_len("logoUrl", self.logo_url.as_deref(), 2048);
        errors.max_len("websiteUrl", self.website_url.as_deref(), 2048);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub logo_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub website_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl Validate for BrandPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("name", self.name.as_deref(), 120);
        errors.slug("slug", self.slug.as_deref());
        errors.max_len("description", self.description.clone().flatten().as_deref(), 5000);
        errors.finish()
    }
}

impl BrandPatch {
    /// Merge onto the current row. The slug is re-slugified when given.
    pub fn apply(self, brand: &mut Brand) {
        if let Some(name) = self.name {
            brand.name = name.trim().to_string();
        }
        if let Some(slug) = self.slug {
            brand.slug = tireshop_core::slug::slugify(&slug);
        }
        if let Some(description) = self.description {
            brand.description = description;
        }
        if let Some(logo_url) = self.logo_url {
            brand.logo_url = logo_url;
        }
        if let Some(website_url) = self.website_url {
            brand.website_url = website_url;
        }
        if let Some(is_active) = self.is_active {
            brand.is_active = is_active;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn brand() -> Brand {
        Brand {
            id: BrandId::new(1),
            name: "Michelin".to_string(),
            slug: "michelin".to_string(),
            description: Some("French".to_string()),
            logo_url: Some("/uploads/brands/m.png".to_string()),
            website_url: None,
            is_active: true,
            product_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_absent_keeps_null_clears() {
        let patch: BrandPatch =
            serde_json::from_str(r#"{"description": null, "isActive": false}"#).unwrap();
        let mut current = brand();
        patch.apply(&mut current);
        assert_eq!(current.description, None);
        assert_eq!(current.logo_url.as_deref(), Some("/uploads/brands/m.png"));
        assert!(!current.is_active);
        assert_eq!(current.name, "Michelin");
    }

    #[test]
    fn test_patch_reslugifies() {
        let patch: BrandPatch = serde_json::from_str(r#"{"slug": "Michelin Pilot"}"#).unwrap();
        let mut current = brand();
        patch.apply(&mut current);
        assert_eq!(current.slug, "michelin-pilot");
    }

    #[test]
    fn test_new_brand_defaults_active() {
        let new: NewBrand = serde_json::from_str(r#"{"name": "Pirelli"}"#).unwrap();
        assert!(new.is_active);
        assert!(new.validate().is_ok());

        let new: NewBrand = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert_eq!(new.validate().unwrap_err().get("name"), Some("is required"));
    }
}
