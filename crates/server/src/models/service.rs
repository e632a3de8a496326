//! Workshop services and their categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::listing::parse_flag;
use tireshop_core::{Money, ServiceCategoryId, ServiceId};

use super::{Audience, CatalogRef, ListParams, active_filter, default_true};
use crate::error::AppError;
use crate::validation::{FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub base_price: Money,
    pub hourly_rate: Option<Money>,
    pub duration_minutes: i32,
    pub features: Vec<String>,
    pub category_id: Option<ServiceCategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    pub id: ServiceCategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub service_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `GET /api/services` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    #[serde(flatten)]
    pub list: ListParams,
    pub category: Option<String>,
    pub featured: Option<String>,
    /// Admin only: `active` | `inactive` | `all`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub search: Option<String>,
    pub category: Option<CatalogRef>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

impl ServiceQuery {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown `status`.
    pub fn filter(&self, audience: Audience) -> Result<ServiceFilter, AppError> {
        let active = match audience {
            Audience::Public => Some(true),
            Audience::Admin => active_filter(self.status.as_deref())?,
        };
        Ok(ServiceFilter {
            search: self.list.search_term(),
            category: CatalogRef::parse(self.category.as_deref()),
            featured: parse_flag(self.featured.as_deref()),
            active,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub base_price: Money,
    pub hourly_rate: Option<Money>,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub features: Vec<String>,
    pub category_id: Option<ServiceCategoryId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_duration() -> i32 {
    60
}

impl Validate for NewService {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 200);
        errors.slug("slug", self.slug.as_deref());
        errors.max_len("shortDescription", self.short_description.as_deref(), 300);
        errors.money("basePrice", Some(self.base_price));
        errors.money("hourlyRate", self.hourly_rate);
        errors.positive_int("durationMinutes", Some(self.duration_minutes));
        check_features(&mut errors, &self.features);
        errors.finish()
    }
}

fn check_features(errors: &mut FieldErrors, features: &[String]) {
    if features.len() > 30 {
        errors.add("features", "at most 30 features");
    } else if features.iter().any(|f| f.trim().is_empty()) {
        errors.add("features", "entries cannot be blank");
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub short_description: Option<Option<String>>,
    pub base_price: Option<Money>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub hourly_rate: Option<Option<Money>>,
    pub duration_minutes: Option<i32>,
    pub features: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub category_id: Option<Option<ServiceCategoryId>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl Validate for ServicePatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("name", self.name.as_deref(), 200);
        errors.slug("slug", self.slug.as_deref());
        errors.money("basePrice", self.base_price);
        errors.money("hourlyRate", self.hourly_rate.flatten());
        errors.positive_int("durationMinutes", self.duration_minutes);
        if let Some(features) = &self.features {
            check_features(&mut errors, features);
        }
        errors.finish()
    }
}

impl ServicePatch {
    /// Merge onto the current row.
    pub fn apply(self, service: &mut Service) {
        if let Some(name) = self.name {
            service.name = name.trim().to_string();
        }
        if let Some(slug) = self.slug {
            service.slug = tireshop_core::slug::slugify(&slug);
        }
        if let Some(description) = self.description {
            service.description = description;
        }
        if let Some(short_description) = self.short_description {
            service.short_description = short_description;
        }
        if let Some(base_price) = self.base_price {
            service.base_price = base_price;
        }
        if let Some(hourly_rate) = self.hourly_rate {
            service.hourly_rate = hourly_rate;
        }
        if let Some(duration_minutes) = self.duration_minutes {
            service.duration_minutes = duration_minutes;
        }
        if let Some(features) = self.features {
            service.features = features;
        }
        if let Some(category_id) = self.category_id {
            service.category_id = category_id;
        }
        if let Some(is_active) = self.is_active {
            service.is_active = is_active;
        }
        if let Some(is_featured) = self.is_featured {
            service.is_featured = is_featured;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for NewServiceCategory {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.slug("slug", self.slug.as_deref());
        errors.max_len("icon", self.icon.as_deref(), 64);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub icon: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for ServiceCategoryPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("name", self.name.as_deref(), 120);
        errors.slug("slug", self.slug.as_deref());
        errors.finish()
    }
}

impl ServiceCategoryPatch {
    pub fn apply(self, category: &mut ServiceCategory) {
        if let Some(name) = self.name {
            category.name = name.trim().to_string();
        }
        if let Some(slug) = self.slug {
            category.slug = tireshop_core::slug::slugify(&slug);
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(icon) = self.icon {
            category.icon = icon;
        }
        if let Some(sort_order) = self.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service_defaults() {
        let service: NewService =
            serde_json::from_str(r#"{"name": "Wheel Alignment", "basePrice": "49.90"}"#).unwrap();
        assert_eq!(service.duration_minutes, 60);
        assert!(service.features.is_empty());
        assert!(service.validate().is_ok());
    }

    #[test]
    fn test_service_validation() {
        let service: NewService = serde_json::from_str(
            r#"{"name": "Balancing", "basePrice": "10", "durationMinutes": 0, "features": ["ok", " "]}"#,
        )
        .unwrap();
        let errors = service.validate().unwrap_err();
        assert!(errors.get("durationMinutes").is_some());
        assert_eq!(errors.get("features"), Some("entries cannot be blank"));
    }

    #[test]
    fn test_service_filter_by_audience() {
        let query: ServiceQuery =
            serde_json::from_str(r#"{"status": "inactive", "category": "maintenance"}"#).unwrap();
        assert_eq!(query.filter(Audience::Public).unwrap().active, Some(true));
        let admin = query.filter(Audience::Admin).unwrap();
        assert_eq!(admin.active, Some(false));
        assert_eq!(admin.category, Some(CatalogRef::Slug("maintenance".to_string())));
    }

    #[test]
    fn test_patch_clears_hourly_rate() {
        let patch: ServicePatch = serde_json::from_str(r#"{"hourlyRate": null}"#).unwrap();
        assert_eq!(patch.hourly_rate, Some(None));
        assert!(patch.validate().is_ok());
    }
}
