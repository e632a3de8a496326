//! Homepage hero banners.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::HeroBannerId;

use super::default_true;
use crate::validation::{FieldErrors, Validate};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HeroBanner {
    pub id: HeroBannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub mobile_image_url: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HeroBanner {
    /// Active and inside its optional schedule window.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now < end)
    }
}

fn check_window(errors: &mut FieldErrors, starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) {
    if let (Some(start), Some(end)) = (starts_at, ends_at)
        && start >= end
    {
        errors.add("endsAt", "must be after startsAt");
    }
}

fn check_button(errors: &mut FieldErrors, text: Option<&str>, link: Option<&str>) {
    errors.max_len("buttonText", text, 60);
    errors.max_len("buttonLink", link, 2048);
    if text.is_some_and(|t| !t.trim().is_empty()) && link.is_none_or(|l| l.trim().is_empty()) {
        errors.add("buttonLink", "is required when buttonText is set");
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHeroBanner {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub mobile_image_url: Option<String>,
    pub button_text: Option<String>,
    pub button_link: Option<String>,
    /// Defaults to the end of the current list.
    pub sort_order: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Validate for NewHeroBanner {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("title", &self.title, 200);
        errors.required_text("imageUrl", &self.image_url, 2048);
        errors.max_len("subtitle", self.subtitle.as_deref(), 300);
        check_button(&mut errors, self.button_text.as_deref(), self.button_link.as_deref());
        check_window(&mut errors, self.starts_at, self.ends_at);
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroBannerPatch {
    pub title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub subtitle: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub image_url: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub mobile_image_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub button_text: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub button_link: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

impl Validate for HeroBannerPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("title", self.title.as_deref(), 200);
        errors.optional_text("imageUrl", self.image_url.as_deref(), 2048);
        errors.finish()
    }
}

impl HeroBannerPatch {
    /// Merge onto the current row, then re-check rules that span fields.
    ///
    /// # Errors
    ///
    /// Returns field errors when the merged banner has an inverted schedule
    /// or a button label without a link.
    pub fn apply(self, banner: &mut HeroBanner) -> Result<(), FieldErrors> {
        if let Some(title) = self.title {
            banner.title = title.trim().to_string();
        }
        if let Some(subtitle) = self.subtitle {
            banner.subtitle = subtitle;
        }
        if let Some(description) = self.description {
            banner.description = description;
        }
        if let Some(image_url) = self.image_url {
            banner.image_url = image_url;
        }
        if let Some(mobile_image_url) = self.mobile_image_url {
            banner.mobile_image_url = mobile_image_url;
        }
        if let Some(button_text) = self.button_text {
            banner.button_text = button_text;
        }
        if let Some(button_link) = self.button_link {
            banner.button_link = button_link;
        }
        if let Some(sort_order) = self.sort_order {
            banner.sort_order = sort_order;
        }
        if let Some(is_active) = self.is_active {
            banner.is_active = is_active;
        }
        if let Some(starts_at) = self.starts_at {
            banner.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            banner.ends_at = ends_at;
        }

        let mut errors = FieldErrors::new();
        check_button(&mut errors, banner.button_text.as_deref(), banner.button_link.as_deref());
        check_window(&mut errors, banner.starts_at, banner.ends_at);
        errors.finish()
    }
}

/// `PUT /api/admin/hero-banners/reorder`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub items: Vec<ReorderItem>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    pub id: HeroBannerId,
    pub sort_order: i32,
}

impl Validate for ReorderRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.items.is_empty() {
            errors.add("items", "is required");
        }
        let mut seen = HashSet::new();
        if !self.items.iter().all(|item| seen.insert(item.id)) {
            errors.add("items", "contains duplicate ids");
        }
        if self.items.iter().any(|item| item.sort_order < 0) {
            errors.add("items", "sortOrder cannot be negative");
        }
        errors.finish()
    }
}
