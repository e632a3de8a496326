//! Request payload validation.
//!
//! JSON bodies are deserialized and then checked with [`Validate`] before a
//! handler runs (see [`crate::extract::ValidJson`]). Problems are collected
//! per field so the client can show all of them at once.

use std::collections::BTreeMap;

use serde::Serialize;
use tireshop_core::Money;
use tireshop_core::slug::slugify;

/// Field name → human-readable problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn finish(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Non-empty, trimmed, and at most `max` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// When present, same rules as [`Self::required_text`].
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.required_text(field, value, max);
        }
    }

    /// Length cap only; blank is allowed.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if value.is_some_and(|v| v.chars().count() > max) {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Non-negative and small enough for a `NUMERIC(12,2)` column.
    pub fn money(&mut self, field: &str, amount: Option<Money>) {
        match amount {
            Some(a) if a.is_negative() => self.add(field, "cannot be negative"),
            Some(a) if !a.is_storable() => {
                self.add(field, format!("must be at most {}", Money::MAX));
            }
            _ => {}
        }
    }

    pub fn non_negative_int(&mut self, field: &str, value: Option<i32>) {
        if value.is_some_and(|v| v < 0) {
            self.add(field, "cannot be negative");
        }
    }

    pub fn positive_int(&mut self, field: &str, value: Option<i32>) {
        if value.is_some_and(|v| v <= 0) {
            self.add(field, "must be greater than zero");
        }
    }

    /// An explicit slug must keep at least one character after slugification.
    pub fn slug(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value
            && slugify(value).is_empty()
        {
            self.add(field, "must contain at least one letter or digit");
        }
    }

    /// Plausible model year for a vehicle.
    pub fn vehicle_year(&mut self, field: &str, value: Option<i32>) {
        if value.is_some_and(|y| !(1900..=2100).contains(&y)) {
            self.add(field, "must be between 1900 and 2100");
        }
    }
}

/// Checks a deserialized payload before it reaches business logic.
pub trait Validate {
    /// # Errors
    ///
    /// Returns every field that failed validation.
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Resolve the slug for a new record: the explicit slug if given, else the name.
///
/// Returns `None` when neither yields a usable slug.
#[must_use]
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Option<String> {
    let slug = explicit.map_or_else(|| slugify(name), slugify);
    (!slug.is_empty()).then_some(slug)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.add("name", "is required");
        errors.add("name", "is too long");
        assert_eq!(errors.get("name"), Some("is required"));
    }

    #[test]
    fn test_text_rules() {
        let mut errors = FieldErrors::new();
        errors.required_text("name", "   ", 10);
        errors.required_text("sku", "ABCDEFGHIJK", 10);
        errors.optional_text("description", None, 10);
        errors.max_len("notes", Some(""), 10);
        assert_eq!(errors.get("name"), Some("is required"));
        assert_eq!(errors.get("sku"), Some("must be at most 10 characters"));
        assert_eq!(errors.get("description"), None);
        assert_eq!(errors.get("notes"), None);
    }

    #[test]
    fn test_numeric_rules() {
        let mut errors = FieldErrors::new();
        errors.money("price", Some(Money::new(Decimal::new(-1, 2))));
        errors.money("compareAtPrice", Some(Money::new(Decimal::new(100_000_000_000, 0))));
        errors.money("basePrice", Some(Money::MAX));
        errors.non_negative_int("stockQuantity", Some(-3));
        errors.positive_int("durationMinutes", Some(0));
        errors.vehicle_year("vehicleYear", Some(1850));
        assert_eq!(errors.get("price"), Some("cannot be negative"));
        assert_eq!(errors.get("compareAtPrice"), Some("must be at most 9999999999.99"));
        assert_eq!(errors.get("basePrice"), None);
        assert!(errors.get("stockQuantity").is_some());
        assert!(errors.get("durationMinutes").is_some());
        assert!(errors.get("vehicleYear").is_some());
    }

    #[test]
    fn test_finish() {
        assert!(FieldErrors::new().finish().is_ok());
        let mut errors = FieldErrors::new();
        errors.slug("slug", Some("!!!"));
        assert!(errors.finish().is_err());
    }

    #[test]
    fn test_resolve_slug() {
        assert_eq!(
            resolve_slug(None, "Summer Tire (Pro)!").as_deref(),
            Some("summer-tire-pro")
        );
        assert_eq!(
            resolve_slug(Some("Custom Slug"), "ignored").as_deref(),
            Some("custom-slug")
        );
        assert_eq!(resolve_slug(None, "***"), None);
    }

    #[test]
    fn test_serializes_as_object() {
        let mut errors = FieldErrors::new();
        errors.add("email", "is invalid");
        assert_eq!(
            serde_json::to_value(&errors).unwrap_or_default(),
            serde_json::json!({"email": "is invalid"})
        );
    }
}
