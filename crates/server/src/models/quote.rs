//! Quotes and their line items.
//!
//! Totals are computed when a quote is written (see
//! [`tireshop_core::pricing::compute_totals`]) and stored; reads never
//! recompute them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::pricing::LineInput;
use tireshop_core::{Email, Money, ProductId, QuoteId, QuoteItemId, QuoteStatus, ServiceId, UserId};

use super::{ListParams, enum_filter};
use crate::error::AppError;
use crate::validation::{FieldErrors, Validate};

/// Days a quote stays valid when no `validUntil` is given.
pub const DEFAULT_VALIDITY_DAYS: u64 = 30;

/// Upper bound on lines per quote.
pub const MAX_ITEMS: usize = 50;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub quote_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub notes: Option<String>,
    pub status: QuoteStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub valid_until: Option<NaiveDate>,
    pub sent_at: Option<DateTime<Utc>>,
    pub user_id: Option<UserId>,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub quote_id: QuoteId,
    pub product_id: Option<ProductId>,
    pub service_id: Option<ServiceId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
    pub position: i32,
}

/// A quote with its lines in `position` order.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteWithItems {
    #[serde(flatten)]
    pub quote: Quote,
    pub items: Vec<QuoteItem>,
}

/// Admin `GET /api/admin/quotes` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    #[serde(flatten)]
    pub list: ListParams,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub search: Option<String>,
    pub status: Option<QuoteStatus>,
}

impl QuoteQuery {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown `status`.
    pub fn filter(&self) -> Result<QuoteFilter, AppError> {
        Ok(QuoteFilter {
            search: self.list.search_term(),
            status: enum_filter(self.status.as_deref(), "status")?,
        })
    }
}

/// Customer and vehicle fields shared by admin-created quotes and public
/// quote requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCustomer {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub notes: Option<String>,
}

impl QuoteCustomer {
    fn check(&self, errors: &mut FieldErrors) {
        errors.required_text("customerName", &self.customer_name, 200);
        if let Err(e) = Email::parse(&self.customer_email) {
            errors.add("customerEmail", e.to_string());
        }
        errors.max_len("customerPhone", self.customer_phone.as_deref(), 40);
        errors.max_len("vehicleMake", self.vehicle_make.as_deref(), 100);
        errors.max_len("vehicleModel", self.vehicle_model.as_deref(), 100);
        errors.vehicle_year("vehicleYear", self.vehicle_year);
        errors.max_len("notes", self.notes.as_deref(), 5000);
    }
}

/// A fully priced line, as an admin enters it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItemInput {
    pub product_id: Option<ProductId>,
    pub service_id: Option<ServiceId>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl QuoteItemInput {
    /// Pricing input for this line. Quantities below one become zero and
    /// are rejected by the pricing rules.
    #[must_use]
    pub fn line(&self) -> LineInput {
        LineInput::new(u32::try_from(self.quantity).unwrap_or(0), self.unit_price)
    }
}

fn check_items(errors: &mut FieldErrors, items: &[QuoteItemInput]) {
    if items.is_empty() {
        errors.add("items", "at least one item is required");
    } else if items.len() > MAX_ITEMS {
        errors.add("items", format!("at most {MAX_ITEMS} items"));
    }
    for (i, item) in items.iter().enumerate() {
        errors.required_text(&format!("items[{i}].description"), &item.description, 500);
        errors.positive_int(&format!("items[{i}].quantity"), Some(item.quantity));
        errors.money(&format!("items[{i}].unitPrice"), Some(item.unit_price));
        if item.product_id.is_some() && item.service_id.is_some() {
            errors.add(
                &format!("items[{i}]"),
                "reference either a product or a service, not both",
            );
        }
    }
}

/// `POST /api/admin/quotes`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuote {
    #[serde(flatten)]
    pub customer: QuoteCustomer,
    pub items: Vec<QuoteItemInput>,
    #[serde(default)]
    pub discount_amount: Money,
    pub valid_until: Option<NaiveDate>,
}

impl Validate for NewQuote {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.customer.check(&mut errors);
        check_items(&mut errors, &self.items);
        errors.money("discountAmount", Some(self.discount_amount));
        errors.finish()
    }
}

/// One requested line of a public quote request; the price is looked up.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedItem {
    pub product_id: Option<ProductId>,
    pub service_id: Option<ServiceId>,
    pub quantity: i32,
}

/// `POST /api/quotes`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub customer: QuoteCustomer,
    pub items: Vec<RequestedItem>,
}

impl Validate for QuoteRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        self.customer.check(&mut errors);
        if self.items.is_empty() {
            errors.add("items", "at least one item is required");
        } else if self.items.len() > MAX_ITEMS {
            errors.add("items", format!("at most {MAX_ITEMS} items"));
        }
        for (i, item) in self.items.iter().enumerate() {
            errors.positive_int(&format!("items[{i}].quantity"), Some(item.quantity));
            if item.product_id.is_some() == item.service_id.is_some() {
                errors.add(
                    &format!("items[{i}]"),
                    "reference exactly one of productId or serviceId",
                );
            }
        }
        errors.finish()
    }
}

/// `PUT /api/admin/quotes/{id}`
///
/// Replacing `items` or changing `discountAmount` recomputes the stored
/// totals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePatch {
    pub status: Option<QuoteStatus>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub customer_phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_make: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_model: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_year: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub valid_until: Option<Option<NaiveDate>>,
    pub discount_amount: Option<Money>,
    pub items: Option<Vec<QuoteItemInput>>,
}

impl Validate for QuotePatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("customerName", self.customer_name.as_deref(), 200);
        if let Some(email) = &self.customer_email
            && let Err(e) = Email::parse(email)
        {
            errors.add("customerEmail", e.to_string());
        }
        errors.vehicle_year("vehicleYear", self.vehicle_year.flatten());
        errors.money("discountAmount", self.discount_amount);
        if let Some(items) = &self.items {
            check_items(&mut errors, items);
        }
        errors.finish()
    }
}

/// What the caller still has to do after [`QuotePatch::apply`].
#[derive(Debug, Default)]
pub struct PendingQuoteWrite {
    /// Replacement lines, when the patch carried them.
    pub items: Option<Vec<QuoteItemInput>>,
    /// Whether stored totals must be recomputed.
    pub reprice: bool,
}

impl QuotePatch {
    /// Merge scalar fields onto the locked row.
    ///
    /// Moving to `sent` stamps `sent_at` if it was never set.
    ///
    /// # Errors
    ///
    /// Returns a `status` field error when the lifecycle forbids the move.
    pub fn apply(self, quote: &mut Quote, now: DateTime<Utc>) -> Result<PendingQuoteWrite, FieldErrors> {
        if let Some(next) = self.status {
            if !quote.status.can_transition_to(next) {
                let mut errors = FieldErrors::new();
                errors.add(
                    "status",
                    format!("cannot change from {} to {next}", quote.status),
                );
                return Err(errors);
            }
            if next == QuoteStatus::Sent && quote.sent_at.is_none() {
                quote.sent_at = Some(now);
            }
            quote.status = next;
        }
        if let Some(name) = self.customer_name {
            quote.customer_name = name.trim().to_string();
        }
        if let Some(email) = self.customer_email {
            quote.customer_email = email.trim().to_ascii_lowercase();
        }
        if let Some(phone) = self.customer_phone {
            quote.customer_phone = phone;
        }
        if let Some(make) = self.vehicle_make {
            quote.vehicle_make = make;
        }
        if let Some(model) = self.vehicle_model {
            quote.vehicle_model = model;
        }
        if let Some(year) = self.vehicle_year {
            quote.vehicle_year = year;
        }
        if let Some(notes) = self.notes {
            quote.notes = notes;
        }
        if let Some(valid_until) = self.valid_until {
            quote.valid_until = valid_until;
        }
        let reprice = self.items.is_some() || self.discount_amount.is_some();
        if let Some(discount) = self.discount_amount {
            quote.discount_amount = discount;
        }
        Ok(PendingQuoteWrite {
            items: self.items,
            reprice,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn quote(status: QuoteStatus) -> Quote {
        Quote {
            id: QuoteId::new(1),
            quote_number: "Q-1-00000000".to_string(),
            customer_name: "Ana".to_string(),
            customer_email: "ana@example.com".to_string(),
            customer_phone: None,
            vehicle_make: None,
            vehicle_model: None,
            vehicle_year: None,
            notes: None,
            status,
            subtotal: Money::ZERO,
            tax_amount: Money::ZERO,
            discount_amount: Money::ZERO,
            total_amount: Money::ZERO,
            valid_until: None,
            sent_at: None,
            user_id: None,
            item_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_quote_parses_money_strings() {
        let new: NewQuote = serde_json::from_str(
            r#"{"customerName": "Ana", "customerEmail": "ana@example.com",
                "items": [{"description": "Pilot Sport 4", "quantity": 2, "unitPrice": "10.00"},
                          {"description": "Fitting", "quantity": 1, "unitPrice": 5}]}"#,
        )
        .unwrap();
        assert!(new.validate().is_ok());
        assert_eq!(new.discount_amount, Money::ZERO);
        assert_eq!(new.items[1].unit_price, Money::new(Decimal::from(5)));
        assert_eq!(new.items[0].line(), LineInput::new(2, Money::from_cents(1000)));
    }

    #[test]
    fn test_new_quote_item_errors() {
        let new: NewQuote = serde_json::from_str(
            r#"{"customerName": "", "customerEmail": "nope",
                "items": [{"description": "x", "quantity": 0, "unitPrice": "-1"}]}"#,
        )
        .unwrap();
        let errors = new.validate().unwrap_err();
        assert_eq!(errors.get("customerName"), Some("is required"));
        assert!(errors.get("customerEmail").is_some());
        assert_eq!(errors.get("items[0].quantity"), Some("must be greater than zero"));
        assert_eq!(errors.get("items[0].unitPrice"), Some("cannot be negative"));
    }

    #[test]
    fn test_amounts_beyond_storage_fail_validation() {
        let new: NewQuote = serde_json::from_str(
            r#"{"customerName": "Ana", "customerEmail": "ana@example.com",
                "items": [{"description": "Pilot Sport 4", "quantity": 2,
                           "unitPrice": "70000000000000000000000000000"}],
                "discountAmount": "10000000000"}"#,
        )
        .unwrap();
        let errors = new.validate().unwrap_err();
        assert_eq!(errors.get("items[0].unitPrice"), Some("must be at most 9999999999.99"));
        assert_eq!(errors.get("discountAmount"), Some("must be at most 9999999999.99"));

        let patch: QuotePatch = serde_json::from_str(
            r#"{"items": [{"description": "Fitting", "quantity": 1, "unitPrice": "100000000000"}]}"#,
        )
        .unwrap();
        assert!(patch.validate().unwrap_err().get("items[0].unitPrice").is_some());
    }

    #[test]
    fn test_validated_quote_always_prices() {
        // The largest line a payload can carry still prices without panicking;
        // totals that outgrow storage come back as an error.
        let new: NewQuote = serde_json::from_str(
            r#"{"customerName": "Ana", "customerEmail": "ana@example.com",
                "items": [{"description": "Fleet order", "quantity": 2147483647,
                           "unitPrice": "9999999999.99"}]}"#,
        )
        .unwrap();
        assert!(new.validate().is_ok());
        let lines: Vec<LineInput> = new.items.iter().map(QuoteItemInput::line).collect();
        assert_eq!(
            tireshop_core::pricing::compute_totals(&lines, new.discount_amount),
            Err(tireshop_core::pricing::PricingError::Overflow { max: Money::MAX })
        );
    }

    #[test]
    fn test_quote_request_requires_exactly_one_reference() {
        let request: QuoteRequest = serde_json::from_str(
            r#"{"customerName": "Ana", "customerEmail": "ana@example.com",
                "items": [{"quantity": 1}, {"productId": 1, "serviceId": 2, "quantity": 1},
                          {"productId": 3, "quantity": 4}]}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.get("items[0]").is_some());
        assert!(errors.get("items[1]").is_some());
        assert_eq!(errors.get("items[2]"), None);
    }

    #[test]
    fn test_patch_enforces_lifecycle() {
        let mut current = quote(QuoteStatus::Accepted);
        let patch = QuotePatch {
            status: Some(QuoteStatus::Pending),
            ..QuotePatch::default()
        };
        let errors = patch.apply(&mut current, Utc::now()).unwrap_err();
        assert_eq!(errors.get("status"), Some("cannot change from accepted to pending"));
        assert_eq!(current.status, QuoteStatus::Accepted);
    }

    #[test]
    fn test_patch_to_sent_stamps_sent_at_once() {
        let now = Utc::now();
        let mut current = quote(QuoteStatus::Pending);
        let patch = QuotePatch {
            status: Some(QuoteStatus::Sent),
            ..QuotePatch::default()
        };
        let pending = patch.apply(&mut current, now).unwrap();
        assert!(!pending.reprice);
        assert_eq!(current.sent_at, Some(now));
    }

    #[test]
    fn test_patch_discount_triggers_reprice() {
        let mut current = quote(QuoteStatus::Pending);
        let patch: QuotePatch =
            serde_json::from_str(r#"{"discountAmount": "2.50", "notes": null}"#).unwrap();
        let pending = patch.apply(&mut current, Utc::now()).unwrap();
        assert!(pending.reprice);
        assert!(pending.items.is_none());
        assert_eq!(current.discount_amount, Money::from_cents(250));
    }

    #[test]
    fn test_query_filter_status() {
        let query = QuoteQuery {
            status: Some("accepted".to_string()),
            ..QuoteQuery::default()
        };
        assert_eq!(query.filter().unwrap().status, Some(QuoteStatus::Accepted));

        let query = QuoteQuery {
            status: Some("archived".to_string()),
            ..QuoteQuery::default()
        };
        assert!(query.filter().is_err());
    }
}
