//! Domain models and request payloads.
//!
//! Read models serialize with camelCase keys. Create payloads (`New*`)
//! require the mandatory columns; update payloads (`*Patch`) treat an absent
//! key as "keep", and for nullable columns an explicit `null` as "clear".

pub mod appointment;
pub mod brand;
pub mod category;
pub mod hero_banner;
pub mod product;
pub mod quote;
pub mod service;
pub mod stats;
pub mod user;

use std::str::FromStr;

use serde::Deserialize;
use tireshop_core::ParseEnumError;
use tireshop_core::listing::{PageRequest, Sort, SortColumns, normalize_search};

use crate::error::AppError;

pub use appointment::{Appointment, AppointmentPatch, AppointmentStats, NewAppointment};
pub use brand::{Brand, BrandPatch, NewBrand};
pub use category::{Category, CategoryNode, CategoryPatch, NewCategory};
pub use hero_banner::{HeroBanner, HeroBannerPatch, NewHeroBanner, ReorderRequest};
pub use product::{NewProduct, Product, ProductPatch};
pub use quote::{NewQuote, Quote, QuotePatch, QuoteRequest, QuoteWithItems};
pub use service::{NewService, NewServiceCategory, Service, ServiceCategory, ServiceCategoryPatch, ServicePatch};
pub use stats::DashboardStats;
pub use user::{CurrentUser, User, session_keys};

/// Who is asking; decides whether inactive rows are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

impl Audience {
    #[must_use]
    pub const fn default_page_size(self) -> u32 {
        match self {
            Self::Public => tireshop_core::listing::PUBLIC_PAGE_SIZE,
            Self::Admin => tireshop_core::listing::ADMIN_PAGE_SIZE,
        }
    }
}

/// Query-string parameters common to every paginated list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn page_request(&self, audience: Audience) -> PageRequest {
        PageRequest::parse(
            self.page.as_deref(),
            self.limit.as_deref(),
            audience.default_page_size(),
        )
    }

    #[must_use]
    pub fn search_term(&self) -> Option<String> {
        normalize_search(self.search.as_deref()).map(str::to_string)
    }

    #[must_use]
    pub fn sort(&self, columns: &SortColumns) -> Sort {
        columns.resolve(self.sort_by.as_deref(), self.sort_order.as_deref())
    }
}

/// Query string for flat catalog lists (brands, service categories).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    #[serde(flatten)]
    pub list: ListParams,
    /// Admin only: `active` | `inactive` | `all`
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl CatalogQuery {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown `status`.
    pub fn filter(&self, audience: Audience) -> Result<CatalogFilter, AppError> {
        let active = match audience {
            Audience::Public => Some(true),
            Audience::Admin => active_filter(self.status.as_deref())?,
        };
        Ok(CatalogFilter {
            search: self.list.search_term(),
            active,
        })
    }
}

/// Parse a categorical filter value.
///
/// Missing, blank, or `all` means "no filter"; anything else must parse.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming the parameter for unknown values.
pub fn enum_filter<T>(raw: Option<&str>, param: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = ParseEnumError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: ParseEnumError| AppError::BadRequest(format!("Invalid {param}: {}", e.value))),
    }
}

/// Admin `status` filter for catalog rows with an `is_active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Active,
    Inactive,
}

impl Availability {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl FromStr for Availability {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Admin `status` filter resolved to an `is_active` predicate.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for values other than `active`/`inactive`/`all`.
pub fn active_filter(raw: Option<&str>) -> Result<Option<bool>, AppError> {
    Ok(enum_filter::<Availability>(raw, "status")?.map(Availability::is_active))
}

/// A category or brand reference from a query string: numeric id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRef {
    Id(i32),
    Slug(String),
}

impl CatalogRef {
    /// Blank or `all` means "no filter".
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let value = raw.map(str::trim).filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))?;
        Some(
            value
                .parse::<i32>()
                .map_or_else(|_| Self::Slug(value.to_ascii_lowercase()), Self::Id),
        )
    }
}

pub(crate) const fn default_true() -> bool {
    true
}
