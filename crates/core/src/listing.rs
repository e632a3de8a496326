//! Pagination and sort primitives shared by every list endpoint.
//!
//! Query-string values arrive as raw text. Malformed or out-of-range values
//! fall back to defaults instead of failing the request, and the effective
//! values are echoed back in [`Pagination`].

use serde::Serialize;

/// Hard upper bound on page size.
pub const MAX_LIMIT: u32 = 100;

/// Default page size for storefront listings.
pub const PUBLIC_PAGE_SIZE: u32 = 12;

/// Default page size for admin listings.
pub const ADMIN_PAGE_SIZE: u32 = 10;

/// An effective (clamped) page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Build a page request from raw query values.
    ///
    /// - missing, malformed, or `< 1` page → 1
    /// - missing, malformed, or `< 1` limit → `default_limit`
    /// - limit above [`MAX_LIMIT`] → [`MAX_LIMIT`]
    ///
    /// ```
    /// use tireshop_core::listing::PageRequest;
    ///
    /// let req = PageRequest::parse(Some("3"), Some("20"), 12);
    /// assert_eq!((req.page(), req.limit(), req.offset()), (3, 20, 40));
    ///
    /// let req = PageRequest::parse(Some("abc"), Some("500"), 12);
    /// assert_eq!((req.page(), req.limit()), (1, 100));
    /// ```
    #[must_use]
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit)
            .unwrap_or(default_limit)
            .clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    /// Build from already-typed values, applying the same clamping.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip: `(page - 1) × limit`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    /// Build the response metadata once the total row count is known.
    #[must_use]
    pub fn paginate(&self, total: i64) -> Pagination {
        Pagination::new(self.page, self.limit, total)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total = total.max(0);
        let per_page = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive parse of `asc` / `desc`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A resolved `ORDER BY` clause. The column always comes from an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub order: SortOrder,
}

impl Sort {
    /// Render as `column DIRECTION`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, self.order.as_sql())
    }
}

/// Per-resource allow-list mapping API sort keys to SQL columns.
#[derive(Debug, Clone, Copy)]
pub struct SortColumns {
    /// `(sortBy value, SQL column)` pairs.
    pub allowed: &'static [(&'static str, &'static str)],
    /// Column used when `sortBy` is missing or unknown.
    pub default_column: &'static str,
    /// Direction used when `sortOrder` is missing or unknown.
    pub default_order: SortOrder,
}

impl SortColumns {
    /// Resolve user-supplied sort parameters.
    ///
    /// An unknown `sort_by` silently falls back to the default column. A
    /// recognized `sort_order` is honored for either column.
    ///
    /// ```
    /// use tireshop_core::listing::{SortColumns, SortOrder};
    ///
    /// const COLUMNS: SortColumns = SortColumns {
    ///     allowed: &[("name", "p.name"), ("price", "p.price")],
    ///     default_column: "p.created_at",
    ///     default_order: SortOrder::Desc,
    /// };
    ///
    /// assert_eq!(COLUMNS.resolve(Some("price"), Some("asc")).to_sql(), "p.price ASC");
    /// assert_eq!(COLUMNS.resolve(Some("; DROP"), None).to_sql(), "p.created_at DESC");
    /// ```
    #[must_use]
    pub fn resolve(&self, sort_by: Option<&str>, sort_order: Option<&str>) -> Sort {
        let column = sort_by
            .map(str::trim)
            .and_then(|key| {
                self.allowed
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, column)| *column)
            })
            .unwrap_or(self.default_column);
        let order = sort_order
            .and_then(SortOrder::parse)
            .unwrap_or(self.default_order);
        Sort { column, order }
    }
}

/// Trim a search term, treating blank input as absent.
#[must_use]
pub fn normalize_search(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Wrap a user term as a `LIKE`/`ILIKE` substring pattern, escaping the
/// wildcard characters so they match literally.
///
/// ```
/// use tireshop_core::listing::like_pattern;
///
/// assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
/// ```
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Interpret a boolean-ish query flag (`true`/`1`/`yes`).
#[must_use]
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes") => Some(true),
        Some("false" | "0" | "no") => Some(false),
        _ => None,
    }
}
