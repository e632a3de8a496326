//! Back-office dashboard figures.

use serde::Serialize;
use tireshop_core::Money;

use super::AppointmentStats;

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: i64,
    pub active: i64,
    pub featured: i64,
    /// In stock but at or below the product's threshold.
    pub low_stock: i64,
    pub out_of_stock: i64,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuoteStats {
    pub total: i64,
    pub pending: i64,
    pub sent: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub expired: i64,
    /// Sum of `totalAmount` over accepted quotes.
    pub accepted_value: Money,
}

/// `GET /api/admin/stats`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub products: ProductStats,
    pub quotes: QuoteStats,
    pub appointments: AppointmentStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_nested_camel_case() {
        let stats = DashboardStats {
            products: ProductStats {
                low_stock: 2,
                ..ProductStats::default()
            },
            quotes: QuoteStats {
                accepted_value: Money::from_cents(3025),
                ..QuoteStats::default()
            },
            appointments: AppointmentStats::default(),
        };
        let json = serde_json::to_value(&stats).unwrap_or_default();
        assert_eq!(json.pointer("/products/lowStock"), Some(&serde_json::json!(2)));
        assert_eq!(
            json.pointer("/quotes/acceptedValue"),
            Some(&serde_json::json!("30.25"))
        );
        assert_eq!(json.pointer("/appointments/noShow"), Some(&serde_json::json!(0)));
    }
}
