//! Dashboard aggregates.

use chrono::NaiveDate;
use sqlx::PgPool;

use super::{AppointmentRepository, RepositoryError};
use crate::models::DashboardStats;
use crate::models::stats::{ProductStats, QuoteStats};

/// Read-only aggregate queries for the back-office dashboard.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard(&self, today: NaiveDate) -> Result<DashboardStats, RepositoryError> {
        let products = sqlx::query_as::<_, ProductStats>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE is_active) AS active, \
             COUNT(*) FILTER (WHERE is_featured) AS featured, \
             COUNT(*) FILTER (WHERE stock_quantity > 0 \
                              AND stock_quantity <= low_stock_threshold) AS low_stock, \
             COUNT(*) FILTER (WHERE stock_quantity = 0) AS out_of_stock \
             FROM product",
        )
        .fetch_one(self.pool)
        .await?;

        let quotes = sqlx::query_as::<_, QuoteStats>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
             COUNT(*) FILTER (WHERE status = 'sent') AS sent, \
             COUNT(*) FILTER (WHERE status = 'accepted') AS accepted, \
             COUNT(*) FILTER (WHERE status = 'rejected') AS rejected, \
             COUNT(*) FILTER (WHERE status = 'expired') AS expired, \
             COALESCE(SUM(total_amount) FILTER (WHERE status = 'accepted'), 0)::NUMERIC(12, 2) \
                 AS accepted_value \
             FROM quote",
        )
        .fetch_one(self.pool)
        .await?;

        let appointments = AppointmentRepository::new(self.pool).stats(today).await?;

        Ok(DashboardStats {
            products,
            quotes,
            appointments,
        })
    }
}
