//! Appointment repository.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};
use tireshop_core::reference::{ReferenceKind, ReferenceNumber};
use tireshop_core::{AppointmentId, AppointmentStatus, UserId};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::appointment::{AppointmentFilter, DEFAULT_DURATION_MINUTES};
use crate::models::{Appointment, AppointmentPatch, AppointmentStats, NewAppointment};

/// Sort keys accepted by appointment lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("appointmentNumber", "a.appointment_number"),
        ("customerName", "a.customer_name"),
        ("scheduledDate", "a.scheduled_date"),
        ("scheduledTime", "a.scheduled_time"),
        ("status", "a.status"),
        ("createdAt", "a.created_at"),
    ],
    default_column: "a.scheduled_date",
    default_order: SortOrder::Desc,
};

const FROM_APPOINTMENT: &str =
    " FROM appointment a LEFT JOIN service s ON s.id = a.service_id";

const APPOINTMENT_COLUMNS: &str = "SELECT a.id, a.appointment_number, a.service_id, \
     s.name AS service_name, a.user_id, a.customer_name, a.customer_email, a.customer_phone, \
     a.vehicle_make, a.vehicle_model, a.vehicle_year, a.license_plate, a.scheduled_date, \
     a.scheduled_time, a.duration_minutes, a.status, a.notes, a.admin_notes, \
     a.created_at, a.updated_at";

const NUMBER_TAKEN: &str = "Appointment number already exists, please retry";

fn select_appointment() -> String {
    format!("{APPOINTMENT_COLUMNS}{FROM_APPOINTMENT}")
}

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q AppointmentFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(status) = filter.status {
        cond.eq("a.status", status);
    }
    if let Some(from) = filter.date_from {
        cond.gte("a.scheduled_date", from);
    }
    if let Some(to) = filter.date_to {
        cond.lte("a.scheduled_date", to);
    }
    if let Some(term) = &filter.search {
        cond.search(
            &[
                "a.appointment_number",
                "a.customer_name",
                "a.customer_email",
                "a.license_plate",
            ],
            term,
        );
    }
}

/// Repository for appointment database operations.
pub struct AppointmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of appointments plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Appointment>, i64), RepositoryError> {
        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM_APPOINTMENT}"));
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(select_appointment());
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let appointments = query
            .build_query_as::<Appointment>()
            .fetch_all(self.pool)
            .await?;

        Ok((appointments, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "{} WHERE a.id = $1",
            select_appointment()
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(appointment)
    }

    /// Book an appointment with a freshly generated number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Rejected` if the service is unknown or
    /// inactive, or `RepositoryError::Conflict` on a number collision.
    pub async fn create(
        &self,
        new: &NewAppointment,
        user_id: Option<UserId>,
    ) -> Result<Appointment, RepositoryError> {
        self.create_with_number(
            &ReferenceNumber::generate(ReferenceKind::Appointment),
            new,
            user_id,
        )
        .await
    }

    /// Book an appointment under a caller-chosen number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the number is already used.
    pub async fn create_with_number(
        &self,
        number: &ReferenceNumber,
        new: &NewAppointment,
        user_id: Option<UserId>,
    ) -> Result<Appointment, RepositoryError> {
        let service_duration = match new.service_id {
            Some(service_id) => Some(
                sqlx::query_scalar::<_, i32>(
                    "SELECT duration_minutes FROM service WHERE id = $1 AND is_active",
                )
                .bind(service_id)
                .fetch_optional(self.pool)
                .await?
                .ok_or_else(|| {
                    RepositoryError::Rejected(format!("Service {service_id} is not available"))
                })?,
            ),
            None => None,
        };
        let duration = new
            .duration_minutes
            .or(service_duration)
            .unwrap_or(DEFAULT_DURATION_MINUTES);

        let id: AppointmentId = sqlx::query_scalar(
            "INSERT INTO appointment (appointment_number, service_id, user_id, customer_name, \
             customer_email, customer_phone, vehicle_make, vehicle_model, vehicle_year, \
             license_plate, scheduled_date, scheduled_time, duration_minutes, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING id",
        )
        .bind(number.as_str())
        .bind(new.service_id)
        .bind(user_id)
        .bind(new.customer_name.trim())
        .bind(new.customer_email.trim().to_ascii_lowercase())
        .bind(new.customer_phone.trim())
        .bind(&new.vehicle_make)
        .bind(&new.vehicle_model)
        .bind(new.vehicle_year)
        .bind(&new.license_plate)
        .bind(new.scheduled_date)
        .bind(new.scheduled_time)
        .bind(duration)
        .bind(AppointmentStatus::Scheduled)
        .bind(&new.notes)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, NUMBER_TAKEN))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Lock, merge (enforcing the status lifecycle), write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Invalid` for
    /// a forbidden status change.
    pub async fn update(
        &self,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut appointment = sqlx::query_as::<_, Appointment>(&format!(
            "{} WHERE a.id = $1 FOR UPDATE OF a",
            select_appointment()
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        patch.apply(&mut appointment).map_err(RepositoryError::Invalid)?;

        sqlx::query(
            "UPDATE appointment SET service_id = $2, customer_name = $3, customer_email = $4, \
             customer_phone = $5, vehicle_make = $6, vehicle_model = $7, vehicle_year = $8, \
             license_plate = $9, scheduled_date = $10, scheduled_time = $11, \
             duration_minutes = $12, status = $13, notes = $14, admin_notes = $15, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(appointment.service_id)
        .bind(&appointment.customer_name)
        .bind(&appointment.customer_email)
        .bind(&appointment.customer_phone)
        .bind(&appointment.vehicle_make)
        .bind(&appointment.vehicle_model)
        .bind(appointment.vehicle_year)
        .bind(&appointment.license_plate)
        .bind(appointment.scheduled_date)
        .bind(appointment.scheduled_time)
        .bind(appointment.duration_minutes)
        .bind(appointment.status)
        .bind(&appointment.notes)
        .bind(&appointment.admin_notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "The selected service does not exist"))?;

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the appointment does not exist.
    pub async fn delete(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM appointment WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Status counts plus today's and upcoming bookings, relative to `today`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, today: NaiveDate) -> Result<AppointmentStats, RepositoryError> {
        let stats = sqlx::query_as::<_, AppointmentStats>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'scheduled') AS scheduled, \
             COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed, \
             COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress, \
             COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
             COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled, \
             COUNT(*) FILTER (WHERE status = 'no-show') AS no_show, \
             COUNT(*) FILTER (WHERE scheduled_date = $1 AND status <> 'cancelled') AS today, \
             COUNT(*) FILTER (WHERE scheduled_date >= $1 \
                              AND status IN ('scheduled', 'confirmed')) AS upcoming \
             FROM appointment",
        )
        .bind(today)
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_filters() {
        let filter = AppointmentFilter {
            search: None,
            status: Some(AppointmentStatus::Confirmed),
            date_from: NaiveDate::from_ymd_opt(2026, 10, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 10, 31),
        };
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){FROM_APPOINTMENT}"));
        push_filters(&mut qb, &filter);
        assert!(qb.sql().ends_with(
            "WHERE a.status = $1 AND a.scheduled_date >= $2 AND a.scheduled_date <= $3"
        ));
    }

    #[test]
    fn test_sort_fallback() {
        assert_eq!(
            SORT_COLUMNS.resolve(Some("admin_notes"), Some("asc")).to_sql(),
            "a.scheduled_date ASC"
        );
    }
}
