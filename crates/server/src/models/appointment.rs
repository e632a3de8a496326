//! Service appointments.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tireshop_core::{AppointmentId, AppointmentStatus, Email, ServiceId, UserId};

use super::{ListParams, enum_filter};
use crate::error::AppError;
use crate::validation::{FieldErrors, Validate};

/// Booking length when neither the payload nor the service gives one.
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// How far ahead the public can book.
pub const MAX_BOOKING_DAYS_AHEAD: i64 = 180;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub appointment_number: String,
    pub service_id: Option<ServiceId>,
    pub service_name: Option<String>,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub license_plate: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin `GET /api/admin/appointments` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    #[serde(flatten)]
    pub list: ListParams,
    pub status: Option<String>,
    /// Exact day, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub search: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn date_filter(raw: Option<&str>, param: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid {param}: {value}"))),
    }
}

impl AppointmentQuery {
    /// `date` pins both ends of the range.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown `status` or a malformed date.
    pub fn filter(&self) -> Result<AppointmentFilter, AppError> {
        let status = enum_filter(self.status.as_deref(), "status")?;
        let (date_from, date_to) = match date_filter(self.date.as_deref(), "date")? {
            Some(day) => (Some(day), Some(day)),
            None => (
                date_filter(self.date_from.as_deref(), "dateFrom")?,
                date_filter(self.date_to.as_deref(), "dateTo")?,
            ),
        };
        Ok(AppointmentFilter {
            search: self.list.search_term(),
            status,
            date_from,
            date_to,
        })
    }
}

/// `POST /api/appointments`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub service_id: Option<ServiceId>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_year: Option<i32>,
    pub license_plate: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Defaults to the service's duration.
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Field problems given the current day.
    ///
    /// # Errors
    ///
    /// Returns every field that failed.
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required_text("customerName", &self.customer_name, 200);
        if let Err(e) = Email::parse(&self.customer_email) {
            errors.add("customerEmail", e.to_string());
        }
        errors.required_text("customerPhone", &self.customer_phone, 40);
        errors.max_len("vehicleMake", self.vehicle_make.as_deref(), 100);
        errors.max_len("vehicleModel", self.vehicle_model.as_deref(), 100);
        errors.vehicle_year("vehicleYear", self.vehicle_year);
        errors.max_len("licensePlate", self.license_plate.as_deref(), 20);
        errors.positive_int("durationMinutes", self.duration_minutes);
        errors.max_len("notes", self.notes.as_deref(), 2000);
        if self.scheduled_date < today {
            errors.add("scheduledDate", "cannot be in the past");
        } else if (self.scheduled_date - today).num_days() > MAX_BOOKING_DAYS_AHEAD {
            errors.add(
                "scheduledDate",
                format!("must be within {MAX_BOOKING_DAYS_AHEAD} days"),
            );
        }
        errors.finish()
    }
}

impl Validate for NewAppointment {
    fn validate(&self) -> Result<(), FieldErrors> {
        self.validate_on(Utc::now().date_naive())
    }
}

/// `PUT /api/admin/appointments/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub service_id: Option<Option<ServiceId>>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_make: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_model: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub vehicle_year: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub license_plate: Option<Option<String>>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub admin_notes: Option<Option<String>>,
}

impl Validate for AppointmentPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.optional_text("customerName", self.customer_name.as_deref(), 200);
        errors.optional_text("customerPhone", self.customer_phone.as_deref(), 40);
        if let Some(email) = &self.customer_email
            && let Err(e) = Email::parse(email)
        {
            errors.add("customerEmail", e.to_string());
        }
        errors.vehicle_year("vehicleYear", self.vehicle_year.flatten());
        errors.positive_int("durationMinutes", self.duration_minutes);
        errors.max_len("adminNotes", self.admin_notes.as_ref().and_then(Option::as_deref), 5000);
        errors.finish()
    }
}

impl AppointmentPatch {
    /// Merge onto the locked row.
    ///
    /// # Errors
    ///
    /// Returns a `status` field error when the lifecycle forbids the move.
    pub fn apply(self, appointment: &mut Appointment) -> Result<(), FieldErrors> {
        if let Some(next) = self.status {
            if !appointment.status.can_transition_to(next) {
                let mut errors = FieldErrors::new();
                errors.add(
                    "status",
                    format!("cannot change from {} to {next}", appointment.status),
                );
                return Err(errors);
            }
            appointment.status = next;
        }
        if let Some(service_id) = self.service_id {
            appointment.service_id = service_id;
        }
        if let Some(name) = self.customer_name {
            appointment.customer_name = name.trim().to_string();
        }
        if let Some(email) = self.customer_email {
            appointment.customer_email = email.trim().to_ascii_lowercase();
        }
        if let Some(phone) = self.customer_phone {
            appointment.customer_phone = phone.trim().to_string();
        }
        if let Some(make) = self.vehicle_make {
            appointment.vehicle_make = make;
        }
        if let Some(model) = self.vehicle_model {
            appointment.vehicle_model = model;
        }
        if let Some(year) = self.vehicle_year {
            appointment.vehicle_year = year;
        }
        if let Some(plate) = self.license_plate {
            appointment.license_plate = plate;
        }
        if let Some(date) = self.scheduled_date {
            appointment.scheduled_date = date;
        }
        if let Some(time) = self.scheduled_time {
            appointment.scheduled_time = time;
        }
        if let Some(duration) = self.duration_minutes {
            appointment.duration_minutes = duration;
        }
        if let Some(notes) = self.notes {
            appointment.notes = notes;
        }
        if let Some(admin_notes) = self.admin_notes {
            appointment.admin_notes = admin_notes;
        }
        Ok(())
    }
}

/// Counts behind `GET /api/admin/appointments/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStats {
    pub total: i64,
    pub scheduled: i64,
    pub confirmed: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    /// Non-cancelled appointments on the current day.
    pub today: i64,
    /// Scheduled or confirmed, from today on.
    pub upcoming: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn booking_json(date: &str) -> String {
        format!(
            r#"{{"serviceId": 3, "customerName": "Luis", "customerEmail": "luis@example.com",
                "customerPhone": "+34 600 000 000", "scheduledDate": "{date}",
                "scheduledTime": "09:30:00"}}"#
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_booking_accepts_future_date() {
        let new: NewAppointment = serde_json::from_str(&booking_json("2026-10-20")).unwrap();
        assert!(new.validate_on(today()).is_ok());
        assert_eq!(new.scheduled_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(new.duration_minutes, None);
    }

    #[test]
    fn test_booking_rejects_past_and_far_dates() {
        let past: NewAppointment = serde_json::from_str(&booking_json("2026-10-18")).unwrap();
        assert_eq!(
            past.validate_on(today()).unwrap_err().get("scheduledDate"),
            Some("cannot be in the past")
        );

        let far: NewAppointment = serde_json::from_str(&booking_json("2027-10-19")).unwrap();
        assert!(far.validate_on(today()).unwrap_err().get("scheduledDate").is_some());
    }

    #[test]
    fn test_booking_requires_contact() {
        let new: NewAppointment = serde_json::from_str(
            r#"{"customerName": " ", "customerEmail": "x", "customerPhone": "",
                "scheduledDate": "2026-10-19", "scheduledTime": "10:00:00"}"#,
        )
        .unwrap();
        let errors = new.validate_on(today()).unwrap_err();
        assert!(errors.get("customerName").is_some());
        assert!(errors.get("customerEmail").is_some());
        assert!(errors.get("customerPhone").is_some());
        assert_eq!(errors.get("scheduledDate"), None);
    }

    #[test]
    fn test_patch_rejects_leaving_terminal_state() {
        let new: NewAppointment = serde_json::from_str(&booking_json("2026-10-20")).unwrap();
        let mut appointment = Appointment {
            id: AppointmentId::new(1),
            appointment_number: "A-1-00000000".to_string(),
            service_id: new.service_id,
            service_name: None,
            user_id: None,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_phone: new.customer_phone,
            vehicle_make: None,
            vehicle_model: None,
            vehicle_year: None,
            license_plate: None,
            scheduled_date: new.scheduled_date,
            scheduled_time: new.scheduled_time,
            duration_minutes: 60,
            status: AppointmentStatus::Completed,
            notes: None,
            admin_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let patch: AppointmentPatch = serde_json::from_str(r#"{"status": "scheduled"}"#).unwrap();
        assert!(patch.apply(&mut appointment).is_err());

        let patch: AppointmentPatch =
            serde_json::from_str(r#"{"adminNotes": "paid in cash"}"#).unwrap();
        patch.apply(&mut appointment).unwrap();
        assert_eq!(appointment.admin_notes.as_deref(), Some("paid in cash"));
    }

    #[test]
    fn test_query_date_pins_range() {
        let query = AppointmentQuery {
            date: Some("2026-10-19".to_string()),
            date_from: Some("2020-01-01".to_string()),
            ..AppointmentQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.date_from, Some(today()));
        assert_eq!(filter.date_to, Some(today()));

        let bad = AppointmentQuery {
            date_to: Some("19/10/2026".to_string()),
            ..AppointmentQuery::default()
        };
        assert!(bad.filter().is_err());
    }
}
