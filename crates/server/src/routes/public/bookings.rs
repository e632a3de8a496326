//! Public quote requests and appointment bookings.
//!
//! A logged-in customer's id is attached to what they submit; anonymous
//! submissions are accepted too.

use axum::extract::State;

use crate::db::{AppointmentRepository, QuoteRepository};
use crate::error::Result;
use crate::extract::ValidJson;
use crate::middleware::OptionalUser;
use crate::models::{Appointment, NewAppointment, QuoteRequest, QuoteWithItems};
use crate::response::ApiResponse;
use crate::services::email::{OutgoingEmail, send_logged};
use crate::state::AppState;

/// `POST /api/quotes` - lines are priced from the current catalog.
pub async fn request_quote(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ValidJson(request): ValidJson<QuoteRequest>,
) -> Result<ApiResponse<QuoteWithItems>> {
    let quote = QuoteRepository::new(state.pool())
        .create_from_request(&request, user.map(|u| u.id))
        .await?;

    tracing::info!(
        quote_id = %quote.quote.id,
        quote_number = %quote.quote.quote_number,
        items = quote.items.len(),
        "Quote requested"
    );
    Ok(ApiResponse::created(quote)
        .with_message("Quote request received, we will get back to you shortly"))
}

/// `POST /api/appointments`
pub async fn book_appointment(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ValidJson(new): ValidJson<NewAppointment>,
) -> Result<ApiResponse<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .create(&new, user.map(|u| u.id))
        .await?;

    tracing::info!(
        appointment_id = %appointment.id,
        appointment_number = %appointment.appointment_number,
        date = %appointment.scheduled_date,
        "Appointment booked"
    );

    send_logged(
        state.mailer(),
        OutgoingEmail::appointment_confirmation(&appointment, &state.config().base_url),
    )
    .await;

    Ok(ApiResponse::created(appointment).with_message("Appointment booked"))
}
