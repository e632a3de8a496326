//! Quote management.
//!
//! Totals are recomputed server-side whenever lines or the discount change;
//! client-sent totals are never trusted.

use axum::extract::State;
use tireshop_core::QuoteId;

use crate::db::{QuoteRepository, quotes::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::quote::QuoteQuery;
use crate::models::{Audience, NewQuote, Quote, QuotePatch, QuoteWithItems};
use crate::response::ApiResponse;
use crate::services::email::{OutgoingEmail, send_logged};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuoteQuery>,
) -> Result<ApiResponse<Vec<Quote>>> {
    let filter = query.filter()?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = QuoteRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<QuoteId>,
) -> Result<ApiResponse<QuoteWithItems>> {
    let quote = QuoteRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Quote"))?;
    Ok(ApiResponse::ok(quote))
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(new): ValidJson<NewQuote>,
) -> Result<ApiResponse<QuoteWithItems>> {
    let quote = QuoteRepository::new(state.pool()).create(&new, None).await?;

    tracing::info!(
        quote_id = %quote.quote.id,
        quote_number = %quote.quote.quote_number,
        total = %quote.quote.total_amount,
        "Quote created"
    );
    Ok(ApiResponse::created(quote).with_message("Quote created"))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<QuoteId>,
    ValidJson(patch): ValidJson<QuotePatch>,
) -> Result<ApiResponse<QuoteWithItems>> {
    let quote = QuoteRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Quote"))?;
    Ok(ApiResponse::ok(quote).with_message("Quote updated"))
}

/// Accepted quotes are kept (400).
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<QuoteId>,
) -> Result<ApiResponse<serde_json::Value>> {
    QuoteRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Quote"))?;
    tracing::info!(quote_id = %id, "Quote deleted");
    Ok(ApiResponse::message_only("Quote deleted"))
}

/// `POST /api/admin/quotes/{id}/send` - mark as sent and email the customer.
///
/// The status change sticks even when the email cannot be delivered.
pub async fn send(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<QuoteId>,
) -> Result<ApiResponse<QuoteWithItems>> {
    let quote = QuoteRepository::new(state.pool())
        .mark_sent(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Quote"))?;

    send_logged(
        state.mailer(),
        OutgoingEmail::quote_sent(&quote, &state.config().base_url),
    )
    .await;

    tracing::info!(
        quote_id = %id,
        quote_number = %quote.quote.quote_number,
        "Quote sent"
    );
    Ok(ApiResponse::ok(quote).with_message("Quote sent"))
}
