//! Quote repository.
//!
//! Every write that touches more than one row runs in a single transaction:
//! creating a quote with its lines, replacing lines and re-pricing, the
//! accepted-quote delete guard, and sending.

use std::collections::HashMap;

use chrono::{Days, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tireshop_core::listing::{PageRequest, Sort, SortColumns, SortOrder};
use tireshop_core::pricing::{LineInput, compute_totals};
use tireshop_core::reference::{ReferenceKind, ReferenceNumber};
use tireshop_core::{Money, ProductId, QuoteId, QuoteStatus, ServiceId, UserId};

use super::RepositoryError;
use super::listing::{Conditions, push_page};
use crate::models::quote::{
    DEFAULT_VALIDITY_DAYS, QuoteCustomer, QuoteFilter, QuoteItem, QuoteItemInput,
};
use crate::models::{NewQuote, Quote, QuotePatch, QuoteRequest, QuoteWithItems};

/// Sort keys accepted by quote lists.
pub const SORT_COLUMNS: SortColumns = SortColumns {
    allowed: &[
        ("quoteNumber", "q.quote_number"),
        ("customerName", "q.customer_name"),
        ("status", "q.status"),
        ("totalAmount", "q.total_amount"),
        ("validUntil", "q.valid_until"),
        ("createdAt", "q.created_at"),
    ],
    default_column: "q.created_at",
    default_order: SortOrder::Desc,
};

const SELECT_QUOTE: &str = "SELECT q.id, q.quote_number, q.customer_name, q.customer_email, \
     q.customer_phone, q.vehicle_make, q.vehicle_model, q.vehicle_year, q.notes, q.status, \
     q.subtotal, q.tax_amount, q.discount_amount, q.total_amount, q.valid_until, q.sent_at, \
     q.user_id, \
     (SELECT COUNT(*) FROM quote_item qi WHERE qi.quote_id = q.id) AS item_count, \
     q.created_at, q.updated_at \
     FROM quote q";

const SELECT_ITEMS: &str = "SELECT id, quote_id, product_id, service_id, description, \
     quantity, unit_price, total_price, position \
     FROM quote_item WHERE quote_id = $1 ORDER BY position, id";

const NUMBER_TAKEN: &str = "Quote number already exists, please retry";

fn push_filters<'q>(builder: &mut QueryBuilder<'q, Postgres>, filter: &'q QuoteFilter) {
    let mut cond = Conditions::new(builder);
    if let Some(status) = filter.status {
        cond.eq("q.status", status);
    }
    if let Some(term) = &filter.search {
        cond.search(&["q.quote_number", "q.customer_name", "q.customer_email"], term);
    }
}

fn lines(items: &[QuoteItemInput]) -> Vec<LineInput> {
    items.iter().map(QuoteItemInput::line).collect()
}

fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

async fn insert_items(
    conn: &mut PgConnection,
    quote_id: QuoteId,
    items: &[QuoteItemInput],
    line_totals: &[Money],
) -> Result<(), RepositoryError> {
    if items.is_empty() {
        return Ok(());
    }
    let mut insert = QueryBuilder::<Postgres>::new(
        "INSERT INTO quote_item \
         (quote_id, product_id, service_id, description, quantity, unit_price, total_price, position) ",
    );
    insert.push_values(
        items.iter().zip(line_totals).enumerate(),
        |mut row, (index, (item, total))| {
            row.push_bind(quote_id)
                .push_bind(item.product_id)
                .push_bind(item.service_id)
                .push_bind(item.description.trim().to_string())
                .push_bind(item.quantity)
                .push_bind(item.unit_price)
                .push_bind(*total)
                .push_bind(position(index));
        },
    );
    insert
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "A quote line references a missing product or service"))?;
    Ok(())
}

/// Insert a quote and its lines, pricing them on the way in.
async fn insert_quote(
    conn: &mut PgConnection,
    number: &ReferenceNumber,
    customer: &QuoteCustomer,
    items: &[QuoteItemInput],
    discount: Money,
    valid_until: Option<chrono::NaiveDate>,
    user_id: Option<UserId>,
) -> Result<QuoteId, RepositoryError> {
    let totals = compute_totals(&lines(items), discount)?;
    let valid_until = valid_until.or_else(|| {
        Utc::now()
            .date_naive()
            .checked_add_days(Days::new(DEFAULT_VALIDITY_DAYS))
    });

    let id: QuoteId = sqlx::query_scalar(
        "INSERT INTO quote (quote_number, customer_name, customer_email, customer_phone, \
         vehicle_make, vehicle_model, vehicle_year, notes, status, subtotal, tax_amount, \
         discount_amount, total_amount, valid_until, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING id",
    )
    .bind(number.as_str())
    .bind(customer.customer_name.trim())
    .bind(customer.customer_email.trim().to_ascii_lowercase())
    .bind(&customer.customer_phone)
    .bind(&customer.vehicle_make)
    .bind(&customer.vehicle_model)
    .bind(customer.vehicle_year)
    .bind(&customer.notes)
    .bind(QuoteStatus::Pending)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(totals.discount_amount)
    .bind(totals.total_amount)
    .bind(valid_until)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, NUMBER_TAKEN))?;

    insert_items(conn, id, items, &totals.line_totals).await?;
    Ok(id)
}

#[derive(sqlx::FromRow)]
struct PricedProduct {
    id: ProductId,
    name: String,
    size: Option<String>,
    price: Money,
}

#[derive(sqlx::FromRow)]
struct PricedService {
    id: ServiceId,
    name: String,
    base_price: Money,
}

/// Repository for quote database operations.
pub struct QuoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> QuoteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of quotes (without lines) plus the total matching count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &QuoteFilter,
        sort: Sort,
        page: PageRequest,
    ) -> Result<(Vec<Quote>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM quote q");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(SELECT_QUOTE);
        push_filters(&mut query, filter);
        push_page(&mut query, sort, page);
        let quotes = query.build_query_as::<Quote>().fetch_all(self.pool).await?;

        Ok((quotes, total))
    }

    /// A quote with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: QuoteId) -> Result<Option<QuoteWithItems>, RepositoryError> {
        let Some(quote) = sqlx::query_as::<_, Quote>(&format!("{SELECT_QUOTE} WHERE q.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, QuoteItem>(SELECT_ITEMS)
            .bind(id)
            .fetch_all(self.pool)
            .await?;
        Ok(Some(QuoteWithItems { quote, items }))
    }

    async fn load(&self, id: QuoteId) -> Result<QuoteWithItems, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Create an admin-priced quote with a freshly generated number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Pricing` for lines or a discount that cannot
    /// be priced, or `RepositoryError::Conflict` on a quote-number collision.
    pub async fn create(
        &self,
        new: &NewQuote,
        user_id: Option<UserId>,
    ) -> Result<QuoteWithItems, RepositoryError> {
        self.create_with_number(&ReferenceNumber::generate(ReferenceKind::Quote), new, user_id)
            .await
    }

    /// Create a quote under a caller-chosen number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the number is already used.
    pub async fn create_with_number(
        &self,
        number: &ReferenceNumber,
        new: &NewQuote,
        user_id: Option<UserId>,
    ) -> Result<QuoteWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_quote(
            &mut tx,
            number,
            &new.customer,
            &new.items,
            new.discount_amount,
            new.valid_until,
            user_id,
        )
        .await?;
        tx.commit().await?;
        self.load(id).await
    }

    /// Create a quote from a public request, pricing each line from the
    /// catalog inside the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Rejected` if a requested product or service
    /// does not exist or is inactive.
    pub async fn create_from_request(
        &self,
        request: &QuoteRequest,
        user_id: Option<UserId>,
    ) -> Result<QuoteWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product_ids: Vec<i32> = request
            .items
            .iter()
            .filter_map(|i| i.product_id.map(|p| p.as_i32()))
            .collect();
        let service_ids: Vec<i32> = request
            .items
            .iter()
            .filter_map(|i| i.service_id.map(|s| s.as_i32()))
            .collect();

        let products: HashMap<ProductId, PricedProduct> = sqlx::query_as::<_, PricedProduct>(
            "SELECT id, name, size, price FROM product WHERE id = ANY($1) AND is_active",
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let services: HashMap<ServiceId, PricedService> = sqlx::query_as::<_, PricedService>(
            "SELECT id, name, base_price FROM service WHERE id = ANY($1) AND is_active",
        )
        .bind(&service_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

        let mut items = Vec::with_capacity(request.items.len());
        for requested in &request.items {
            let item = match (requested.product_id, requested.service_id) {
                (Some(product_id), _) => {
                    let product = products.get(&product_id).ok_or_else(|| {
                        RepositoryError::Rejected(format!("Product {product_id} is not available"))
                    })?;
                    QuoteItemInput {
                        product_id: Some(product_id),
                        service_id: None,
                        description: product.size.as_ref().map_or_else(
                            || product.name.clone(),
                            |size| format!("{} {size}", product.name),
                        ),
                        quantity: requested.quantity,
                        unit_price: product.price,
                    }
                }
                (None, Some(service_id)) => {
                    let service = services.get(&service_id).ok_or_else(|| {
                        RepositoryError::Rejected(format!("Service {service_id} is not available"))
                    })?;
                    QuoteItemInput {
                        product_id: None,
                        service_id: Some(service_id),
                        description: service.name.clone(),
                        quantity: requested.quantity,
                        unit_price: service.base_price,
                    }
                }
                (None, None) => {
                    return Err(RepositoryError::Rejected(
                        "Each item must reference a product or a service".to_string(),
                    ));
                }
            };
            items.push(item);
        }

        let id = insert_quote(
            &mut tx,
            &ReferenceNumber::generate(ReferenceKind::Quote),
            &request.customer,
            &items,
            Money::ZERO,
            None,
            user_id,
        )
        .await?;
        tx.commit().await?;
        self.load(id).await
    }

    /// Lock the quote, merge the patch, optionally replace lines, re-price
    /// when lines or discount changed, write back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound`, `RepositoryError::Invalid` for a
    /// forbidden status change, or `RepositoryError::Pricing`.
    pub async fn update(
        &self,
        id: QuoteId,
        patch: QuotePatch,
    ) -> Result<QuoteWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut quote = sqlx::query_as::<_, Quote>(&format!(
            "{SELECT_QUOTE} WHERE q.id = $1 FOR UPDATE OF q"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let pending = patch
            .apply(&mut quote, Utc::now())
            .map_err(RepositoryError::Invalid)?;

        if pending.reprice {
            let totals = match &pending.items {
                Some(items) => {
                    let totals = compute_totals(&lines(items), quote.discount_amount)?;
                    sqlx::query("DELETE FROM quote_item WHERE quote_id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                    insert_items(&mut tx, id, items, &totals.line_totals).await?;
                    totals
                }
                None => {
                    let current: Vec<(i32, Money)> = sqlx::query_as(
                        "SELECT quantity, unit_price FROM quote_item \
                         WHERE quote_id = $1 ORDER BY position, id",
                    )
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;
                    let current: Vec<LineInput> = current
                        .into_iter()
                        .map(|(qty, price)| LineInput::new(u32::try_from(qty).unwrap_or(0), price))
                        .collect();
                    compute_totals(&current, quote.discount_amount)?
                }
            };
            quote.subtotal = totals.subtotal;
            quote.tax_amount = totals.tax_amount;
            quote.discount_amount = totals.discount_amount;
            quote.total_amount = totals.total_amount;
        }

        sqlx::query(
            "UPDATE quote SET customer_name = $2, customer_email = $3, customer_phone = $4, \
             vehicle_make = $5, vehicle_model = $6, vehicle_year = $7, notes = $8, status = $9, \
             subtotal = $10, tax_amount = $11, discount_amount = $12, total_amount = $13, \
             valid_until = $14, sent_at = $15, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&quote.customer_name)
        .bind(&quote.customer_email)
        .bind(&quote.customer_phone)
        .bind(&quote.vehicle_make)
        .bind(&quote.vehicle_model)
        .bind(quote.vehicle_year)
        .bind(&quote.notes)
        .bind(quote.status)
        .bind(quote.subtotal)
        .bind(quote.tax_amount)
        .bind(quote.discount_amount)
        .bind(quote.total_amount)
        .bind(quote.valid_until)
        .bind(quote.sent_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load(id).await
    }

    /// Delete a quote and its lines unless it was accepted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the quote does not exist, or
    /// `RepositoryError::Rejected` if it is accepted.
    pub async fn delete(&self, id: QuoteId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status: QuoteStatus =
            sqlx::query_scalar("SELECT status FROM quote WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !status.is_deletable() {
            return Err(RepositoryError::Rejected(
                "Accepted quotes cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM quote WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Mark a pending (or re-send a sent) quote as sent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the quote does not exist, or
    /// `RepositoryError::Rejected` if its status does not allow sending.
    pub async fn mark_sent(&self, id: QuoteId) -> Result<QuoteWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let status: QuoteStatus =
            sqlx::query_scalar("SELECT status FROM quote WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !status.is_sendable() {
            return Err(RepositoryError::Rejected(format!(
                "A {status} quote cannot be sent"
            )));
        }

        sqlx::query(
            "UPDATE quote SET status = $2, sent_at = now(), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(QuoteStatus::Sent)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load(id).await
    }
}
