//! Quote negotiation service
//!
//! The authoritative side of the negotiation workflow. Every mutation runs in
//! one transaction that locks the quotes of the affected order, replays the
//! shared state machine on them and writes back the result together with any
//! order stage change.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use shared::{
    check_existing, default_active_statuses, format_quote_number, validate_currency,
    validate_email, validate_items, validate_tax_rate, validate_valid_until, CreateQuoteRequest, ExistingQuoteCheck,
    ExistingQuoteQuery, IssueTarget, NegotiationError, NegotiationOutcome, NegotiationResult,
    NewQuote, OrderStageSignal, PaginatedResponse, Pagination, PaginationMeta, Party,
    QuoteListFilters, QuoteStateMachine, QuoteStatistics, ReviseQuoteRequest, SortOrder,
    StatusCount,
};
use sqlx::{types::Json, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::config::QuotesConfig;
use crate::error::{AppError, AppResult};
use crate::models::{quotes_from_rows, Actor, Quote, QuoteRow, QuoteStatus, QUOTE_COLUMNS};
use crate::services::order::OrderStageService;

/// Partial unique index guarding one occupying quote per order and vendor
const OCCUPYING_INDEX: &str = "quotes_one_occupying_per_order_vendor";

/// Status as readers see it: lapsed quotes count as expired before the lapse
/// is written back
const EFFECTIVE_STATUS_SQL: &str = "(CASE WHEN status IN ('open', 'sent', 'countered', 'revised') \
     AND valid_until <= NOW() THEN 'expired' ELSE status END)";

/// Quote service for negotiation and persistence
#[derive(Clone)]
pub struct QuoteService {
    db: PgPool,
    defaults: QuotesConfig,
}

impl QuoteService {
    /// Create a new QuoteService instance
    pub fn new(db: PgPool, defaults: QuotesConfig) -> Self {
        Self { db, defaults }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Paginated, filtered list of the tenant's quotes
    pub async fn list_quotes(
        &self,
        tenant_id: Uuid,
        filters: QuoteListFilters,
    ) -> AppResult<PaginatedResponse<Quote>> {
        let pagination = Pagination::new(
            filters.page.unwrap_or(1),
            filters.per_page.unwrap_or(shared::DEFAULT_PER_PAGE),
        );

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quotes");
        push_filters(&mut count_query, tenant_id, &filters);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let sort_column = sort_column(filters.sort_by.as_deref());
        let sort_order = filters
            .sort_order
            .as_deref()
            .and_then(SortOrder::from_str)
            .unwrap_or_default();

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM quotes", QUOTE_COLUMNS));
        push_filters(&mut query, tenant_id, &filters);
        query.push(format!(" ORDER BY {} {}, id", sort_column, sort_order.as_sql()));
        query.push(" LIMIT ").push_bind(i64::from(pagination.per_page));
        query.push(" OFFSET ").push_bind(pagination.offset() as i64);

        let rows: Vec<QuoteRow> = query.build_query_as().fetch_all(&self.db).await?;
        let mut quotes = quotes_from_rows(rows)?;
        self.record_lapses(tenant_id, &mut quotes).await?;

        Ok(PaginatedResponse {
            data: quotes,
            pagination: PaginationMeta::new(pagination, total.max(0) as u64),
        })
    }

    /// Get a quote, recording a lapse of validity if one is due
    pub async fn get_quote(&self, tenant_id: Uuid, quote_id: Uuid) -> AppResult<Quote> {
        let row: QuoteRow = sqlx::query_as(&format!(
            "SELECT {} FROM quotes WHERE id = $1 AND tenant_id = $2",
            QUOTE_COLUMNS
        ))
        .bind(quote_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

        let mut quotes = vec![Quote::try_from(row)?];
        self.record_lapses(tenant_id, &mut quotes).await?;
        quotes
            .pop()
            .ok_or_else(|| AppError::NotFound("Quote".to_string()))
    }

    /// Look for a quote already holding an order
    pub async fn check_existing(
        &self,
        tenant_id: Uuid,
        query: ExistingQuoteQuery,
    ) -> AppResult<ExistingQuoteCheck> {
        let rows: Vec<QuoteRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM quotes
            WHERE tenant_id = $1 AND order_id = $2 AND ($3::uuid IS NULL OR vendor_id = $3)
            ORDER BY created_at DESC
            "#,
            QUOTE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(query.order_id)
        .bind(query.vendor_id)
        .fetch_all(&self.db)
        .await?;

        let mut quotes = quotes_from_rows(rows)?;
        self.record_lapses(tenant_id, &mut quotes).await?;
        Ok(check_existing(&quotes, &query))
    }

    /// Counts and values per status
    pub async fn statistics(&self, tenant_id: Uuid) -> AppResult<QuoteStatistics> {
        let rows = sqlx::query_as::<_, (String, i64, Decimal)>(&format!(
            r#"
            SELECT {status} AS status, COUNT(*)::BIGINT, COALESCE(SUM(grand_total), 0)
            FROM quotes
            WHERE tenant_id = $1
            GROUP BY {status}
            "#,
            status = EFFECTIVE_STATUS_SQL
        ))
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        let count_of = |status: QuoteStatus| {
            rows.iter()
                .find(|r| r.0 == status.as_str())
                .map(|r| r.1)
                .unwrap_or(0)
        };

        let accepted_value = rows
            .iter()
            .find(|r| r.0 == QuoteStatus::Accepted.as_str())
            .map(|r| r.2)
            .unwrap_or(Decimal::ZERO);

        Ok(QuoteStatistics {
            total: rows.iter().map(|r| r.1).sum(),
            by_status: QuoteStatus::ALL
                .iter()
                .map(|&status| StatusCount {
                    status,
                    count: count_of(status),
                })
                .collect(),
            total_value: rows.iter().map(|r| r.2).sum(),
            accepted_value,
            conversion_rate: QuoteStatistics::conversion_rate(
                count_of(QuoteStatus::Accepted),
                count_of(QuoteStatus::Rejected),
            ),
        })
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a quote, refusing a second occupying quote for the same order
    /// and vendor
    pub async fn create_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        input: CreateQuoteRequest,
    ) -> AppResult<Quote> {
        input.validate()?;
        let now = Utc::now();
        let new_quote = self.new_quote_from(input.clone(), now)?;

        let mut tx = self.db.begin().await?;

        if let Some(order_id) = new_quote.order_id {
            let mut order_quotes = Self::lock_order_quotes(&mut tx, tenant_id, order_id).await?;
            for quote in order_quotes.iter_mut() {
                if QuoteStateMachine::expire_if_due(quote, now) {
                    Self::save(&mut tx, tenant_id, quote).await?;
                }
            }

            let query = ExistingQuoteQuery::for_order(order_id)
                .with_vendor(new_quote.vendor.id)
                .with_statuses(default_active_statuses());
            if let Some(existing) = check_existing(&order_quotes, &query).quote {
                return Err(duplicate_error(&existing.quote_number));
            }
        }

        let sequence = Self::next_sequence(&mut tx, tenant_id, now).await?;
        let mut quote = Quote::draft(new_quote, actor, now);
        quote.quote_number = format_quote_number(now, Some(sequence));
        if let Some(target) = input.issue {
            QuoteStateMachine::issue(&mut quote, actor, target, now)?;
        }

        Self::insert(&mut tx, tenant_id, &quote).await?;
        if let Some(order_id) = quote.order_id {
            OrderStageService::mark_negotiating(&mut tx, tenant_id, order_id, actor.user_id)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            quote_id = %quote.id,
            quote_number = %quote.quote_number,
            status = %quote.status(),
            "Quote created"
        );
        Ok(quote)
    }

    fn new_quote_from(&self, input: CreateQuoteRequest, now: DateTime<Utc>) -> AppResult<NewQuote> {
        validate_items(&input.items).map_err(|m| AppError::validation("items", m))?;
        let tax_rate = input.tax_rate.unwrap_or(self.defaults.default_tax_rate);
        validate_tax_rate(tax_rate).map_err(|m| AppError::validation("tax_rate", m))?;
        let currency = input
            .currency
            .unwrap_or_else(|| self.defaults.default_currency.clone());
        validate_currency(&currency).map_err(|m| AppError::validation("currency", m))?;
        let valid_until = input
            .valid_until
            .unwrap_or_else(|| now + Duration::days(self.defaults.default_validity_days));
        validate_valid_until(valid_until, now)
            .map_err(|m| AppError::validation("valid_until", m))?;
        validate_party("vendor", &input.vendor)?;
        validate_party("customer", &input.customer)?;

        Ok(NewQuote {
            order_id: input.order_id,
            vendor: input.vendor,
            customer: input.customer,
            currency,
            items: input.items,
            tax_rate,
            valid_until,
        })
    }

    // ========================================================================
    // Negotiation actions
    // ========================================================================

    pub async fn issue_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        target: IssueTarget,
    ) -> AppResult<Quote> {
        self.mutate(tenant_id, quote_id, "issue", |quote, now| {
            QuoteStateMachine::issue(quote, actor, target, now)
        })
        .await
    }

    /// Accept a quote, close its siblings and advance the order
    pub async fn accept_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<NegotiationOutcome> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let (mut quote, mut siblings) = Self::lock_with_siblings(&mut tx, tenant_id, quote_id).await?;

        if let Err(err) = QuoteStateMachine::accept(&mut quote, actor, notes, now) {
            return Self::fail(tx, tenant_id, &mut quote, err, now).await;
        }

        let mut affected = Vec::new();
        for sibling in siblings.iter_mut() {
            if QuoteStateMachine::expire_if_due(sibling, now) {
                affected.push(sibling.id);
            }
        }
        affected.extend(QuoteStateMachine::settle_order_after_accept(
            &quote,
            &mut siblings,
            actor,
            now,
        ));

        Self::save(&mut tx, tenant_id, &quote).await?;
        let affected_quotes: Vec<Quote> = siblings
            .into_iter()
            .filter(|s| affected.contains(&s.id))
            .collect();
        for sibling in &affected_quotes {
            Self::save(&mut tx, tenant_id, sibling).await?;
        }

        let order_stage = match quote.order_id {
            Some(order_id) => {
                let signal = OrderStageSignal::advance_for(quote.grand_total());
                OrderStageService::apply(&mut tx, tenant_id, order_id, &signal, actor.user_id)
                    .await?
            }
            None => None,
        };
        tx.commit().await?;

        tracing::info!(
            quote_id = %quote.id,
            closed_siblings = affected_quotes.len(),
            "Quote accepted"
        );
        Ok(NegotiationOutcome {
            data: quote,
            affected_quotes,
            order_stage,
        })
    }

    /// Reject a quote; the order reverts to sourcing once nothing holds it
    pub async fn reject_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        reason: &str,
    ) -> AppResult<NegotiationOutcome> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let (mut quote, siblings) = Self::lock_with_siblings(&mut tx, tenant_id, quote_id).await?;

        if let Err(err) = QuoteStateMachine::reject(&mut quote, actor, reason, now) {
            return Self::fail(tx, tenant_id, &mut quote, err, now).await;
        }
        Self::save(&mut tx, tenant_id, &quote).await?;

        let order_stage = match quote.order_id {
            Some(order_id) => {
                let mut order_quotes = siblings;
                order_quotes.push(quote.clone());
                match shared::order_signal_after_reject(&order_quotes, now) {
                    Some(signal) => {
                        OrderStageService::apply(&mut tx, tenant_id, order_id, &signal, actor.user_id)
                            .await?
                    }
                    None => None,
                }
            }
            None => None,
        };
        tx.commit().await?;

        tracing::info!(quote_id = %quote.id, order_stage = ?order_stage, "Quote rejected");
        Ok(NegotiationOutcome {
            data: quote,
            affected_quotes: Vec::new(),
            order_stage,
        })
    }

    /// Counter the current offer
    pub async fn counter_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        price: Decimal,
        notes: Option<String>,
    ) -> AppResult<NegotiationOutcome> {
        let quote = self
            .mutate(tenant_id, quote_id, "counter", |quote, now| {
                QuoteStateMachine::counter(quote, actor, price, notes, now)
            })
            .await?;

        Ok(NegotiationOutcome {
            data: quote,
            affected_quotes: Vec::new(),
            order_stage: None,
        })
    }

    pub async fn cancel_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<Quote> {
        self.mutate(tenant_id, quote_id, "cancel", |quote, now| {
            QuoteStateMachine::cancel(quote, actor, reason, now)
        })
        .await
    }

    pub async fn revise_quote(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        input: ReviseQuoteRequest,
    ) -> AppResult<Quote> {
        input.validate()?;
        self.mutate(tenant_id, quote_id, "revise", |quote, now| {
            QuoteStateMachine::revise(quote, actor, input.items, input.tax_rate, input.notes, now)
        })
        .await
    }

    pub async fn extend_validity(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        quote_id: Uuid,
        valid_until: DateTime<Utc>,
    ) -> AppResult<Quote> {
        self.mutate(tenant_id, quote_id, "extend", |quote, now| {
            QuoteStateMachine::extend_validity(quote, actor, valid_until, now)
        })
        .await
    }

    // ========================================================================
    // Persistence helpers
    // ========================================================================

    /// Lock one quote, apply a state machine operation and store the result
    async fn mutate<F>(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        action: &'static str,
        apply: F,
    ) -> AppResult<Quote>
    where
        F: FnOnce(&mut Quote, DateTime<Utc>) -> NegotiationResult<()>,
    {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let mut quote = Self::lock_quote(&mut tx, tenant_id, quote_id).await?;

        if let Err(err) = apply(&mut quote, now) {
            return Self::fail(tx, tenant_id, &mut quote, err, now).await;
        }

        Self::save(&mut tx, tenant_id, &quote).await?;
        tx.commit().await?;

        tracing::info!(
            quote_id = %quote.id,
            action,
            status = %quote.status(),
            round = quote.round(),
            "Quote updated"
        );
        Ok(quote)
    }

    /// End a failed action. A lapse of validity found on the way is still
    /// written back; anything else rolls back.
    async fn fail<T>(
        mut tx: sqlx::Transaction<'_, Postgres>,
        tenant_id: Uuid,
        quote: &mut Quote,
        err: NegotiationError,
        now: DateTime<Utc>,
    ) -> AppResult<T> {
        if err == NegotiationError::QuoteExpired && QuoteStateMachine::expire_if_due(quote, now) {
            Self::save(&mut tx, tenant_id, quote).await?;
            tx.commit().await?;
        }
        Err(err.into())
    }

    /// Write back lapses found while reading. Only rows still holding the
    /// status that was read are touched.
    async fn record_lapses(&self, tenant_id: Uuid, quotes: &mut [Quote]) -> AppResult<()> {
        let now = Utc::now();
        for quote in quotes.iter_mut() {
            let previous = quote.status();
            if !QuoteStateMachine::expire_if_due(quote, now) {
                continue;
            }

            sqlx::query(
                r#"
                UPDATE quotes
                SET status = $1, history = $2, updated_at = $3, closed_at = $4
                WHERE id = $5 AND tenant_id = $6 AND status = $7
                "#,
            )
            .bind(quote.status().as_str())
            .bind(Json(quote.history()))
            .bind(quote.updated_at)
            .bind(quote.closed_at)
            .bind(quote.id)
            .bind(tenant_id)
            .bind(previous.as_str())
            .execute(&self.db)
            .await?;

            tracing::debug!(quote_id = %quote.id, "Quote validity lapsed");
        }
        Ok(())
    }

    async fn lock_quote(conn: &mut PgConnection, tenant_id: Uuid, quote_id: Uuid) -> AppResult<Quote> {
        let row: QuoteRow = sqlx::query_as(&format!(
            "SELECT {} FROM quotes WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            QUOTE_COLUMNS
        ))
        .bind(quote_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;

        Quote::try_from(row)
    }

    /// Lock every quote of an order, in id order so concurrent callers queue
    async fn lock_order_quotes(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = sqlx::query_as(&format!(
            "SELECT {} FROM quotes WHERE tenant_id = $1 AND order_id = $2 ORDER BY id FOR UPDATE",
            QUOTE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        quotes_from_rows(rows)
    }

    /// Lock a quote together with the other quotes of its order
    async fn lock_with_siblings(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        quote_id: Uuid,
    ) -> AppResult<(Quote, Vec<Quote>)> {
        let order_id: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT order_id FROM quotes WHERE id = $1 AND tenant_id = $2")
                .bind(quote_id)
                .bind(tenant_id)
                .fetch_optional(&mut *conn)
                .await?;

        match order_id {
            None => Err(AppError::NotFound("Quote".to_string())),
            Some(None) => Ok((Self::lock_quote(conn, tenant_id, quote_id).await?, Vec::new())),
            Some(Some(order_id)) => {
                let mut quotes = Self::lock_order_quotes(conn, tenant_id, order_id).await?;
                let position = quotes
                    .iter()
                    .position(|q| q.id == quote_id)
                    .ok_or_else(|| AppError::NotFound("Quote".to_string()))?;
                let quote = quotes.remove(position);
                Ok((quote, quotes))
            }
        }
    }

    async fn next_sequence(
        conn: &mut PgConnection,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        let sequence = sqlx::query_scalar(
            r#"
            INSERT INTO quote_sequences (tenant_id, period, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, period)
            DO UPDATE SET last_value = quote_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(now.format("%Y%m").to_string())
        .fetch_one(&mut *conn)
        .await?;
        Ok(sequence)
    }

    async fn insert(conn: &mut PgConnection, tenant_id: Uuid, quote: &Quote) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, tenant_id, quote_number, order_id, vendor_id, vendor, customer, currency,
                status, items, tax_rate, grand_total, revision_number, round, valid_until,
                history, created_at, updated_at, closed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(quote.id)
        .bind(tenant_id)
        .bind(&quote.quote_number)
        .bind(quote.order_id)
        .bind(quote.vendor.id)
        .bind(Json(&quote.vendor))
        .bind(Json(&quote.customer))
        .bind(&quote.currency)
        .bind(quote.status().as_str())
        .bind(Json(quote.items()))
        .bind(quote.tax_rate())
        .bind(quote.grand_total())
        .bind(quote.revision_number() as i32)
        .bind(quote.round() as i32)
        .bind(quote.valid_until)
        .bind(Json(quote.history()))
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .bind(quote.closed_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, &quote.quote_number))?;
        Ok(())
    }

    async fn save(conn: &mut PgConnection, tenant_id: Uuid, quote: &Quote) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE quotes
            SET status = $1, items = $2, tax_rate = $3, grand_total = $4, revision_number = $5,
                round = $6, valid_until = $7, history = $8, updated_at = $9, closed_at = $10
            WHERE id = $11 AND tenant_id = $12
            "#,
        )
        .bind(quote.status().as_str())
        .bind(Json(quote.items()))
        .bind(quote.tax_rate())
        .bind(quote.grand_total())
        .bind(quote.revision_number() as i32)
        .bind(quote.round() as i32)
        .bind(quote.valid_until)
        .bind(Json(quote.history()))
        .bind(quote.updated_at)
        .bind(quote.closed_at)
        .bind(quote.id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique_violation(e, &quote.quote_number))?;
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, tenant_id: Uuid, filters: &QuoteListFilters) {
    query.push(" WHERE tenant_id = ").push_bind(tenant_id);

    let statuses: Vec<String> = filters
        .status
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| QuoteStatus::from_str(s.trim()))
        .map(|s| s.as_str().to_string())
        .collect();
    if !statuses.is_empty() {
        query
            .push(format!(" AND {} = ANY(", EFFECTIVE_STATUS_SQL))
            .push_bind(statuses)
            .push(")");
    }
    if let Some(order_id) = filters.order_id {
        query.push(" AND order_id = ").push_bind(order_id);
    }
    if let Some(vendor_id) = filters.vendor_id {
        query.push(" AND vendor_id = ").push_bind(vendor_id);
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (quote_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR vendor->>'name' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer->>'name' ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Whitelisted sort column, defaulting to creation time
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("quote_number") => "quote_number",
        Some("valid_until") => "valid_until",
        Some("grand_total") => "grand_total",
        Some("updated_at") => "updated_at",
        Some("status") => "status",
        _ => "created_at",
    }
}

fn validate_party(field: &str, party: &Party) -> AppResult<()> {
    if party.name.trim().is_empty() {
        return Err(AppError::validation(
            format!("{}.name", field),
            "Name cannot be empty",
        ));
    }
    if let Some(email) = party.email.as_deref() {
        validate_email(email).map_err(|m| AppError::validation(format!("{}.email", field), m))?;
    }
    Ok(())
}

fn duplicate_error(quote_number: &str) -> AppError {
    AppError::DuplicateQuote(format!(
        "Quote {} is already in progress for this order and vendor",
        quote_number
    ))
}

fn map_unique_violation(err: sqlx::Error, quote_number: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.constraint() == Some(OCCUPYING_INDEX) => {
            duplicate_error(quote_number)
        }
        _ => err.into(),
    }
}
