//! HTTP handlers for quote negotiation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{
    AcceptQuoteRequest, ApiEnvelope, CancelQuoteRequest, CheckExistingParams, CounterQuoteRequest,
    CreateQuoteRequest, ExistingQuoteCheck, ExistingQuoteQuery, ExtendValidityRequest,
    IssueQuoteRequest, NegotiationOutcome, PaginatedResponse, QuoteListFilters, QuoteStatistics,
    RejectQuoteRequest, ReviseQuoteRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::Quote;
use crate::services::QuoteService;
use crate::AppState;

fn service(state: &AppState) -> QuoteService {
    QuoteService::new(state.db.clone(), state.config.quotes.clone())
}

/// List quotes for the current tenant
pub async fn list_quotes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filters): Query<QuoteListFilters>,
) -> AppResult<Json<PaginatedResponse<Quote>>> {
    let quotes = service(&state)
        .list_quotes(current_user.0.tenant_id, filters)
        .await?;
    Ok(Json(quotes))
}

/// Get a quote with its items and history
pub async fn get_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
) -> AppResult<Json<ApiEnvelope<Quote>>> {
    let quote = service(&state)
        .get_quote(current_user.0.tenant_id, quote_id)
        .await?;
    Ok(Json(ApiEnvelope::new(quote)))
}

/// Create a quote
pub async fn create_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateQuoteRequest>,
) -> AppResult<(StatusCode, Json<ApiEnvelope<Quote>>)> {
    let quote = service(&state)
        .create_quote(current_user.0.tenant_id, &current_user.0.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiEnvelope::new(quote))))
}

/// Issue a draft or revised quote
pub async fn issue_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<IssueQuoteRequest>,
) -> AppResult<Json<ApiEnvelope<Quote>>> {
    let quote = service(&state)
        .issue_quote(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            input.status,
        )
        .await?;
    Ok(Json(ApiEnvelope::new(quote)))
}

/// Accept a quote
pub async fn accept_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    input: Option<Json<AcceptQuoteRequest>>,
) -> AppResult<Json<NegotiationOutcome>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    input.validate()?;
    let outcome = service(&state)
        .accept_quote(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            input.notes,
        )
        .await?;
    Ok(Json(outcome))
}

/// Reject a quote with a reason.
///
/// The reason is only checked by the state machine so that its trimmed length
/// is what counts.
pub async fn reject_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<RejectQuoteRequest>,
) -> AppResult<Json<NegotiationOutcome>> {
    let outcome = service(&state)
        .reject_quote(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            &input.reason,
        )
        .await?;
    Ok(Json(outcome))
}

/// Counter-offer
pub async fn counter_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<CounterQuoteRequest>,
) -> AppResult<Json<NegotiationOutcome>> {
    input.validate()?;
    let outcome = service(&state)
        .counter_quote(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            input.price,
            input.notes,
        )
        .await?;
    Ok(Json(outcome))
}

pub async fn cancel_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    input: Option<Json<CancelQuoteRequest>>,
) -> AppResult<Json<ApiEnvelope<Quote>>> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    input.validate()?;
    let quote = service(&state)
        .cancel_quote(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            input.reason,
        )
        .await?;
    Ok(Json(ApiEnvelope::new(quote)))
}

pub async fn revise_quote(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<ReviseQuoteRequest>,
) -> AppResult<Json<ApiEnvelope<Quote>>> {
    let quote = service(&state)
        .revise_quote(current_user.0.tenant_id, &current_user.0.actor(), quote_id, input)
        .await?;
    Ok(Json(ApiEnvelope::new(quote)))
}

pub async fn extend_validity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(input): Json<ExtendValidityRequest>,
) -> AppResult<Json<ApiEnvelope<Quote>>> {
    let quote = service(&state)
        .extend_validity(
            current_user.0.tenant_id,
            &current_user.0.actor(),
            quote_id,
            input.valid_until,
        )
        .await?;
    Ok(Json(ApiEnvelope::new(quote)))
}

/// Check whether an order already has a quote in progress
pub async fn check_existing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(params): Query<CheckExistingParams>,
) -> AppResult<Json<ApiEnvelope<ExistingQuoteCheck>>> {
    let order_id = params
        .order_id
        .ok_or_else(|| AppError::validation("order_id", "Order id is required"))?;

    let mut query = ExistingQuoteQuery::for_order(order_id).with_status_strs(&params.status_list());
    if let Some(vendor_id) = params.vendor_id {
        query = query.with_vendor(vendor_id);
    }

    let check = service(&state)
        .check_existing(current_user.0.tenant_id, query)
        .await?;
    Ok(Json(ApiEnvelope::new(check)))
}

/// Quote counts and values per status
pub async fn get_statistics(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiEnvelope<QuoteStatistics>>> {
    let stats = service(&state).statistics(current_user.0.tenant_id).await?;
    Ok(Json(ApiEnvelope::new(stats)))
}
