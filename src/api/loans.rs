//! Loan endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{BorrowRequest, LoanQuery},
    services::lending::{BorrowOutcome, ReturnOutcome},
};

use super::{AuthenticatedUser, PaginatedLoans, PaginatedResponse};
use crate::repository::DEFAULT_PER_PAGE;

/// List loans; members only see their own
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses((status = 200, description = "Loans, newest first", body = PaginatedLoans))
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedLoans>> {
    let (page, per_page) = (query.page, query.per_page);
    let (loans, total) = state.services.lending.list_loans(&user.actor(), query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, page, per_page, DEFAULT_PER_PAGE)))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan opened", body = BorrowOutcome),
        (status = 403, description = "Cannot borrow for another member"),
        (status = 404, description = "Book or member not found"),
        (status = 422, description = "Lending rule violated")
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowOutcome>)> {
    let outcome = state.services.lending.borrow(&user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnOutcome),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnOutcome>> {
    Ok(Json(state.services.lending.return_loan(&user.actor(), id).await?))
}
