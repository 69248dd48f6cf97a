//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation, ReservationQuery},
};

use super::{AuthenticatedUser, PaginatedReservations, PaginatedResponse};
use crate::repository::DEFAULT_PER_PAGE;

/// List reservations in queue order; members only see their own
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses((status = 200, description = "Reservations", body = PaginatedReservations))
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedReservations>> {
    let (page, per_page) = (query.page, query.per_page);
    let (reservations, total) = state.services.reservations.list(&user.actor(), query).await?;
    Ok(Json(PaginatedResponse::new(reservations, total, page, per_page, DEFAULT_PER_PAGE)))
}

/// Reserve a book that is currently out
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation queued", body = Reservation),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Already reserved"),
        (status = 422, description = "Book is available")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state.services.reservations.create(&user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel an active reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Reservation is not active")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    Ok(Json(state.services.reservations.cancel(&user.actor(), id).await?))
}
