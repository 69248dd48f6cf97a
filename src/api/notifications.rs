//! Loan notification triggers (staff)

use axum::{extract::State, Json};

use crate::{error::AppResult, services::lending::NotificationReport};

use super::AuthenticatedUser;

/// Email members whose loans fall due soon
#[utoipa::path(
    post,
    path = "/notifications/due-reminders",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Delivery report", body = NotificationReport),
        (status = 403, description = "Staff only")
    )
)]
pub async fn send_due_reminders(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<NotificationReport>> {
    Ok(Json(state.services.lending.send_due_reminders(&user.actor()).await?))
}

/// Email members whose loans are overdue
#[utoipa::path(
    post,
    path = "/notifications/overdue-alerts",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Delivery report", body = NotificationReport),
        (status = 403, description = "Staff only")
    )
)]
pub async fn send_overdue_alerts(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<NotificationReport>> {
    Ok(Json(state.services.lending.send_overdue_alerts(&user.actor()).await?))
}
