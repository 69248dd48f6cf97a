//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::stats::StatsResponse};

use super::AuthenticatedUser;

/// Library dashboard counters (staff)
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    Ok(Json(state.services.stats.dashboard(&user.actor()).await?))
}
