//! Barcode scan endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    services::scan::{BulkScanRequest, BulkScanResponse, ScanRequest, ScanResponse},
};

use super::AuthenticatedUser;

/// Search, borrow or return by scanned code
#[utoipa::path(
    post,
    path = "/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = ScanRequest,
    responses((status = 200, description = "Scan result; failures carry success = false", body = ScanResponse))
)]
pub async fn scan(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ScanRequest>,
) -> AppResult<Json<ScanResponse>> {
    Ok(Json(state.services.scan.scan(&user.actor(), request).await?))
}

/// Inventory check or bulk return of scanned codes
#[utoipa::path(
    post,
    path = "/scan/bulk",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = BulkScanRequest,
    responses((status = 200, description = "Per item results", body = BulkScanResponse))
)]
pub async fn bulk_scan(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BulkScanRequest>,
) -> AppResult<Json<BulkScanResponse>> {
    Ok(Json(state.services.scan.bulk_scan(&user.actor(), request).await?))
}
