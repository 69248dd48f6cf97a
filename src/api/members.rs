//! Member management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::LoanQuery,
        member::{CreateMember, Member, MemberDetails, MemberQuery, TopUpRequest, UpdateMember},
    },
};

use super::{AuthenticatedUser, PaginatedLoans, PaginatedMembers, PaginatedResponse};
use crate::repository::DEFAULT_PER_PAGE;

/// List members (staff)
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery),
    responses(
        (status = 200, description = "Matching members", body = PaginatedMembers),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_members(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<PaginatedMembers>> {
    let (members, total) = state.services.members.search(&user.actor(), &query).await?;
    Ok(Json(PaginatedResponse::new(members, total, query.page, query.per_page, DEFAULT_PER_PAGE)))
}

/// Get a member
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = MemberDetails),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MemberDetails>> {
    Ok(Json(state.services.members.get(&user.actor(), id).await?))
}

/// Register a member (staff)
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = MemberDetails),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Login or card number already used")
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<MemberDetails>)> {
    let member = state.services.members.create(&user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Update a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = MemberDetails),
        (status = 403, description = "Not allowed to change these fields"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateMember>,
) -> AppResult<Json<MemberDetails>> {
    Ok(Json(state.services.members.update(&user.actor(), id, request).await?))
}

/// Delete a member (staff)
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member has borrow history")
    )
)]
pub async fn delete_member(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.members.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Credit a member's fine balance (staff)
#[utoipa::path(
    post,
    path = "/members/{id}/topup",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Balance credited", body = Member),
        (status = 400, description = "Amount must be positive"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn top_up(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<TopUpRequest>,
) -> AppResult<Json<Member>> {
    Ok(Json(state.services.lending.top_up(&user.actor(), id, request.amount).await?))
}

/// Restart a membership period today (staff)
#[utoipa::path(
    post,
    path = "/members/{id}/renew",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Membership renewed", body = MemberDetails),
        (status = 404, description = "Member not found")
    )
)]
pub async fn renew_member(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MemberDetails>> {
    Ok(Json(state.services.members.renew(&user.actor(), id).await?))
}

/// Loans of one member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Member ID"), LoanQuery),
    responses(
        (status = 200, description = "Member loans", body = PaginatedLoans),
        (status = 403, description = "Not your account")
    )
)]
pub async fn get_member_loans(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Query(mut query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedLoans>> {
    let actor = user.actor();
    actor.require_self_or_staff(id)?;
    query.member_id = Some(id);

    let (page, per_page) = (query.page, query.per_page);
    let (loans, total) = state.services.lending.list_loans(&actor, query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, page, per_page, DEFAULT_PER_PAGE)))
}
