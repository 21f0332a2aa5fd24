//! Invitation endpoints: list, accept, decline.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{ApiResult, ValidatedJson};
use crate::models::{GroupIdResponse, GroupResponse, Invitation, UserRequest};
use crate::AppState;

/// GET /api/groups/invitations/:userId - Pending invitations for a user.
pub async fn list_invitations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Invitation>>> {
    let invitations = state.repo.list_invitations(&user_id).await?;
    Ok(Json(invitations))
}

/// POST /api/groups/invitations/:groupId/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state
        .repo
        .accept_invitation(&group_id, &request.user_id)
        .await?;

    tracing::info!(group_id = %group_id, user_id = %request.user_id, "Invitation accepted");

    Ok(Json(GroupResponse {
        message: "Invitation accepted".to_string(),
        group: group.into(),
    }))
}

/// POST /api/groups/invitations/:groupId/decline
pub async fn decline_invitation(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> ApiResult<Json<GroupIdResponse>> {
    state
        .repo
        .decline_invitation(&group_id, &request.user_id)
        .await?;

    tracing::info!(group_id = %group_id, user_id = %request.user_id, "Invitation declined");

    Ok(Json(GroupIdResponse {
        message: "Invitation declined".to_string(),
        group_id,
    }))
}
