//! Group lifecycle endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiResult, ValidatedJson, ValidatedQuery};
use crate::errors::AppError;
use crate::models::{
    AdminRequest, CreateGroupRequest, GroupIdResponse, GroupResponse, GroupView, InviteRequest,
    InviteResponse, JoinGroupRequest, Member, UserGroupsQuery, UserRequest,
};
use crate::AppState;

/// Fill in a member's display name and phone from the identity store when
/// the client left them out.
async fn member_entry(
    state: &AppState,
    user_id: &str,
    name: &str,
    phone: &str,
) -> ApiResult<Member> {
    if !name.trim().is_empty() && !phone.trim().is_empty() {
        return Ok(Member::active(user_id, name, phone));
    }

    let user = state.repo.get_user(user_id).await?;
    let name = match (&user, name.trim().is_empty()) {
        (Some(u), true) => u.display_name(),
        _ => name.to_string(),
    };
    let phone = match (&user, phone.trim().is_empty()) {
        (Some(u), true) => u.phone.clone(),
        _ => phone.to_string(),
    };
    Ok(Member::active(user_id, &name, &phone))
}

/// POST /api/groups/create - Create a group owned by the creator.
pub async fn create_group(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupResponse>)> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Group name and creator are required".to_string(),
        ));
    }

    let creator = member_entry(
        &state,
        &request.creator_id,
        &request.creator_name,
        &request.creator_phone,
    )
    .await?;
    let group = state.repo.create_group(name, creator).await?;

    tracing::info!(group_id = %group.id, admin_id = %group.admin_id, "Group created");

    Ok((
        StatusCode::CREATED,
        Json(GroupResponse {
            message: "Group created".to_string(),
            group: group.into(),
        }),
    ))
}

/// POST /api/groups/join - Join directly with an invitation key.
pub async fn join_group(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<JoinGroupRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let member = member_entry(
        &state,
        &request.user_id,
        &request.user_name,
        &request.user_phone,
    )
    .await?;
    let group = state.repo.join_group(request.key.trim(), member).await?;

    tracing::info!(group_id = %group.id, user_id = %request.user_id, "User joined group");

    Ok(Json(GroupResponse {
        message: "Joined group".to_string(),
        group: group.into(),
    }))
}

/// GET /api/groups/user/:userId - Groups the user belongs to.
pub async fn list_user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<UserGroupsQuery>,
) -> ApiResult<Json<Vec<GroupView>>> {
    let groups = state.repo.list_user_groups(&user_id, query.status).await?;
    Ok(Json(groups.into_iter().map(GroupView::from).collect()))
}

/// GET /api/groups/:groupId - A single group.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupView>> {
    match state.repo.get_group(&group_id).await? {
        Some(group) => Ok(Json(group.into())),
        None => Err(AppError::NotFound("Group not found".to_string())),
    }
}

/// DELETE /api/groups/:groupId - Delete the whole group. Admin only.
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ValidatedJson(request): ValidatedJson<AdminRequest>,
) -> ApiResult<Json<GroupIdResponse>> {
    if let Err(e) = state.repo.delete_group(&group_id, &request.admin_id).await {
        tracing::warn!(group_id = %group_id, "Group deletion rejected: {}", e);
        return Err(e);
    }

    tracing::info!(group_id = %group_id, "Group deleted");

    Ok(Json(GroupIdResponse {
        message: "Group deleted".to_string(),
        group_id,
    }))
}

/// POST /api/groups/:groupId/leave - Leave a group. Non-admins only.
pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> ApiResult<Json<GroupIdResponse>> {
    state.repo.leave_group(&group_id, &request.user_id).await?;

    tracing::info!(group_id = %group_id, user_id = %request.user_id, "User left group");

    Ok(Json(GroupIdResponse {
        message: "You left the group".to_string(),
        group_id,
    }))
}

/// DELETE /api/groups/:groupId/members/:userId - Remove a member. Admin only.
pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<AdminRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let group = match state
        .repo
        .remove_member(&group_id, &user_id, &request.admin_id)
        .await
    {
        Ok(group) => group,
        Err(e) => {
            tracing::warn!(group_id = %group_id, user_id = %user_id, "Member removal rejected: {}", e);
            return Err(e);
        }
    };

    tracing::info!(group_id = %group_id, user_id = %user_id, "Member removed");

    Ok(Json(GroupResponse {
        message: "Member removed".to_string(),
        group: group.into(),
    }))
}

/// POST /api/groups/:groupId/invite - Invite a registered user by phone. Admin only.
pub async fn invite_member(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ValidatedJson(request): ValidatedJson<InviteRequest>,
) -> ApiResult<Json<InviteResponse>> {
    let member = state
        .repo
        .invite(&group_id, request.phone.trim(), &request.admin_id)
        .await?;

    tracing::info!(group_id = %group_id, user_id = %member.user_id, "Invitation sent");

    Ok(Json(InviteResponse {
        message: "Invitation sent".to_string(),
        invited_user: member,
    }))
}
