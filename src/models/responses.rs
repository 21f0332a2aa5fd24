//! Response bodies: a human-readable `message` next to the payload key.

use serde::{Deserialize, Serialize};

use super::{GroupView, Member, TallyRecord, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupResponse {
    pub message: String,
    pub group: GroupView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdResponse {
    pub message: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub message: String,
    pub invited_user: Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyResponse {
    pub message: String,
    pub zikr: TallyRecord,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub timestamp: String,
}
