//! Group model with its embedded member list.
//!
//! The membership lifecycle per (group, user) pair is
//! absent -> pending -> active -> absent, with a direct absent -> active
//! edge for joining by key. All transitions live here as plain methods on
//! [`Group`] so the repository only has to load, apply and conditionally write.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::AppError;

/// Membership status of a user inside one group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
}

/// A user's participation record within one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: String,
    pub display_name: String,
    pub phone: String,
    /// Local to the group; independent of the user's cumulative score
    pub score: i64,
    pub status: MemberStatus,
}

impl Member {
    pub fn active(user_id: &str, display_name: &str, phone: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            phone: phone.to_string(),
            score: 0,
            status: MemberStatus::Active,
        }
    }

    pub fn pending(user_id: &str, display_name: &str, phone: &str) -> Self {
        Self {
            status: MemberStatus::Pending,
            ..Self::active(user_id, display_name, phone)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// A named collection of users sharing a tally and an invitation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub invitation_key: String,
    pub admin_id: String,
    pub members: Vec<Member>,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Group {
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_id == user_id
    }

    pub fn require_admin(&self, requester_id: &str, action: &str) -> Result<(), AppError> {
        if self.is_admin(requester_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Only the admin can {}", action)))
        }
    }

    /// Sum of scores over active members. Pending members never count.
    pub fn total_score(&self) -> i64 {
        self.members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.score)
            .sum()
    }

    pub fn active_member_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_active()).count()
    }

    /// absent -> active (join by key) or absent -> pending (invite).
    pub fn add_member(&mut self, member: Member) -> Result<(), AppError> {
        if self.member(&member.user_id).is_some() {
            return Err(AppError::Conflict(
                "User is already a member or has already been invited".to_string(),
            ));
        }
        self.members.push(member);
        Ok(())
    }

    /// pending -> active.
    pub fn accept_invitation(&mut self, user_id: &str) -> Result<(), AppError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.user_id == user_id && m.status == MemberStatus::Pending)
            .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;
        member.status = MemberStatus::Active;
        Ok(())
    }

    /// pending -> absent.
    pub fn decline_invitation(&mut self, user_id: &str) -> Result<(), AppError> {
        let before = self.members.len();
        self.members
            .retain(|m| !(m.user_id == user_id && m.status == MemberStatus::Pending));
        if self.members.len() == before {
            return Err(AppError::NotFound("Invitation not found".to_string()));
        }
        Ok(())
    }

    /// Admin-only removal of another member.
    pub fn remove_member(&mut self, user_id: &str, requester_id: &str) -> Result<(), AppError> {
        self.require_admin(requester_id, "remove members")?;
        if self.is_admin(user_id) {
            return Err(AppError::Validation(
                "The admin cannot remove themselves".to_string(),
            ));
        }
        self.drop_member(user_id)
            .ok_or_else(|| AppError::NotFound("Member not found in this group".to_string()))
    }

    /// Self-service exit for non-admin members.
    pub fn leave(&mut self, user_id: &str) -> Result<(), AppError> {
        if self.is_admin(user_id) {
            return Err(AppError::Forbidden(
                "The admin cannot leave the group; delete it instead".to_string(),
            ));
        }
        self.drop_member(user_id)
            .ok_or_else(|| AppError::NotFound("You are not a member of this group".to_string()))
    }

    /// Add `count` to an active member's group score.
    pub fn credit(&mut self, user_id: &str, count: i64) -> Result<(), AppError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.user_id == user_id && m.is_active())
            .ok_or_else(|| {
                AppError::NotFound("User is not an active member of this group".to_string())
            })?;
        member.score = member
            .score
            .checked_add(count)
            .ok_or_else(|| AppError::Validation("Score limit reached".to_string()))?;
        Ok(())
    }

    fn drop_member(&mut self, user_id: &str) -> Option<()> {
        let index = self.members.iter().position(|m| m.user_id == user_id)?;
        self.members.remove(index);
        Some(())
    }
}

/// Group as returned over the API, with derived totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    #[serde(flatten)]
    pub group: Group,
    pub total_score: i64,
    pub active_member_count: usize,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            total_score: group.total_score(),
            active_member_count: group.active_member_count(),
            group,
        }
    }
}

/// Projection of a group in which a user holds a pending entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub group_id: String,
    pub group_name: String,
    pub invitation_key: String,
    pub admin_id: String,
    pub active_member_count: usize,
}

impl From<&Group> for Invitation {
    fn from(group: &Group) -> Self {
        Self {
            group_id: group.id.clone(),
            group_name: group.name.clone(),
            invitation_key: group.invitation_key.clone(),
            admin_id: group.admin_id.clone(),
            active_member_count: group.active_member_count(),
        }
    }
}

/// Request body for `POST /groups/create`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Group name and creator are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Group name and creator are required"))]
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub creator_phone: String,
}

/// Request body for `POST /groups/join`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Key and user are required"))]
    pub key: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Key and user are required"))]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_phone: String,
}

/// Request body for `POST /groups/{id}/invite`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Admin is required"))]
    pub admin_id: String,
}

/// Body carrying the requesting admin for admin-only mutations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Admin is required"))]
    pub admin_id: String,
}

/// Body carrying the acting user for self-service transitions.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "User is required"))]
    pub user_id: String,
}

/// Query for `GET /groups/user/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserGroupsQuery {
    #[serde(default)]
    pub status: Option<MemberStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group {
            id: "g1".into(),
            name: "Test".into(),
            invitation_key: "ABCDEFGH".into(),
            admin_id: "a".into(),
            members: vec![Member::active("a", "Admin A", "100")],
            created_at: String::new(),
            updated_at: String::new(),
            version: 1,
        }
    }

    #[test]
    fn test_join_then_duplicate_conflicts() {
        let mut g = group();
        g.add_member(Member::active("b", "B", "200")).unwrap();
        let err = g.add_member(Member::pending("b", "B", "200")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(g.members.iter().filter(|m| m.user_id == "b").count(), 1);
    }

    #[test]
    fn test_invite_accept_flow() {
        let mut g = group();
        g.add_member(Member::pending("c", "C", "300")).unwrap();
        assert_eq!(g.active_member_count(), 1);

        g.accept_invitation("c").unwrap();
        assert_eq!(g.member("c").unwrap().status, MemberStatus::Active);
        assert_eq!(g.active_member_count(), 2);

        // Accepting twice finds no pending entry
        assert!(matches!(
            g.accept_invitation("c"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_decline_only_removes_pending() {
        let mut g = group();
        g.add_member(Member::active("b", "B", "200")).unwrap();
        g.add_member(Member::pending("c", "C", "300")).unwrap();

        assert!(matches!(
            g.decline_invitation("b"),
            Err(AppError::NotFound(_))
        ));
        g.decline_invitation("c").unwrap();
        assert!(g.member("c").is_none());
        assert!(g.member("b").is_some());
    }

    #[test]
    fn test_admin_cannot_be_removed_or_leave() {
        let mut g = group();
        g.add_member(Member::active("b", "B", "200")).unwrap();

        assert!(matches!(
            g.remove_member("a", "a"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(g.leave("a"), Err(AppError::Forbidden(_))));
        let admin = g.member("a").unwrap();
        assert_eq!(admin.status, MemberStatus::Active);
    }

    #[test]
    fn test_remove_requires_admin() {
        let mut g = group();
        g.add_member(Member::active("b", "B", "200")).unwrap();
        g.add_member(Member::active("c", "C", "300")).unwrap();

        assert!(matches!(
            g.remove_member("b", "c"),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(g.members.len(), 3);

        g.remove_member("b", "a").unwrap();
        assert!(g.member("b").is_none());
        assert!(matches!(
            g.remove_member("b", "a"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_leave_non_member() {
        let mut g = group();
        assert!(matches!(g.leave("zzz"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_total_score_ignores_pending() {
        let mut g = group();
        g.add_member(Member::active("b", "B", "200")).unwrap();
        g.add_member(Member::pending("c", "C", "300")).unwrap();
        g.credit("a", 10).unwrap();
        g.credit("b", 5).unwrap();
        g.members[2].score = 99;

        assert_eq!(g.total_score(), 15);
        assert!(matches!(g.credit("c", 1), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut g = group();
        g.members[0].score = i64::MAX - 1;

        assert!(matches!(g.credit("a", 2), Err(AppError::Validation(_))));
        assert_eq!(g.members[0].score, i64::MAX - 1);
        g.credit("a", 1).unwrap();
        assert_eq!(g.members[0].score, i64::MAX);
    }

    #[test]
    fn test_view_serializes_derived_fields() {
        let mut g = group();
        g.credit("a", 7).unwrap();
        let json = serde_json::to_value(GroupView::from(g)).unwrap();
        assert_eq!(json["totalScore"], 7);
        assert_eq!(json["activeMemberCount"], 1);
        assert_eq!(json["invitationKey"], "ABCDEFGH");
        assert_eq!(json["members"][0]["status"], "active");
    }
}
