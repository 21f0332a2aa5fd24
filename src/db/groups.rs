//! Group lifecycle operations.
//!
//! Every member-list mutation is a read-modify-write of the group row guarded
//! by its `version` column. A write that loses the race re-reads and retries.

use rand::Rng;
use sqlx::{Row, Sqlite};

use super::repository::timestamp;
use super::Repository;
use crate::errors::AppError;
use crate::models::{Group, Invitation, Member, MemberStatus};

/// Unambiguous characters: no 0/O or 1/I.
pub const INVITATION_KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITATION_KEY_LEN: usize = 8;

/// Attempts at a conditional group write before reporting a conflict.
const MAX_WRITE_ATTEMPTS: u32 = 8;

const GROUP_COLUMNS: &str =
    "id, name, invitation_key, admin_id, members, created_at, updated_at, version";

/// Draw a fresh invitation key.
pub fn generate_invitation_key() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITATION_KEY_LEN)
        .map(|_| INVITATION_KEY_ALPHABET[rng.gen_range(0..INVITATION_KEY_ALPHABET.len())] as char)
        .collect()
}

impl Repository {
    /// Create a group with the creator as admin and sole active member.
    pub async fn create_group(&self, name: &str, creator: Member) -> Result<Group, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();
        let members = vec![creator];
        let members_json = serde_json::to_string(&members)?;
        let admin_id = members[0].user_id.clone();

        for attempt in 1..=self.key_attempts {
            let key = generate_invitation_key();
            let result = sqlx::query(
                "INSERT INTO tally_groups (id, name, invitation_key, admin_id, members, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
            )
            .bind(&id)
            .bind(name)
            .bind(&key)
            .bind(&admin_id)
            .bind(&members_json)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    return Ok(Group {
                        id,
                        name: name.to_string(),
                        invitation_key: key,
                        admin_id,
                        members,
                        created_at: now.clone(),
                        updated_at: now,
                        version: 1,
                    });
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    tracing::warn!(attempt, "Invitation key collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict(
            "Could not generate a unique group key, please retry".to_string(),
        ))
    }

    /// Get a group by ID.
    pub async fn get_group(&self, id: &str) -> Result<Option<Group>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tally_groups WHERE id = ?", GROUP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(group_from_row).transpose()
    }

    /// Get a group by its invitation key.
    pub async fn get_group_by_key(&self, key: &str) -> Result<Option<Group>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tally_groups WHERE invitation_key = ?",
            GROUP_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(group_from_row).transpose()
    }

    /// Groups where the user holds an entry, optionally restricted to one status.
    pub async fn list_user_groups(
        &self,
        user_id: &str,
        status: Option<MemberStatus>,
    ) -> Result<Vec<Group>, AppError> {
        let status = status.map(|s| match s {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
        });

        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM tally_groups
               WHERE EXISTS (
                   SELECT 1 FROM json_each(tally_groups.members)
                   WHERE json_extract(json_each.value, '$.userId') = ?
                     AND (? IS NULL OR json_extract(json_each.value, '$.status') = ?)
               )
               ORDER BY created_at"#,
            GROUP_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(group_from_row).collect()
    }

    /// Pending invitations for a user.
    pub async fn list_invitations(&self, user_id: &str) -> Result<Vec<Invitation>, AppError> {
        let groups = self
            .list_user_groups(user_id, Some(MemberStatus::Pending))
            .await?;
        Ok(groups.iter().map(Invitation::from).collect())
    }

    /// absent -> active via the invitation key.
    pub async fn join_group(&self, key: &str, member: Member) -> Result<Group, AppError> {
        let group = self
            .get_group_by_key(key)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid group key".to_string()))?;

        let (group, ()) = self
            .mutate_group(&group.id, |g| g.add_member(member.clone()))
            .await?;
        Ok(group)
    }

    /// absent -> pending for the user registered under `phone`. Admin only.
    pub async fn invite(
        &self,
        group_id: &str,
        phone: &str,
        admin_id: &str,
    ) -> Result<Member, AppError> {
        let group = self.require_group(group_id).await?;
        group.require_admin(admin_id, "invite members")?;

        let invitee = self
            .find_user_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::NotFound("No user found with this phone number".to_string()))?
            .user;

        let pending = Member::pending(&invitee.id, &invitee.display_name(), &invitee.phone);
        let (_, member) = self
            .mutate_group(group_id, |g| {
                g.require_admin(admin_id, "invite members")?;
                g.add_member(pending.clone())?;
                Ok(pending.clone())
            })
            .await?;
        Ok(member)
    }

    pub async fn accept_invitation(&self, group_id: &str, user_id: &str) -> Result<Group, AppError> {
        let (group, ()) = self
            .mutate_group(group_id, |g| g.accept_invitation(user_id))
            .await?;
        Ok(group)
    }

    pub async fn decline_invitation(&self, group_id: &str, user_id: &str) -> Result<(), AppError> {
        self.mutate_group(group_id, |g| g.decline_invitation(user_id))
            .await?;
        Ok(())
    }

    /// active -> absent. Admin only, never the admin themselves.
    pub async fn remove_member(
        &self,
        group_id: &str,
        user_id: &str,
        admin_id: &str,
    ) -> Result<Group, AppError> {
        let (group, ()) = self
            .mutate_group(group_id, |g| g.remove_member(user_id, admin_id))
            .await?;
        Ok(group)
    }

    /// active -> absent. Non-admins only.
    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<(), AppError> {
        self.mutate_group(group_id, |g| g.leave(user_id)).await?;
        Ok(())
    }

    /// Delete a group. Its tally records are left untouched.
    pub async fn delete_group(&self, group_id: &str, admin_id: &str) -> Result<(), AppError> {
        let group = self.require_group(group_id).await?;
        group.require_admin(admin_id, "delete the group")?;

        let result = sqlx::query("DELETE FROM tally_groups WHERE id = ? AND admin_id = ?")
            .bind(group_id)
            .bind(admin_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Group not found".to_string()));
        }
        Ok(())
    }

    pub(super) async fn require_group(&self, group_id: &str) -> Result<Group, AppError> {
        self.get_group(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
    }

    /// Load, apply `apply`, and write back only if nobody else wrote in between.
    async fn mutate_group<T, F>(&self, group_id: &str, mut apply: F) -> Result<(Group, T), AppError>
    where
        F: FnMut(&mut Group) -> Result<T, AppError>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut group = self.require_group(group_id).await?;
            let outcome = apply(&mut group)?;

            if write_members(&self.pool, &mut group).await? {
                return Ok((group, outcome));
            }
            tracing::debug!(group_id, attempt, "Concurrent group modification, retrying");
        }

        Err(AppError::Conflict(
            "The group was modified concurrently, please retry".to_string(),
        ))
    }
}

/// Conditionally persist the member list. Returns false if the version moved.
pub(super) async fn write_members<'e, E>(executor: E, group: &mut Group) -> Result<bool, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = timestamp();
    let members_json = serde_json::to_string(&group.members)?;

    let result = sqlx::query(
        "UPDATE tally_groups SET members = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
    )
    .bind(&members_json)
    .bind(&now)
    .bind(&group.id)
    .bind(group.version)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    group.version += 1;
    group.updated_at = now;
    Ok(true)
}

pub(super) fn group_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Group, AppError> {
    let members: String = row.get("members");
    Ok(Group {
        id: row.get("id"),
        name: row.get("name"),
        invitation_key: row.get("invitation_key"),
        admin_id: row.get("admin_id"),
        members: serde_json::from_str(&members)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_shape() {
        for _ in 0..200 {
            let key = generate_invitation_key();
            assert_eq!(key.len(), INVITATION_KEY_LEN);
            assert!(key.bytes().all(|b| INVITATION_KEY_ALPHABET.contains(&b)));
            assert!(!key.contains('0') && !key.contains('O'));
            assert!(!key.contains('1') && !key.contains('I'));
        }
    }

    #[test]
    fn test_keys_vary() {
        let keys: HashSet<String> = (0..50).map(|_| generate_invitation_key()).collect();
        assert!(keys.len() > 45);
    }
}
