//! Screen state machine: `Auth -> Home -> {CreateGroup, GroupDetail -> Tally}`.
//!
//! Snapshots held here are never authoritative. Each poll result replaces
//! whatever was shown before, including local optimistic edits.

use super::ClientError;
use crate::models::{GroupView, Member, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Home,
    CreateGroup,
    GroupDetail { group_id: String },
    Tally { group_id: String },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Auth => "auth",
            Screen::Home => "home",
            Screen::CreateGroup => "create group",
            Screen::GroupDetail { .. } => "group detail",
            Screen::Tally { .. } => "tally",
        }
    }

    /// Group the screen is showing, if any.
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Screen::GroupDetail { group_id } | Screen::Tally { group_id } => Some(group_id.as_str()),
            _ => None,
        }
    }
}

/// Client-side application state: the session and the visible snapshots.
#[derive(Debug, Clone)]
pub struct AppView {
    screen: Screen,
    user: Option<User>,
    groups: Vec<GroupView>,
    current_group: Option<GroupView>,
}

impl Default for AppView {
    fn default() -> Self {
        Self::new()
    }
}

impl AppView {
    pub fn new() -> Self {
        Self {
            screen: Screen::Auth,
            user: None,
            groups: Vec::new(),
            current_group: None,
        }
    }

    /// Start from a stored session: straight to `Home` when a user was saved.
    pub fn restore(user: Option<User>) -> Self {
        let mut view = Self::new();
        if let Some(user) = user {
            view.user = Some(user);
            view.screen = Screen::Home;
        }
        view
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn groups(&self) -> &[GroupView] {
        &self.groups
    }

    pub fn current_group(&self) -> Option<&GroupView> {
        self.current_group.as_ref()
    }

    /// Whether the logged-in user administers the open group.
    pub fn is_admin(&self) -> bool {
        match (&self.user, &self.current_group) {
            (Some(user), Some(group)) => group.group.admin_id == user.id,
            _ => false,
        }
    }

    fn invalid(&self, action: &'static str) -> ClientError {
        ClientError::InvalidTransition {
            from: self.screen.name(),
            action,
        }
    }

    /// Auth -> Home.
    pub fn logged_in(&mut self, user: User) -> Result<(), ClientError> {
        if self.screen != Screen::Auth {
            return Err(self.invalid("log in"));
        }
        self.user = Some(user);
        self.screen = Screen::Home;
        Ok(())
    }

    /// Any screen -> Auth, dropping the session and every snapshot.
    pub fn logout(&mut self) {
        *self = Self::new();
    }

    /// Home -> CreateGroup.
    pub fn open_create_group(&mut self) -> Result<(), ClientError> {
        if self.screen != Screen::Home {
            return Err(self.invalid("create a group"));
        }
        self.screen = Screen::CreateGroup;
        Ok(())
    }

    /// CreateGroup -> Home with the new group listed.
    pub fn group_created(&mut self, group: GroupView) -> Result<(), ClientError> {
        if self.screen != Screen::CreateGroup {
            return Err(self.invalid("finish creating a group"));
        }
        self.groups.push(group);
        self.screen = Screen::Home;
        Ok(())
    }

    /// Home -> GroupDetail.
    pub fn open_group(&mut self, group_id: &str) -> Result<(), ClientError> {
        if self.screen != Screen::Home {
            return Err(self.invalid("open a group"));
        }
        self.current_group = self
            .groups
            .iter()
            .find(|g| g.group.id == group_id)
            .cloned();
        self.screen = Screen::GroupDetail {
            group_id: group_id.to_string(),
        };
        Ok(())
    }

    /// GroupDetail -> Tally.
    pub fn start_tally(&mut self) -> Result<(), ClientError> {
        match &self.screen {
            Screen::GroupDetail { group_id } => {
                self.screen = Screen::Tally {
                    group_id: group_id.clone(),
                };
                Ok(())
            }
            _ => Err(self.invalid("start a tally")),
        }
    }

    /// Tally -> GroupDetail, GroupDetail/CreateGroup -> Home.
    pub fn back(&mut self) -> Result<(), ClientError> {
        self.screen = match &self.screen {
            Screen::Tally { group_id } => Screen::GroupDetail {
                group_id: group_id.clone(),
            },
            Screen::GroupDetail { .. } => {
                self.current_group = None;
                Screen::Home
            }
            Screen::CreateGroup => Screen::Home,
            Screen::Auth | Screen::Home => return Err(self.invalid("go back")),
        };
        Ok(())
    }

    /// The open group vanished (deleted, left or removed): back to Home.
    pub fn group_closed(&mut self, group_id: &str) {
        self.groups.retain(|g| g.group.id != group_id);
        if self.screen.group_id() == Some(group_id) {
            self.current_group = None;
            self.screen = Screen::Home;
        }
    }

    /// Replace the home list with a fresh poll result.
    pub fn apply_groups(&mut self, groups: Vec<GroupView>) {
        self.groups = groups;
    }

    /// Replace the open group with a fresh poll result. Ignored when the
    /// snapshot belongs to a group that is no longer on screen.
    pub fn apply_group(&mut self, group: GroupView) -> bool {
        if self.screen.group_id() != Some(group.group.id.as_str()) {
            return false;
        }
        if let Some(listed) = self.groups.iter_mut().find(|g| g.group.id == group.group.id) {
            *listed = group.clone();
        }
        self.current_group = Some(group);
        true
    }

    /// Show a member before the server confirms it. The next poll wins.
    pub fn add_member_optimistic(&mut self, member: Member) {
        if let Some(current) = self.current_group.as_mut() {
            current.group.members.push(member);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Group;

    fn user() -> User {
        User {
            id: "a".into(),
            first_name: "Awa".into(),
            last_name: "Ndiaye".into(),
            phone: "100".into(),
            cumulative_score: 0,
        }
    }

    fn group(id: &str) -> GroupView {
        Group {
            id: id.into(),
            name: "Test".into(),
            invitation_key: "ABCDEFGH".into(),
            admin_id: "a".into(),
            members: vec![Member::active("a", "Awa Ndiaye", "100")],
            created_at: String::new(),
            updated_at: String::new(),
            version: 1,
        }
        .into()
    }

    #[test]
    fn test_full_navigation() {
        let mut view = AppView::new();
        assert_eq!(view.screen(), &Screen::Auth);

        view.logged_in(user()).unwrap();
        assert_eq!(view.screen(), &Screen::Home);

        view.open_create_group().unwrap();
        view.group_created(group("g1")).unwrap();
        assert_eq!(view.screen(), &Screen::Home);
        assert_eq!(view.groups().len(), 1);

        view.open_group("g1").unwrap();
        assert!(view.is_admin());
        view.start_tally().unwrap();
        assert_eq!(
            view.screen(),
            &Screen::Tally {
                group_id: "g1".into()
            }
        );

        view.back().unwrap();
        assert_eq!(view.screen().group_id(), Some("g1"));
        view.back().unwrap();
        assert_eq!(view.screen(), &Screen::Home);
        assert!(view.current_group().is_none());

        view.logout();
        assert_eq!(view.screen(), &Screen::Auth);
        assert!(view.user().is_none());
        assert!(view.groups().is_empty());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut view = AppView::new();
        assert!(view.open_group("g1").is_err());
        assert!(view.start_tally().is_err());
        assert!(view.back().is_err());

        view.logged_in(user()).unwrap();
        assert!(view.logged_in(user()).is_err());
        assert!(view.start_tally().is_err());
        let err = view.back().unwrap_err();
        assert_eq!(err.to_string(), "cannot go back from the home screen");
    }

    #[test]
    fn test_restore_session() {
        assert_eq!(AppView::restore(None).screen(), &Screen::Auth);
        let view = AppView::restore(Some(user()));
        assert_eq!(view.screen(), &Screen::Home);
        assert_eq!(view.user().unwrap().id, "a");
    }

    #[test]
    fn test_poll_overwrites_optimistic_edit() {
        let mut view = AppView::restore(Some(user()));
        view.apply_groups(vec![group("g1")]);
        view.open_group("g1").unwrap();

        view.add_member_optimistic(Member::pending("x", "Guest", "999"));
        assert_eq!(view.current_group().unwrap().group.members.len(), 2);

        assert!(view.apply_group(group("g1")));
        assert_eq!(view.current_group().unwrap().group.members.len(), 1);
    }

    #[test]
    fn test_snapshot_for_other_group_is_dropped() {
        let mut view = AppView::restore(Some(user()));
        view.apply_groups(vec![group("g1"), group("g2")]);
        view.open_group("g1").unwrap();

        assert!(!view.apply_group(group("g2")));
        assert_eq!(view.current_group().unwrap().group.id, "g1");
    }

    #[test]
    fn test_group_closed_returns_home() {
        let mut view = AppView::restore(Some(user()));
        view.apply_groups(vec![group("g1")]);
        view.open_group("g1").unwrap();

        view.group_closed("g1");
        assert_eq!(view.screen(), &Screen::Home);
        assert!(view.groups().is_empty());
    }
}
