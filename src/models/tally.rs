//! Tally records: immutable facts, one per completed counting session.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound on a single session's count.
pub const MAX_TALLY_COUNT: i64 = 1_000_000;

/// Counting mode of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TallyMode {
    Unlimited,
    Fixed,
}

impl TallyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TallyMode::Unlimited => "unlimited",
            TallyMode::Fixed => "fixed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unlimited" => Some(TallyMode::Unlimited),
            "fixed" => Some(TallyMode::Fixed),
            _ => None,
        }
    }
}

/// The phrase being counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ZikrLabel {
    #[default]
    #[serde(rename = "Allahou Akbar")]
    AllahouAkbar,
    #[serde(rename = "Soubhanallah")]
    Soubhanallah,
    #[serde(rename = "Alhamdoulillah")]
    Alhamdoulillah,
    #[serde(rename = "La ilaha illa Allah")]
    LaIlahaIllaAllah,
}

impl ZikrLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZikrLabel::AllahouAkbar => "Allahou Akbar",
            ZikrLabel::Soubhanallah => "Soubhanallah",
            ZikrLabel::Alhamdoulillah => "Alhamdoulillah",
            ZikrLabel::LaIlahaIllaAllah => "La ilaha illa Allah",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Allahou Akbar" => Some(ZikrLabel::AllahouAkbar),
            "Soubhanallah" => Some(ZikrLabel::Soubhanallah),
            "Alhamdoulillah" => Some(ZikrLabel::Alhamdoulillah),
            "La ilaha illa Allah" => Some(ZikrLabel::LaIlahaIllaAllah),
            _ => None,
        }
    }
}

/// One completed counting session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TallyRecord {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub user_name: String,
    pub zikr_label: ZikrLabel,
    pub count: i64,
    pub mode: TallyMode,
    pub target: i64,
    /// Minutes spent, as reported by the client
    pub duration: i64,
    pub created_at: String,
}

/// Request body for `POST /zikr/save`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveTallyRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Group is required"))]
    pub group_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "User is required"))]
    pub user_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "User name is required"))]
    pub user_name: String,
    #[serde(default)]
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Count must be between 1 and 1000000"
    ))]
    pub count: i64,
    pub mode: TallyMode,
    #[serde(default)]
    #[validate(range(min = 0, message = "Target cannot be negative"))]
    pub target: i64,
    #[serde(default)]
    pub zikr_label: ZikrLabel,
    #[serde(default)]
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration: i64,
}

/// Per-user fold over a group's tally log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub user_id: String,
    pub user_name: String,
    pub total_count: i64,
    pub sessions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_defaults_and_names() {
        assert_eq!(ZikrLabel::default(), ZikrLabel::AllahouAkbar);
        let json = serde_json::to_value(ZikrLabel::LaIlahaIllaAllah).unwrap();
        assert_eq!(json, "La ilaha illa Allah");
        assert_eq!(
            ZikrLabel::from_str(ZikrLabel::Soubhanallah.as_str()),
            Some(ZikrLabel::Soubhanallah)
        );
        assert_eq!(ZikrLabel::from_str("unknown"), None);
    }

    #[test]
    fn test_save_request_validation() {
        let request: SaveTallyRequest = serde_json::from_value(serde_json::json!({
            "groupId": "g",
            "userId": "u",
            "userName": "U",
            "count": 0,
            "mode": "unlimited"
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request = SaveTallyRequest {
            count: 3,
            ..request
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.zikr_label, ZikrLabel::AllahouAkbar);

        let at_cap = SaveTallyRequest {
            count: MAX_TALLY_COUNT,
            ..request.clone()
        };
        assert!(at_cap.validate().is_ok());
        let over_cap = SaveTallyRequest {
            count: MAX_TALLY_COUNT + 1,
            ..request
        };
        assert!(over_cap.validate().is_err());
    }

    #[test]
    fn test_mode_round_trips_through_storage_strings() {
        assert_eq!(TallyMode::from_str("fixed"), Some(TallyMode::Fixed));
        assert_eq!(TallyMode::Unlimited.as_str(), "unlimited");
        assert_eq!(TallyMode::from_str("bogus"), None);
    }
}
