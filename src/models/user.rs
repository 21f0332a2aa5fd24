//! User model and the registration/login request bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public user fields. The PIN hash never leaves the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Running total across every group the user has tallied in
    pub cumulative_score: i64,
}

impl User {
    /// Name shown in member lists and tally records.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Request body for `POST /users/register`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub pin: String,
}

/// Request body for `POST /users/login`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone and PIN are required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Phone and PIN are required"))]
    pub pin: String,
}
