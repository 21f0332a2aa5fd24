//! Typed HTTP client, one method per endpoint.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::ClientError;
use crate::auth::API_KEY_HEADER;
use crate::errors::ErrorResponse;
use crate::models::{
    CreateGroupRequest, GroupIdResponse, GroupResponse, GroupView, InviteResponse, Invitation,
    JoinGroupRequest, LoginRequest, MemberStats, RegisterRequest, SaveTallyRequest, TallyRecord,
    TallyResponse, User, UserResponse,
};

/// HTTP client bound to one server.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5001`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // ==================== USERS ====================

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let body: UserResponse = self
            .send(self.http.post(self.url("/users/register")).json(request))
            .await?;
        Ok(body.user)
    }

    pub async fn login(&self, phone: &str, pin: &str) -> Result<User, ClientError> {
        let request = LoginRequest {
            phone: phone.to_string(),
            pin: pin.to_string(),
        };
        let body: UserResponse = self
            .send(self.http.post(self.url("/users/login")).json(&request))
            .await?;
        Ok(body.user)
    }

    // ==================== GROUPS ====================

    /// Create a group with `user` as admin.
    pub async fn create_group(&self, name: &str, user: &User) -> Result<GroupView, ClientError> {
        let request = CreateGroupRequest {
            name: name.to_string(),
            creator_id: user.id.clone(),
            creator_name: user.display_name(),
            creator_phone: user.phone.clone(),
        };
        let body: GroupResponse = self
            .send(self.http.post(self.url("/groups/create")).json(&request))
            .await?;
        Ok(body.group)
    }

    pub async fn join_group(&self, key: &str, user: &User) -> Result<GroupView, ClientError> {
        let request = JoinGroupRequest {
            key: key.to_string(),
            user_id: user.id.clone(),
            user_name: user.display_name(),
            user_phone: user.phone.clone(),
        };
        let body: GroupResponse = self
            .send(self.http.post(self.url("/groups/join")).json(&request))
            .await?;
        Ok(body.group)
    }

    pub async fn user_groups(&self, user_id: &str) -> Result<Vec<GroupView>, ClientError> {
        self.send(self.http.get(self.url(&format!("/groups/user/{}", user_id))))
            .await
    }

    pub async fn group(&self, group_id: &str) -> Result<GroupView, ClientError> {
        self.send(self.http.get(self.url(&format!("/groups/{}", group_id))))
            .await
    }

    pub async fn delete_group(&self, group_id: &str, admin_id: &str) -> Result<String, ClientError> {
        let body: GroupIdResponse = self
            .send(
                self.http
                    .delete(self.url(&format!("/groups/{}", group_id)))
                    .json(&json!({ "adminId": admin_id })),
            )
            .await?;
        Ok(body.group_id)
    }

    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<String, ClientError> {
        let body: GroupIdResponse = self
            .send(
                self.http
                    .post(self.url(&format!("/groups/{}/leave", group_id)))
                    .json(&json!({ "userId": user_id })),
            )
            .await?;
        Ok(body.group_id)
    }

    pub async fn remove_member(
        &self,
        group_id: &str,
        user_id: &str,
        admin_id: &str,
    ) -> Result<GroupView, ClientError> {
        let body: GroupResponse = self
            .send(
                self.http
                    .delete(self.url(&format!("/groups/{}/members/{}", group_id, user_id)))
                    .json(&json!({ "adminId": admin_id })),
            )
            .await?;
        Ok(body.group)
    }

    pub async fn invite(
        &self,
        group_id: &str,
        phone: &str,
        admin_id: &str,
    ) -> Result<InviteResponse, ClientError> {
        self.send(
            self.http
                .post(self.url(&format!("/groups/{}/invite", group_id)))
                .json(&json!({ "phone": phone, "adminId": admin_id })),
        )
        .await
    }

    // ==================== INVITATIONS ====================

    pub async fn invitations(&self, user_id: &str) -> Result<Vec<Invitation>, ClientError> {
        self.send(
            self.http
                .get(self.url(&format!("/groups/invitations/{}", user_id))),
        )
        .await
    }

    pub async fn accept_invitation(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<GroupView, ClientError> {
        let body: GroupResponse = self
            .send(
                self.http
                    .post(self.url(&format!("/groups/invitations/{}/accept", group_id)))
                    .json(&json!({ "userId": user_id })),
            )
            .await?;
        Ok(body.group)
    }

    pub async fn decline_invitation(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<String, ClientError> {
        let body: GroupIdResponse = self
            .send(
                self.http
                    .post(self.url(&format!("/groups/invitations/{}/decline", group_id)))
                    .json(&json!({ "userId": user_id })),
            )
            .await?;
        Ok(body.group_id)
    }

    // ==================== TALLIES ====================

    pub async fn save_tally(&self, request: &SaveTallyRequest) -> Result<TallyRecord, ClientError> {
        let body: TallyResponse = self
            .send(self.http.post(self.url("/zikr/save")).json(request))
            .await?;
        Ok(body.zikr)
    }

    pub async fn history(&self, group_id: &str) -> Result<Vec<TallyRecord>, ClientError> {
        self.send(self.http.get(self.url(&format!("/zikr/history/{}", group_id))))
            .await
    }

    pub async fn stats(&self, group_id: &str) -> Result<Vec<MemberStats>, ClientError> {
        self.send(self.http.get(self.url(&format!("/zikr/stats/{}", group_id))))
            .await
    }
}
