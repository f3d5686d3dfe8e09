use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{ApiError, ApiResult};
use crate::composer::{ReplyBackend, ReplyBody};
use crate::items::ItemBackend;
use crate::logging::LogConfig;
use crate::notifications::NotificationSource;
use crate::permissions::{Capability, CapabilityChecker};
use crate::thread::PostSource;
use ctzn_types::*;

/// API client for communicating with a CTZN server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session_token: Option<String>,
    session: Option<SessionInfo>,
    log_config: LogConfig,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: None,
            session: None,
            log_config: LogConfig::default(),
        }
    }

    pub fn set_log_config(&mut self, log_config: LogConfig) {
        self.log_config = log_config;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the session token for authenticated requests
    pub fn set_session_token(&mut self, token: Option<String>) {
        self.session_token = token;
        self.session = None;
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.session_token {
            req.header("X-Session-Token", token)
        } else {
            req
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn handle_empty(&self, response: reqwest::Response) -> ApiResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = if error_text.contains("<html>") || error_text.contains("<!DOCTYPE") {
            format!("Server returned {} error. Please check the server URL.", status.as_u16())
        } else if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&error_text) {
            parsed.error
        } else {
            error_text
        };

        match status.as_u16() {
            404 => ApiError::NotFound(message),
            401 => ApiError::Unauthorized(message),
            400 | 422 => ApiError::Validation(message),
            _ => ApiError::Api(message),
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> ApiResult<T> {
        log_api_call!(self.log_config, "GET {}", url);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Session

    /// Fetch the signed-in user's session, cached for capability checks
    pub async fn load_session(&mut self) -> ApiResult<&SessionInfo> {
        let url = format!("{}/session", self.base_url);
        let info: SessionInfo = self.get(url).await?;
        log::info!("signed in as {}", info.user_id);
        Ok(self.session.insert(info))
    }

    // Posts

    pub async fn get_post(&self, author_id: &str, url: &str) -> ApiResult<Post> {
        self.get(format!(
            "{}/posts?authorId={}&url={}",
            self.base_url,
            urlencoding::encode(author_id),
            urlencoding::encode(url)
        ))
        .await
    }

    pub async fn get_replies(&self, author_id: &str, url: &str) -> ApiResult<Vec<Post>> {
        self.get(format!(
            "{}/posts/replies?authorId={}&url={}",
            self.base_url,
            urlencoding::encode(author_id),
            urlencoding::encode(url)
        ))
        .await
    }

    pub async fn create_reply(&self, request: &CreateReplyRequest) -> ApiResult<Post> {
        let url = format!("{}/posts/replies", self.base_url);
        log_api_call!(self.log_config, "POST {}", url);
        let req = self.add_auth_header(self.client.post(&url).json(request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Communities

    pub async fn get_permission(&self, community_id: &str, user_id: &str, permission: Permission) -> ApiResult<bool> {
        let res: PermissionResponse = self
            .get(format!(
                "{}/communities/{}/permissions/{}/{}",
                self.base_url,
                urlencoding::encode(community_id),
                urlencoding::encode(user_id),
                urlencoding::encode(permission.as_str())
            ))
            .await?;
        Ok(res.granted)
    }

    pub async fn get_members(
        &self,
        community_id: &str,
        gt: Option<&str>,
        limit: usize,
    ) -> ApiResult<Vec<CommunityMember>> {
        let mut url = format!(
            "{}/communities/{}/members?limit={}",
            self.base_url,
            urlencoding::encode(community_id),
            limit
        );
        if let Some(gt) = gt {
            url.push_str(&format!("&gt={}", urlencoding::encode(gt)));
        }
        self.get(url).await
    }

    pub async fn lookup_user(&self, user_id: &str) -> ApiResult<UserLookup> {
        self.get(format!(
            "{}/users/lookup?id={}",
            self.base_url,
            urlencoding::encode(user_id)
        ))
        .await
    }

    pub async fn transfer_item(&self, community_id: &str, request: &TransferItemRequest) -> ApiResult<()> {
        let url = format!(
            "{}/communities/{}/items/transfer",
            self.base_url,
            urlencoding::encode(community_id)
        );
        log_api_call!(self.log_config, "POST {}", url);
        let req = self.add_auth_header(self.client.post(&url).json(request));
        let response = req.send().await?;
        self.handle_empty(response).await
    }

    // Notifications

    pub async fn get_notifications_cleared_at(&self) -> ApiResult<Option<DateTime<Utc>>> {
        let res: ClearedAtResponse = self
            .get(format!("{}/notifications/cleared-at", self.base_url))
            .await?;
        Ok(res.cleared_at)
    }

    pub async fn update_notifications_cleared_at(&self) -> ApiResult<()> {
        let url = format!("{}/notifications/cleared-at", self.base_url);
        log_api_call!(self.log_config, "PUT {}", url);
        let body = ClearedAtResponse {
            cleared_at: Some(Utc::now()),
        };
        let req = self.add_auth_header(self.client.put(&url).json(&body));
        let response = req.send().await?;
        self.handle_empty(response).await
    }

    pub async fn get_notifications(&self, after: Option<DateTime<Utc>>) -> ApiResult<Vec<Notification>> {
        let mut url = format!("{}/notifications", self.base_url);
        if let Some(after) = after {
            url.push_str(&format!("?after={}", urlencoding::encode(&after.to_rfc3339())));
        }
        self.get(url).await
    }
}

#[async_trait]
impl PostSource for ApiClient {
    async fn fetch_post(&self, author_id: &str, url: &str) -> ApiResult<Post> {
        self.get_post(author_id, url).await
    }

    async fn fetch_replies(&self, author_id: &str, url: &str) -> ApiResult<Vec<Post>> {
        self.get_replies(author_id, url).await
    }
}

#[async_trait]
impl ReplyBackend for ApiClient {
    async fn submit_reply(&self, subject: &RecordRef, parent: &RecordRef, body: &ReplyBody) -> ApiResult<Post> {
        let request = CreateReplyRequest {
            text: body.text.clone(),
            reply: ReplyRef {
                root: subject.clone(),
                parent: (parent.db_url != subject.db_url).then(|| parent.clone()),
            },
            community: body.community.clone(),
        };
        self.create_reply(&request).await
    }
}

#[async_trait]
impl CapabilityChecker for ApiClient {
    async fn current_user_capability(&self, scope_id: &str, capability: Capability) -> ApiResult<bool> {
        let session = match &self.session {
            Some(session) => session,
            None => return Ok(false),
        };
        match capability {
            Capability::CommunityMember => Ok(session.communities.iter().any(|c| c == scope_id)),
            Capability::FollowedBy => Ok(session.followers.iter().any(|f| f == scope_id)),
            Capability::Role(permission) => {
                self.get_permission(scope_id, &session.user_id, permission).await
            }
        }
    }

    fn current_user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }
}

#[async_trait]
impl ItemBackend for ApiClient {
    async fn list_members(
        &self,
        community_id: &str,
        gt: Option<&str>,
        limit: usize,
    ) -> ApiResult<Vec<CommunityMember>> {
        self.get_members(community_id, gt, limit).await
    }

    async fn lookup_user(&self, user_id: &str) -> ApiResult<UserLookup> {
        ApiClient::lookup_user(self, user_id).await
    }

    async fn transfer_item(&self, community_id: &str, request: &TransferItemRequest) -> ApiResult<()> {
        ApiClient::transfer_item(self, community_id, request).await
    }
}

#[async_trait]
impl NotificationSource for ApiClient {
    async fn get_cleared_at(&self) -> ApiResult<Option<DateTime<Utc>>> {
        self.get_notifications_cleared_at().await
    }

    async fn update_cleared_at(&self) -> ApiResult<()> {
        self.update_notifications_cleared_at().await
    }

    async fn list_notifications(&self, after: Option<DateTime<Utc>>) -> ApiResult<Vec<Notification>> {
        self.get_notifications(after).await
    }
}
