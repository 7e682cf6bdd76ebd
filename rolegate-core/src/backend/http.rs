//! REST client for the permission backend

use super::{BackendError, BackendResult, MatrixPayload, PermissionBackend, SessionPayload};
use crate::config::ClientConfig;
use crate::model::{
    CategoryGroup, Permission, PermissionDraft, PermissionId, Role, RoleDraft, RoleId,
};
use anyhow::Context;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Permission backend reached over HTTP
///
/// # Example
///
/// ```rust,ignore
/// let backend = HttpBackend::new("https://admin.example.com/api")
///     .with_token("eyJhbGciOi...");
/// let roles = backend.list_roles().await?;
/// ```
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a client with default HTTP settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url, token: None }
    }

    /// Build from the `[client]` configuration section
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let mut backend = Self::with_client(client, config.base_url.clone());
        backend.token = config.token.clone();
        Ok(backend)
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response =
            builder.send().await.map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::CONFLICT => BackendError::Conflict(message),
            StatusCode::NOT_FOUND => BackendError::NotFound(message),
            other => BackendError::Status { status: other.as_u16(), message },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        response.json::<T>().await.map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        log::debug!("GET {}{}", self.base_url, path);
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> BackendResult<T>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("{} {}{}", method, self.base_url, path);
        let response = self.send(self.request(method, path).json(body)).await?;
        Self::decode(response).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> BackendResult<()> {
        log::debug!("{} {}{}", method, self.base_url, path);
        self.send(self.request(method, path)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PermissionBackend for HttpBackend {
    async fn list_permissions(&self) -> BackendResult<Vec<Permission>> {
        self.get_json("/permissions").await
    }

    async fn list_permissions_by_category(&self) -> BackendResult<Vec<CategoryGroup>> {
        self.get_json("/permissions/by-category").await
    }

    async fn create_permission(&self, draft: &PermissionDraft) -> BackendResult<Permission> {
        self.send_json(Method::POST, "/permissions", draft).await
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        draft: &PermissionDraft,
    ) -> BackendResult<Permission> {
        self.send_json(Method::PUT, &format!("/permissions/{}", id), draft).await
    }

    async fn delete_permission(&self, id: PermissionId) -> BackendResult<()> {
        self.send_empty(Method::DELETE, &format!("/permissions/{}", id)).await
    }

    async fn list_roles(&self) -> BackendResult<Vec<Role>> {
        self.get_json("/roles").await
    }

    async fn create_role(&self, draft: &RoleDraft) -> BackendResult<Role> {
        self.send_json(Method::POST, "/roles", draft).await
    }

    async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> BackendResult<Role> {
        self.send_json(Method::PUT, &format!("/roles/{}", id), draft).await
    }

    async fn delete_role(&self, id: RoleId) -> BackendResult<()> {
        self.send_empty(Method::DELETE, &format!("/roles/{}", id)).await
    }

    async fn role_permissions(&self, role_id: RoleId) -> BackendResult<Vec<Permission>> {
        self.get_json(&format!("/roles/{}/permissions", role_id)).await
    }

    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        let path = format!("/roles/{}/permissions/{}", role_id, permission_id);
        self.send_empty(Method::POST, &path).await
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        let path = format!("/roles/{}/permissions/{}", role_id, permission_id);
        self.send_empty(Method::DELETE, &path).await
    }

    async fn permission_matrix(&self) -> BackendResult<MatrixPayload> {
        self.get_json("/roles/permission-matrix").await
    }

    async fn session_authority(&self) -> BackendResult<SessionPayload> {
        self.get_json("/auth/session").await
    }
}
