//! Permission backend seam
//!
//! Every component of the authorization core talks to the backend through
//! [`PermissionBackend`]. Two implementations ship with the crate:
//!
//! - [`HttpBackend`]: the REST client used in production
//! - [`MemoryBackend`]: in-process backend for tests, demos and offline work
//!
//! Implement the trait to plug another transport.

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::{MemoryBackend, MutationHold};

use crate::model::{
    CategoryGroup, Permission, PermissionDraft, PermissionId, Role, RoleDraft, RoleId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result type of backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Transport-level failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Connection refused, timeout, DNS failure
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// HTTP 409: the requested state already holds
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Wire form of `GET /roles/permission-matrix`
///
/// `matrix` maps a role id (JSON object key) to the ids of the permissions
/// the role grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixPayload {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub matrix: BTreeMap<RoleId, Vec<PermissionId>>,
}

/// Wire form of the resolved session authority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Operations the authorization core needs from the backend
///
/// Assign and revoke are expected to be idempotent; a backend that reports
/// [`BackendError::Conflict`] instead is tolerated by the matrix store.
#[async_trait::async_trait]
pub trait PermissionBackend: Send + Sync {
    /// `GET /permissions`
    async fn list_permissions(&self) -> BackendResult<Vec<Permission>>;

    /// `GET /permissions/by-category`
    async fn list_permissions_by_category(&self) -> BackendResult<Vec<CategoryGroup>>;

    /// `POST /permissions`
    async fn create_permission(&self, draft: &PermissionDraft) -> BackendResult<Permission>;

    /// `PUT /permissions/{id}`
    async fn update_permission(
        &self,
        id: PermissionId,
        draft: &PermissionDraft,
    ) -> BackendResult<Permission>;

    /// `DELETE /permissions/{id}`
    async fn delete_permission(&self, id: PermissionId) -> BackendResult<()>;

    /// `GET /roles`
    async fn list_roles(&self) -> BackendResult<Vec<Role>>;

    /// `POST /roles`
    async fn create_role(&self, draft: &RoleDraft) -> BackendResult<Role>;

    /// `PUT /roles/{id}`
    async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> BackendResult<Role>;

    /// `DELETE /roles/{id}`
    async fn delete_role(&self, id: RoleId) -> BackendResult<()>;

    /// `GET /roles/{roleId}/permissions`
    async fn role_permissions(&self, role_id: RoleId) -> BackendResult<Vec<Permission>>;

    /// `POST /roles/{roleId}/permissions/{permissionId}`
    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()>;

    /// `DELETE /roles/{roleId}/permissions/{permissionId}`
    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()>;

    /// `GET /roles/permission-matrix`
    async fn permission_matrix(&self) -> BackendResult<MatrixPayload>;

    /// `GET /auth/session`
    async fn session_authority(&self) -> BackendResult<SessionPayload>;
}

// Implement PermissionBackend for Arc<B> to allow sharing one backend
#[async_trait::async_trait]
impl<B: PermissionBackend + ?Sized> PermissionBackend for std::sync::Arc<B> {
    async fn list_permissions(&self) -> BackendResult<Vec<Permission>> {
        (**self).list_permissions().await
    }

    async fn list_permissions_by_category(&self) -> BackendResult<Vec<CategoryGroup>> {
        (**self).list_permissions_by_category().await
    }

    async fn create_permission(&self, draft: &PermissionDraft) -> BackendResult<Permission> {
        (**self).create_permission(draft).await
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        draft: &PermissionDraft,
    ) -> BackendResult<Permission> {
        (**self).update_permission(id, draft).await
    }

    async fn delete_permission(&self, id: PermissionId) -> BackendResult<()> {
        (**self).delete_permission(id).await
    }

    async fn list_roles(&self) -> BackendResult<Vec<Role>> {
        (**self).list_roles().await
    }

    async fn create_role(&self, draft: &RoleDraft) -> BackendResult<Role> {
        (**self).create_role(draft).await
    }

    async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> BackendResult<Role> {
        (**self).update_role(id, draft).await
    }

    async fn delete_role(&self, id: RoleId) -> BackendResult<()> {
        (**self).delete_role(id).await
    }

    async fn role_permissions(&self, role_id: RoleId) -> BackendResult<Vec<Permission>> {
        (**self).role_permissions(role_id).await
    }

    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        (**self).assign_permission(role_id, permission_id).await
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        (**self).revoke_permission(role_id, permission_id).await
    }

    async fn permission_matrix(&self) -> BackendResult<MatrixPayload> {
        (**self).permission_matrix().await
    }

    async fn session_authority(&self) -> BackendResult<SessionPayload> {
        (**self).session_authority().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_payload_role_ids_are_object_keys() {
        let json = r#"{
            "roles": [{"id": 10, "name": "Admin"}],
            "permissions": [{"id": 1, "name": "crear_usuario", "category": "sistema"}],
            "matrix": {"10": [1]}
        }"#;
        let payload: MatrixPayload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.matrix.get(&10), Some(&vec![1]));
        assert!(!payload.roles[0].is_default);
    }

    #[test]
    fn test_session_payload_missing_arrays_are_empty() {
        let payload: SessionPayload = serde_json::from_str(r#"{"roles":["Viewer"]}"#).unwrap();
        assert!(payload.permissions.is_empty());
        assert_eq!(payload.roles, vec!["Viewer".to_string()]);
    }
}
