//! Permission catalog client
//!
//! Read path for permissions and roles, plus the administrative CRUD
//! pass-through. No caching: every call hits the backend and callers decide
//! the refresh cadence. Catalog CRUD never touches a matrix snapshot; reload
//! the matrix store afterwards to reflect the change.

use crate::backend::PermissionBackend;
use crate::error::{AuthzError, AuthzResult};
use crate::model::{
    CategoryGroup, Permission, PermissionDraft, PermissionId, Role, RoleDraft, RoleId,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Group permissions by category, keeping arrival order
///
/// Groups appear in the order their category is first seen and each group
/// keeps the input order of its permissions.
pub fn group_by_category(permissions: &[Permission]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for permission in permissions {
        match groups.iter_mut().find(|g| g.category == permission.category) {
            Some(group) => group.permissions.push(permission.clone()),
            None => groups.push(CategoryGroup {
                category: permission.category.clone(),
                permissions: vec![permission.clone()],
            }),
        }
    }
    groups
}

/// Client for the permission and role catalog
#[derive(Clone)]
pub struct PermissionCatalog {
    backend: Arc<dyn PermissionBackend>,
}

impl PermissionCatalog {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self { backend }
    }

    /// Flat permission list in backend order
    pub async fn list_permissions(&self) -> AuthzResult<Vec<Permission>> {
        let permissions = self.backend.list_permissions().await.map_err(AuthzError::catalog)?;
        log::debug!("Catalog: {} permissions", permissions.len());
        Ok(permissions)
    }

    /// Permissions grouped by category, in backend order
    ///
    /// A response that places one permission in two groups is malformed.
    pub async fn list_permissions_by_category(&self) -> AuthzResult<Vec<CategoryGroup>> {
        let groups =
            self.backend.list_permissions_by_category().await.map_err(AuthzError::catalog)?;

        let mut seen = HashSet::new();
        for group in &groups {
            for permission in &group.permissions {
                if !seen.insert(permission.id) {
                    log::warn!(
                        "Catalog: permission {} listed in more than one category",
                        permission.id
                    );
                    return Err(AuthzError::CatalogUnavailable(format!(
                        "permission {} appears in more than one category group",
                        permission.id
                    )));
                }
            }
        }

        log::debug!("Catalog: {} permissions in {} categories", seen.len(), groups.len());
        Ok(groups)
    }

    pub async fn list_roles(&self) -> AuthzResult<Vec<Role>> {
        let roles = self.backend.list_roles().await.map_err(AuthzError::catalog)?;
        log::debug!("Catalog: {} roles", roles.len());
        Ok(roles)
    }

    /// Permissions currently granted to one role
    pub async fn role_permissions(&self, role_id: RoleId) -> AuthzResult<Vec<Permission>> {
        self.backend.role_permissions(role_id).await.map_err(AuthzError::catalog)
    }

    pub async fn create_permission(&self, draft: &PermissionDraft) -> AuthzResult<Permission> {
        let permission = self.backend.create_permission(draft).await.map_err(network)?;
        log::info!("Catalog: created permission {} ({})", permission.name, permission.id);
        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        id: PermissionId,
        draft: &PermissionDraft,
    ) -> AuthzResult<Permission> {
        let permission = self.backend.update_permission(id, draft).await.map_err(network)?;
        log::info!("Catalog: updated permission {}", id);
        Ok(permission)
    }

    pub async fn delete_permission(&self, id: PermissionId) -> AuthzResult<()> {
        self.backend.delete_permission(id).await.map_err(network)?;
        log::info!("Catalog: deleted permission {}", id);
        Ok(())
    }

    pub async fn create_role(&self, draft: &RoleDraft) -> AuthzResult<Role> {
        let role = self.backend.create_role(draft).await.map_err(network)?;
        log::info!("Catalog: created role {} ({})", role.name, role.id);
        Ok(role)
    }

    pub async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> AuthzResult<Role> {
        let role = self.backend.update_role(id, draft).await.map_err(network)?;
        log::info!("Catalog: updated role {}", id);
        Ok(role)
    }

    pub async fn delete_role(&self, id: RoleId) -> AuthzResult<()> {
        self.backend.delete_role(id).await.map_err(network)?;
        log::info!("Catalog: deleted role {}", id);
        Ok(())
    }
}

fn network(err: crate::backend::BackendError) -> AuthzError {
    AuthzError::NetworkError(err.to_string())
}
