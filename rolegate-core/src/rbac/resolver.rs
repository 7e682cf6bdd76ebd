//! Session authority resolution
//!
//! Two ways to obtain a [`SessionAuthority`]:
//!
//! - [`SessionResolver::fetch`]: take the payload the backend resolved for
//!   the current session
//! - [`SessionResolver::resolve`]: expand a user's role names through the
//!   catalog (`GET /roles`, then `GET /roles/{id}/permissions` per role)

use super::context::SessionAuthority;
use crate::backend::PermissionBackend;
use crate::error::{AuthzError, AuthzResult};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionResolver {
    backend: Arc<dyn PermissionBackend>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self { backend }
    }

    /// Authority resolved by the backend for the current session
    pub async fn fetch(&self) -> AuthzResult<SessionAuthority> {
        let payload = self.backend.session_authority().await.map_err(AuthzError::catalog)?;
        log::debug!(
            "Session authority: {} permissions, {} roles",
            payload.permissions.len(),
            payload.roles.len()
        );
        Ok(payload.into())
    }

    /// Expand role names into the union of their permissions
    ///
    /// Role names unknown to the catalog stay in the role set but grant
    /// nothing.
    pub async fn resolve<S: AsRef<str>>(&self, role_names: &[S]) -> AuthzResult<SessionAuthority> {
        let wanted: HashSet<&str> = role_names.iter().map(AsRef::as_ref).collect();
        let roles = self.backend.list_roles().await.map_err(AuthzError::catalog)?;

        let mut permissions = HashSet::new();
        for role in roles.iter().filter(|r| wanted.contains(r.name.as_str())) {
            let granted =
                self.backend.role_permissions(role.id).await.map_err(AuthzError::catalog)?;
            permissions.extend(granted.into_iter().map(|p| p.name));
        }

        for name in &wanted {
            if !roles.iter().any(|r| r.name == *name) {
                log::warn!("Session role {} is not in the catalog", name);
            }
        }

        Ok(SessionAuthority::new(permissions, wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, SessionPayload};
    use crate::model::{Permission, Role};

    fn resolver() -> (MemoryBackend, SessionResolver) {
        let backend = MemoryBackend::new()
            .with_permission(Permission::new(1, "crear_usuario", "sistema"))
            .with_permission(Permission::new(2, "ver_informes", "informes"))
            .with_permission(Permission::new(3, "crear_tarea", "tareas"))
            .with_role(Role::new(10, "Admin"))
            .with_role(Role::new(11, "Viewer"))
            .with_role(Role::new(12, "Planner"))
            .with_assignment(10, 1)
            .with_assignment(10, 2)
            .with_assignment(11, 2)
            .with_assignment(12, 3)
            .with_session(SessionPayload {
                permissions: vec!["ver_informes".into()],
                roles: vec!["Viewer".into()],
            });
        (backend.clone(), SessionResolver::new(Arc::new(backend)))
    }

    #[tokio::test]
    async fn test_fetch_uses_backend_payload() {
        let (_, resolver) = resolver();
        let authority = resolver.fetch().await.unwrap();
        assert!(authority.contains_permission("ver_informes"));
        assert!(authority.contains_role("Viewer"));
    }

    #[tokio::test]
    async fn test_resolve_unions_role_permissions() {
        let (_, resolver) = resolver();
        let authority = resolver.resolve(&["Viewer", "Planner"]).await.unwrap();

        assert!(authority.contains_permission("ver_informes"));
        assert!(authority.contains_permission("crear_tarea"));
        assert!(!authority.contains_permission("crear_usuario"));
        assert!(authority.contains_role("Planner"));
    }

    #[tokio::test]
    async fn test_unknown_role_grants_nothing() {
        let (_, resolver) = resolver();
        let authority = resolver.resolve(&["Ghost"]).await.unwrap();
        assert!(authority.permissions().is_empty());
        assert!(authority.contains_role("Ghost"));
    }

    #[tokio::test]
    async fn test_offline_backend() {
        let (backend, resolver) = resolver();
        backend.set_offline(true);
        assert!(matches!(resolver.fetch().await, Err(AuthzError::CatalogUnavailable(_))));
        assert!(matches!(
            resolver.resolve(&["Viewer"]).await,
            Err(AuthzError::CatalogUnavailable(_))
        ));
    }
}
