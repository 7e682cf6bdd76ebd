//! In-memory permission backend
//!
//! Keeps the catalog and the assignment relation in a `RwLock`-guarded
//! state. Behaves like the REST backend: assign and revoke are idempotent,
//! ids are allocated by the backend, deleting a role or permission drops its
//! assignments. Suitable for tests, demos and offline development.

use super::{BackendError, BackendResult, MatrixPayload, PermissionBackend, SessionPayload};
use crate::catalog::group_by_category;
use crate::model::{
    CategoryGroup, Permission, PermissionDraft, PermissionId, Role, RoleDraft, RoleId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::OwnedRwLockWriteGuard;

#[derive(Debug, Default)]
struct MemoryState {
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    assignments: BTreeMap<RoleId, BTreeSet<PermissionId>>,
    /// Assigning the key also assigns the implied permissions
    implications: HashMap<PermissionId, Vec<PermissionId>>,
    session: SessionPayload,
    next_permission_id: PermissionId,
    next_role_id: RoleId,
}

impl MemoryState {
    fn permission_exists(&self, id: PermissionId) -> bool {
        self.permissions.iter().any(|p| p.id == id)
    }

    fn role_exists(&self, id: RoleId) -> bool {
        self.roles.iter().any(|r| r.id == id)
    }

    fn check_cell(&self, role_id: RoleId, permission_id: PermissionId) -> BackendResult<()> {
        if !self.role_exists(role_id) {
            return Err(BackendError::NotFound(format!("role {}", role_id)));
        }
        if !self.permission_exists(permission_id) {
            return Err(BackendError::NotFound(format!("permission {}", permission_id)));
        }
        Ok(())
    }
}

/// Guard returned by [`MemoryBackend::hold_mutations`]
///
/// Assign and revoke calls wait until the guard is dropped.
pub struct MutationHold {
    _guard: OwnedRwLockWriteGuard<()>,
}

/// In-memory permission backend
///
/// # Example
///
/// ```
/// use rolegate_core::backend::MemoryBackend;
/// use rolegate_core::model::{Permission, Role};
///
/// let backend = MemoryBackend::new()
///     .with_permission(Permission::new(1, "crear_usuario", "sistema"))
///     .with_role(Role::new(10, "Admin"))
///     .with_assignment(10, 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
    mutation_gate: Arc<tokio::sync::RwLock<()>>,
    matrix_delays: Arc<Mutex<VecDeque<Duration>>>,
    offline: Arc<AtomicBool>,
    strict_conflicts: Arc<AtomicBool>,
    matrix_failures: Arc<AtomicUsize>,
    matrix_fetches: Arc<AtomicUsize>,
    mutations: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog used by the CLI `--demo` mode
    pub fn demo() -> Self {
        Self::new()
            .with_permission(
                Permission::new(1, "crear_usuario", "sistema").with_description("Create users"),
            )
            .with_permission(
                Permission::new(2, "ver_informes", "informes").with_description("Read reports"),
            )
            .with_permission(Permission::new(3, "crear_proyecto", "proyectos"))
            .with_permission(Permission::new(4, "editar_proyecto", "proyectos"))
            .with_permission(Permission::new(5, "crear_tarea", "tareas"))
            .with_permission(Permission::new(6, "asignar_tarea", "tareas"))
            .with_role(Role::new(10, "Admin"))
            .with_role(Role::new(11, "Viewer").as_default())
            .with_role(Role::new(12, "Project Manager"))
            .with_assignment(10, 1)
            .with_assignment(10, 2)
            .with_assignment(11, 2)
            .with_assignment(12, 3)
            .with_assignment(12, 4)
            .with_assignment(12, 5)
            .with_implication(4, 3)
            .with_session(SessionPayload {
                permissions: vec!["ver_informes".to_string()],
                roles: vec!["Viewer".to_string()],
            })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a permission with a caller-chosen id
    pub fn with_permission(self, permission: Permission) -> Self {
        {
            let mut state = self.write_state();
            state.next_permission_id = state.next_permission_id.max(permission.id + 1);
            state.permissions.push(permission);
        }
        self
    }

    /// Add a role with a caller-chosen id
    pub fn with_role(self, role: Role) -> Self {
        {
            let mut state = self.write_state();
            state.next_role_id = state.next_role_id.max(role.id + 1);
            state.roles.push(role);
        }
        self
    }

    /// Grant a permission to a role
    pub fn with_assignment(self, role_id: RoleId, permission_id: PermissionId) -> Self {
        self.write_state().assignments.entry(role_id).or_default().insert(permission_id);
        self
    }

    /// Assigning `permission_id` also assigns `implied`
    ///
    /// Models server-side cascades the client cannot predict.
    pub fn with_implication(self, permission_id: PermissionId, implied: PermissionId) -> Self {
        self.write_state().implications.entry(permission_id).or_default().push(implied);
        self
    }

    /// Payload served by `session_authority`
    pub fn with_session(self, session: SessionPayload) -> Self {
        self.write_state().session = session;
        self
    }

    /// Report HTTP 409 on redundant assign/revoke instead of succeeding
    pub fn with_strict_conflicts(self) -> Self {
        self.strict_conflicts.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay the response of the next matrix fetch
    ///
    /// Delays are consumed in fetch order. The payload is captured before
    /// the delay, so a delayed fetch returns data older than a fetch issued
    /// after it.
    pub fn delay_next_matrix_fetch(&self, delay: Duration) {
        self.matrix_delays.lock().unwrap_or_else(|p| p.into_inner()).push_back(delay);
    }

    /// Make the next `count` matrix fetches fail as unreachable
    ///
    /// Counted fetches only; mutations keep working.
    pub fn fail_next_matrix_fetches(&self, count: usize) {
        self.matrix_failures.fetch_add(count, Ordering::SeqCst);
    }

    /// Block assign/revoke until the returned guard is dropped
    pub async fn hold_mutations(&self) -> MutationHold {
        MutationHold { _guard: self.mutation_gate.clone().write_owned().await }
    }

    /// Number of `permission_matrix` calls served
    pub fn matrix_fetches(&self) -> usize {
        self.matrix_fetches.load(Ordering::SeqCst)
    }

    /// Number of assign/revoke calls applied
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Current assignment of a role, bypassing the REST surface
    pub fn assigned(&self, role_id: RoleId) -> BTreeSet<PermissionId> {
        self.read_state().assignments.get(&role_id).cloned().unwrap_or_default()
    }

    fn ensure_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unreachable("memory backend is offline".to_string()));
        }
        Ok(())
    }

    fn conflict_or_ok(&self, message: String) -> BackendResult<()> {
        if self.strict_conflicts.load(Ordering::SeqCst) {
            return Err(BackendError::Conflict(message));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PermissionBackend for MemoryBackend {
    async fn list_permissions(&self) -> BackendResult<Vec<Permission>> {
        self.ensure_online()?;
        Ok(self.read_state().permissions.clone())
    }

    async fn list_permissions_by_category(&self) -> BackendResult<Vec<CategoryGroup>> {
        self.ensure_online()?;
        Ok(group_by_category(&self.read_state().permissions))
    }

    async fn create_permission(&self, draft: &PermissionDraft) -> BackendResult<Permission> {
        self.ensure_online()?;
        let mut state = self.write_state();
        if state.permissions.iter().any(|p| p.name == draft.name) {
            return Err(BackendError::Conflict(format!("permission {} exists", draft.name)));
        }
        let id = state.next_permission_id.max(1);
        state.next_permission_id = id + 1;
        let permission = draft.clone().into_permission(id);
        state.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        draft: &PermissionDraft,
    ) -> BackendResult<Permission> {
        self.ensure_online()?;
        let mut state = self.write_state();
        if state.permissions.iter().any(|p| p.name == draft.name && p.id != id) {
            return Err(BackendError::Conflict(format!("permission {} exists", draft.name)));
        }
        let slot = state
            .permissions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("permission {}", id)))?;
        *slot = draft.clone().into_permission(id);
        Ok(slot.clone())
    }

    async fn delete_permission(&self, id: PermissionId) -> BackendResult<()> {
        self.ensure_online()?;
        let mut state = self.write_state();
        if !state.permission_exists(id) {
            return Err(BackendError::NotFound(format!("permission {}", id)));
        }
        state.permissions.retain(|p| p.id != id);
        for granted in state.assignments.values_mut() {
            granted.remove(&id);
        }
        state.implications.remove(&id);
        Ok(())
    }

    async fn list_roles(&self) -> BackendResult<Vec<Role>> {
        self.ensure_online()?;
        Ok(self.read_state().roles.clone())
    }

    async fn create_role(&self, draft: &RoleDraft) -> BackendResult<Role> {
        self.ensure_online()?;
        let mut state = self.write_state();
        if state.roles.iter().any(|r| r.name == draft.name) {
            return Err(BackendError::Conflict(format!("role {} exists", draft.name)));
        }
        let id = state.next_role_id.max(1);
        state.next_role_id = id + 1;
        let role = draft.clone().into_role(id);
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: RoleId, draft: &RoleDraft) -> BackendResult<Role> {
        self.ensure_online()?;
        let mut state = self.write_state();
        let slot = state
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("role {}", id)))?;
        *slot = draft.clone().into_role(id);
        Ok(slot.clone())
    }

    async fn delete_role(&self, id: RoleId) -> BackendResult<()> {
        self.ensure_online()?;
        let mut state = self.write_state();
        if !state.role_exists(id) {
            return Err(BackendError::NotFound(format!("role {}", id)));
        }
        state.roles.retain(|r| r.id != id);
        state.assignments.remove(&id);
        Ok(())
    }

    async fn role_permissions(&self, role_id: RoleId) -> BackendResult<Vec<Permission>> {
        self.ensure_online()?;
        let state = self.read_state();
        if !state.role_exists(role_id) {
            return Err(BackendError::NotFound(format!("role {}", role_id)));
        }
        let granted = state.assignments.get(&role_id);
        Ok(state
            .permissions
            .iter()
            .filter(|p| granted.is_some_and(|set| set.contains(&p.id)))
            .cloned()
            .collect())
    }

    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        let _permit = self.mutation_gate.read().await;
        self.ensure_online()?;

        let mut state = self.write_state();
        state.check_cell(role_id, permission_id)?;

        let implied = state.implications.get(&permission_id).cloned().unwrap_or_default();
        let granted = state.assignments.entry(role_id).or_default();
        let inserted = granted.insert(permission_id);
        granted.extend(implied);
        drop(state);

        self.mutations.fetch_add(1, Ordering::SeqCst);
        if !inserted {
            return self.conflict_or_ok(format!("role {} already has {}", role_id, permission_id));
        }
        Ok(())
    }

    async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> BackendResult<()> {
        let _permit = self.mutation_gate.read().await;
        self.ensure_online()?;

        let mut state = self.write_state();
        state.check_cell(role_id, permission_id)?;
        let removed =
            state.assignments.get_mut(&role_id).is_some_and(|set| set.remove(&permission_id));
        drop(state);

        self.mutations.fetch_add(1, Ordering::SeqCst);
        if !removed {
            return self.conflict_or_ok(format!("role {} lacks {}", role_id, permission_id));
        }
        Ok(())
    }

    async fn permission_matrix(&self) -> BackendResult<MatrixPayload> {
        self.ensure_online()?;
        self.matrix_fetches.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .matrix_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(BackendError::Unreachable("matrix fetch failed".to_string()));
        }

        let payload = {
            let state = self.read_state();
            MatrixPayload {
                roles: state.roles.clone(),
                permissions: state.permissions.clone(),
                matrix: state
                    .roles
                    .iter()
                    .map(|role| {
                        let granted = state
                            .assignments
                            .get(&role.id)
                            .map(|set| set.iter().copied().collect())
                            .unwrap_or_default();
                        (role.id, granted)
                    })
                    .collect(),
            }
        };

        let delay = self.matrix_delays.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(payload)
    }

    async fn session_authority(&self) -> BackendResult<SessionPayload> {
        self.ensure_online()?;
        Ok(self.read_state().session.clone())
    }
}
