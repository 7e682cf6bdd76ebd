//! Role/permission assignment matrix
//!
//! A [`Matrix`] is one immutable snapshot of the whole relation. Snapshots
//! are never patched: the [`MatrixStore`] swaps in a freshly fetched one
//! after every mutation.

mod store;

pub use store::MatrixStore;

use crate::backend::MatrixPayload;
use crate::model::{CategoryGroup, Cell, Permission, PermissionId, Role, RoleId};
use std::collections::{HashMap, HashSet};

/// Full role × permission snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    assignments: HashMap<RoleId, HashSet<PermissionId>>,
    /// Load ticket this snapshot was accepted under
    sequence: u64,
}

impl Matrix {
    /// Build a snapshot from the backend payload
    ///
    /// Fails if the payload references a role or permission that is not in
    /// its own catalog lists, or lists a role twice.
    pub fn from_payload(payload: MatrixPayload, sequence: u64) -> Result<Self, String> {
        let role_ids: HashSet<RoleId> = payload.roles.iter().map(|r| r.id).collect();
        if role_ids.len() != payload.roles.len() {
            return Err("duplicate role id in matrix payload".to_string());
        }
        let permission_ids: HashSet<PermissionId> =
            payload.permissions.iter().map(|p| p.id).collect();
        if permission_ids.len() != payload.permissions.len() {
            return Err("duplicate permission id in matrix payload".to_string());
        }

        let mut assignments: HashMap<RoleId, HashSet<PermissionId>> =
            payload.roles.iter().map(|r| (r.id, HashSet::new())).collect();

        for (role_id, granted) in payload.matrix {
            let row = assignments
                .get_mut(&role_id)
                .ok_or_else(|| format!("matrix references unknown role {}", role_id))?;
            for permission_id in granted {
                if !permission_ids.contains(&permission_id) {
                    return Err(format!(
                        "matrix references unknown permission {} for role {}",
                        permission_id, role_id
                    ));
                }
                row.insert(permission_id);
            }
        }

        Ok(Self { roles: payload.roles, permissions: payload.permissions, assignments, sequence })
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Permissions in catalog order
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether `role_id` grants `permission_id`
    pub fn has_assignment(&self, role_id: RoleId, permission_id: PermissionId) -> bool {
        self.assignments.get(&role_id).is_some_and(|set| set.contains(&permission_id))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.has_assignment(cell.role, cell.permission)
    }

    /// Permission ids granted to a role (empty for unknown roles)
    pub fn assigned_to(&self, role_id: RoleId) -> HashSet<PermissionId> {
        self.assignments.get(&role_id).cloned().unwrap_or_default()
    }

    /// Every assigned cell, sorted
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .assignments
            .iter()
            .flat_map(|(role, set)| set.iter().map(move |permission| Cell::new(*role, *permission)))
            .collect();
        cells.sort();
        cells
    }

    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    pub fn permission(&self, permission_id: PermissionId) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.id == permission_id)
    }

    /// Roles flagged as default for new users
    ///
    /// More than one entry is allowed; callers may surface it as a warning.
    pub fn default_roles(&self) -> Vec<&Role> {
        self.roles.iter().filter(|r| r.is_default).collect()
    }

    /// Permissions grouped for display
    ///
    /// Categories sorted lexically ascending; catalog order kept inside each
    /// category.
    pub fn grouped_permissions(&self) -> Vec<CategoryGroup> {
        let mut groups = crate::catalog::group_by_category(&self.permissions);
        groups.sort_by(|a, b| a.category.cmp(&b.category));
        groups
    }
}
