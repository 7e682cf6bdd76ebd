//! Catalog data model: permissions, roles and role/permission cells
//!
//! These are the wire types exchanged with the permission backend. JSON field
//! names follow the backend's camelCase convention (`isDefault`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission identifier (unique, immutable)
pub type PermissionId = i64;

/// Role identifier (unique)
pub type RoleId = i64;

/// Category used when the backend omits one
pub const DEFAULT_CATEGORY: &str = "general";

/// Advisory category tags known to the administration surface.
///
/// Categories are display metadata only. Unknown tags are accepted verbatim.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "system",
    "projects",
    "tasks",
    "subtasks",
    "reports",
    "users",
    "configuration",
    DEFAULT_CATEGORY,
];

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A named capability token (e.g. `crear_usuario`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,

    /// Machine-readable token, unique across the catalog
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Advisory grouping tag, see [`KNOWN_CATEGORIES`]
    #[serde(default = "default_category")]
    pub category: String,
}

impl Permission {
    /// Create a permission without description
    pub fn new(id: PermissionId, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self { id, name: name.into(), description: None, category: category.into() }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the category is one of the advisory tags
    pub fn has_known_category(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.category.as_str())
    }
}

/// A named bundle of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,

    /// Auto-assigned to new users. Advisory: several roles may carry it.
    #[serde(default)]
    pub is_default: bool,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), is_default: false }
    }

    /// Mark the role as default for new users
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// One (role, permission) pair of the assignment matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub role: RoleId,
    pub permission: PermissionId,
}

impl Cell {
    pub fn new(role: RoleId, permission: PermissionId) -> Self {
        Self { role, permission }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role {} / permission {}", self.role, self.permission)
    }
}

/// Permissions sharing one category tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub permissions: Vec<Permission>,
}

/// Payload for creating or updating a permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

impl PermissionDraft {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, category: category.into() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Materialize the draft under a backend-assigned id
    pub fn into_permission(self, id: PermissionId) -> Permission {
        Permission { id, name: self.name, description: self.description, category: self.category }
    }
}

/// Payload for creating or updating a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl RoleDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_default: false }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn into_role(self, id: RoleId) -> Role {
        Role { id, name: self.name, is_default: self.is_default }
    }
}
