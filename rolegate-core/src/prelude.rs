//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use rolegate_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::{BusyPolicy, RolegateConfig};
pub use crate::logging::init_logging;

// === Catalog and backends ===
pub use crate::backend::{HttpBackend, MemoryBackend, PermissionBackend};
pub use crate::catalog::PermissionCatalog;
pub use crate::model::{CategoryGroup, Cell, Permission, PermissionDraft, Role, RoleDraft};

// === Matrix ===
pub use crate::matrix::{Matrix, MatrixStore};

// === Authorization ===
pub use crate::rbac::{
    AccessGate, AccessPolicy, GateOutcome, GateProps, PermissionEvaluator, RequireMode,
    SessionAuthority, SessionResolver, SessionState,
};

// === Errors ===
pub use crate::error::{AuthzError, AuthzResult};
