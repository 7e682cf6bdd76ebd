//! Rolegate - Core
//!
//! Role and permission authorization for an administration surface.
//!
//! # Overview
//!
//! Rolegate covers two paths over one remote catalog of permissions and
//! roles:
//!
//! - **Administration**: read the catalog, load the role x permission
//!   matrix and toggle single cells with per-cell serialization
//! - **Authorization**: resolve the session's permissions and roles once,
//!   then answer membership questions and gate content on them
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rolegate_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RolegateConfig::load()?;
//!     let backend: Arc<dyn PermissionBackend> = Arc::new(HttpBackend::from_config(&config.client)?);
//!
//!     let store = MatrixStore::new(backend.clone());
//!     let matrix = store.load_matrix().await?;
//!     println!("{} roles", matrix.roles().len());
//!
//!     let session = SessionState::ready(SessionResolver::new(backend).fetch().await?);
//!     let gate = AccessGate::new(AccessPolicy::permission("crear_usuario"));
//!     if let Some(label) = gate.render(&session, || "Create user").into_option() {
//!         println!("{label}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`model`] - Permission, role and matrix cell types
//! - [`backend`] - Remote catalog seam (`PermissionBackend`), HTTP and in-memory
//! - [`catalog`] - Permission catalog client
//! - [`matrix`] - Role-permission matrix snapshot and store
//! - [`rbac`] - Session authority, evaluator and access gate
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - `log` backend used by the binaries

pub mod backend;
pub mod catalog;
pub mod config; // Configuration system with TOML support
pub mod error;
pub mod logging; // Logger for the standard log crate
pub mod matrix;
pub mod model;
pub mod prelude;
pub mod rbac; // Session authority and access gates

pub use error::{AuthzError, AuthzResult};
