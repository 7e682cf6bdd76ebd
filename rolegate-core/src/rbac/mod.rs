//! Authorization path: session authority, evaluator and access gates
//!
//! The session layer resolves a [`SessionAuthority`] once per session and
//! hands it to gates by value (wrapped in [`SessionState`]). Nothing here
//! mutates shared state or performs I/O, except [`SessionResolver`] which
//! builds a fresh authority from the backend.
//!
//! # Example
//! ```rust,ignore
//! let authority = SessionResolver::new(backend).fetch().await?;
//! let session = SessionState::ready(authority);
//!
//! let gate = AccessGate::new(AccessPolicy::permission("crear_usuario"));
//! match gate.render_or(&session, || "Create user", || "Ask an admin") {
//!     GateOutcome::Granted(label) | GateOutcome::Denied(Some(label)) => println!("{label}"),
//!     _ => {}
//! }
//! ```

mod context;
mod evaluator;
mod gate;
mod resolver;

pub use context::{SessionAuthority, SessionState};
pub use evaluator::PermissionEvaluator;
pub use gate::{AccessGate, AccessPolicy, GateOutcome, GateProps, RequireMode};
pub use resolver::SessionResolver;
