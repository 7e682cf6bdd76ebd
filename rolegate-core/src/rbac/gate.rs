//! Access gate: declarative render-if driven by the evaluator
//!
//! A gate holds one [`AccessPolicy`] and decides between the protected
//! content and an optional fallback. Content and fallback are lazy closures,
//! so a gate nested inside the content is only evaluated when the outer one
//! grants access.
//!
//! # Example
//!
//! ```rust,ignore
//! let gate = AccessGate::new(AccessPolicy::any_of(["crear_usuario", "ver_informes"]));
//! let button = gate
//!     .render_or(&session, || "New report", || "Read-only")
//!     .into_option();
//! ```

use super::context::SessionState;
use super::evaluator::PermissionEvaluator;
use crate::error::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};

/// How a permission list is combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequireMode {
    All,
    #[default]
    Any,
}

/// The single predicate a gate evaluates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    Permission(String),
    Role(String),
    Permissions { names: Vec<String>, mode: RequireMode },
}

impl AccessPolicy {
    pub fn permission(name: impl Into<String>) -> Self {
        AccessPolicy::Permission(name.into())
    }

    pub fn role(name: impl Into<String>) -> Self {
        AccessPolicy::Role(name.into())
    }

    pub fn all_of<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        AccessPolicy::Permissions {
            names: names.into_iter().map(Into::into).collect(),
            mode: RequireMode::All,
        }
    }

    pub fn any_of<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        AccessPolicy::Permissions {
            names: names.into_iter().map(Into::into).collect(),
            mode: RequireMode::Any,
        }
    }
}

/// Loose gate configuration, as written in a page definition
///
/// Precedence: `permission`, then `role`, then `permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateProps {
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub require_all: bool,
}

impl TryFrom<GateProps> for AccessPolicy {
    type Error = AuthzError;

    fn try_from(props: GateProps) -> AuthzResult<Self> {
        if let Some(name) = props.permission {
            return Ok(AccessPolicy::Permission(name));
        }
        if let Some(name) = props.role {
            return Ok(AccessPolicy::Role(name));
        }
        match props.permissions {
            Some(names) => {
                let mode = if props.require_all { RequireMode::All } else { RequireMode::Any };
                Ok(AccessPolicy::Permissions { names, mode })
            }
            None => Err(AuthzError::InvalidPolicy(
                "one of permission, role or permissions is required".to_string(),
            )),
        }
    }
}

/// Result of rendering through a gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<T> {
    /// Predicate held; protected content
    Granted(T),
    /// Predicate failed; fallback if one was given
    Denied(Option<T>),
    /// Session authority still loading; render nothing yet
    Pending,
}

impl<T> GateOutcome<T> {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateOutcome::Granted(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GateOutcome::Pending)
    }

    /// What to display: content, fallback, or nothing
    pub fn into_option(self) -> Option<T> {
        match self {
            GateOutcome::Granted(content) => Some(content),
            GateOutcome::Denied(fallback) => fallback,
            GateOutcome::Pending => None,
        }
    }
}

/// Conditional rendering guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    policy: AccessPolicy,
}

impl AccessGate {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    /// Build from loose props; fails if no policy field is set
    pub fn from_props(props: GateProps) -> AuthzResult<Self> {
        Ok(Self::new(AccessPolicy::try_from(props)?))
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// `None` while the session is loading, otherwise the predicate value
    pub fn allows(&self, session: &SessionState) -> Option<bool> {
        if session.is_loading() {
            return None;
        }
        Some(PermissionEvaluator::from_option(session.authority()).evaluate(&self.policy))
    }

    /// Render `content` if allowed, nothing otherwise
    pub fn render<T>(&self, session: &SessionState, content: impl FnOnce() -> T) -> GateOutcome<T> {
        match self.allows(session) {
            None => GateOutcome::Pending,
            Some(true) => GateOutcome::Granted(content()),
            Some(false) => GateOutcome::Denied(None),
        }
    }

    /// Render `content` if allowed, `fallback` otherwise
    pub fn render_or<T>(
        &self,
        session: &SessionState,
        content: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> GateOutcome<T> {
        match self.allows(session) {
            None => GateOutcome::Pending,
            Some(true) => GateOutcome::Granted(content()),
            Some(false) => GateOutcome::Denied(Some(fallback())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::context::SessionAuthority;
    use std::cell::Cell;

    fn viewer_session() -> SessionState {
        SessionState::ready(SessionAuthority::new(["ver_informes"], ["Viewer"]))
    }

    #[test]
    fn test_any_of_list_renders_content() {
        let props = GateProps {
            permissions: Some(vec!["crear_usuario".into(), "ver_informes".into()]),
            require_all: false,
            ..Default::default()
        };
        let gate = AccessGate::from_props(props).unwrap();

        let outcome = gate.render_or(&viewer_session(), || "content", || "fallback");
        assert_eq!(outcome, GateOutcome::Granted("content"));
    }

    #[test]
    fn test_all_of_list_renders_fallback() {
        let gate = AccessGate::new(AccessPolicy::all_of(["crear_usuario", "ver_informes"]));
        let outcome = gate.render_or(&viewer_session(), || "content", || "fallback");
        assert_eq!(outcome.into_option(), Some("fallback"));
    }

    #[test]
    fn test_default_fallback_is_nothing() {
        let gate = AccessGate::new(AccessPolicy::role("Admin"));
        let outcome = gate.render(&viewer_session(), || "content");
        assert_eq!(outcome, GateOutcome::Denied(None));
        assert_eq!(outcome.into_option(), None);
    }

    #[test]
    fn test_loading_renders_neither() {
        let gate = AccessGate::new(AccessPolicy::permission("ver_informes"));
        let content_called = Cell::new(false);
        let fallback_called = Cell::new(false);

        let outcome = gate.render_or(
            &SessionState::Loading,
            || content_called.set(true),
            || fallback_called.set(true),
        );

        assert!(outcome.is_pending());
        assert!(!content_called.get());
        assert!(!fallback_called.get());
    }

    #[test]
    fn test_anonymous_session_is_denied() {
        let gate = AccessGate::new(AccessPolicy::all_of(Vec::<String>::new()));
        assert_eq!(gate.allows(&SessionState::Anonymous), Some(false));
        assert_eq!(gate.allows(&viewer_session()), Some(true));
    }

    #[test]
    fn test_nested_gate_only_runs_when_outer_grants() {
        let outer = AccessGate::new(AccessPolicy::role("Admin"));
        let inner = AccessGate::new(AccessPolicy::permission("ver_informes"));
        let inner_evaluated = Cell::new(false);
        let session = viewer_session();

        let outcome = outer.render(&session, || {
            inner_evaluated.set(true);
            inner.render(&session, || "report")
        });

        assert_eq!(outcome, GateOutcome::Denied(None));
        assert!(!inner_evaluated.get());

        let outer = AccessGate::new(AccessPolicy::role("Viewer"));
        let nested = outer.render(&session, || inner.render(&session, || "report"));
        assert_eq!(nested.into_option().and_then(GateOutcome::into_option), Some("report"));
    }

    #[test]
    fn test_props_precedence_and_validation() {
        let props = GateProps {
            permission: Some("ver_informes".into()),
            role: Some("Admin".into()),
            ..Default::default()
        };
        assert_eq!(AccessPolicy::try_from(props).unwrap(), AccessPolicy::permission("ver_informes"));

        let err = AccessGate::from_props(GateProps::default()).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPolicy(_)));
    }

    #[test]
    fn test_props_from_json() {
        let props: GateProps =
            serde_json::from_str(r#"{"permissions":["a","b"],"requireAll":true}"#).unwrap();
        assert_eq!(AccessPolicy::try_from(props).unwrap(), AccessPolicy::all_of(["a", "b"]));
    }
}
