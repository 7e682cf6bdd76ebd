//! Session authority: the resolved permissions and roles of the current user

use crate::backend::SessionPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Resolved permission and role names for one authenticated user
///
/// Immutable once built. A refresh produces a new value that replaces the
/// old one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAuthority {
    #[serde(default)]
    permissions: HashSet<String>,
    #[serde(default)]
    roles: HashSet<String>,
}

impl SessionAuthority {
    pub fn new<P, R>(permissions: P, roles: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the `{permissions: [...], roles: [...]}` session payload
    pub fn from_payload(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    pub fn contains_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    pub fn contains_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }
}

impl From<SessionPayload> for SessionAuthority {
    fn from(payload: SessionPayload) -> Self {
        Self::new(payload.permissions, payload.roles)
    }
}

/// Authority as seen by gates
///
/// While `Loading`, gates render neither content nor fallback.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Loading,
    /// No authenticated user; every predicate is false
    Anonymous,
    Ready(Arc<SessionAuthority>),
}

impl SessionState {
    pub fn ready(authority: SessionAuthority) -> Self {
        SessionState::Ready(Arc::new(authority))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn authority(&self) -> Option<&SessionAuthority> {
        match self {
            SessionState::Ready(authority) => Some(authority),
            _ => None,
        }
    }
}
