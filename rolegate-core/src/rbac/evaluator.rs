//! Permission evaluator: pure predicates over a session authority

use super::context::SessionAuthority;
use super::gate::{AccessPolicy, RequireMode};

/// Stateless predicates over a borrowed [`SessionAuthority`]
///
/// An absent authority evaluates every predicate to false.
///
/// Empty lists follow an asymmetric convention: `has_all_permissions(&[])`
/// is true (no restriction) while `has_any_permission(&[])` is false (the
/// caller must name at least one capability).
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator<'a> {
    authority: Option<&'a SessionAuthority>,
}

impl<'a> PermissionEvaluator<'a> {
    pub fn new(authority: &'a SessionAuthority) -> Self {
        Self { authority: Some(authority) }
    }

    /// Evaluator for a possibly missing authority
    pub fn from_option(authority: Option<&'a SessionAuthority>) -> Self {
        Self { authority }
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.authority.is_some_and(|a| a.contains_permission(name))
    }

    /// At least one of `names` is granted; false for an empty list
    pub fn has_any_permission<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.has_permission(name.as_ref()))
    }

    /// Every one of `names` is granted; true for an empty list
    pub fn has_all_permissions<S: AsRef<str>>(&self, names: &[S]) -> bool {
        match self.authority {
            Some(_) => names.iter().all(|name| self.has_permission(name.as_ref())),
            None => false,
        }
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.authority.is_some_and(|a| a.contains_role(name))
    }

    /// Evaluate exactly the predicate the policy selects
    pub fn evaluate(&self, policy: &AccessPolicy) -> bool {
        match policy {
            AccessPolicy::Permission(name) => self.has_permission(name),
            AccessPolicy::Role(name) => self.has_role(name),
            AccessPolicy::Permissions { names, mode: RequireMode::All } => {
                self.has_all_permissions(names.as_slice())
            }
            AccessPolicy::Permissions { names, mode: RequireMode::Any } => {
                self.has_any_permission(names.as_slice())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> SessionAuthority {
        SessionAuthority::new(["ver_informes"], ["Viewer"])
    }

    #[test]
    fn test_has_permission_is_membership() {
        let authority = viewer();
        let evaluator = PermissionEvaluator::new(&authority);

        assert!(evaluator.has_permission("ver_informes"));
        assert!(!evaluator.has_permission("crear_usuario"));
        assert!(!evaluator.has_permission(""));
        assert!(!evaluator.has_permission("VER_INFORMES"));
    }

    #[test]
    fn test_has_role() {
        let authority = viewer();
        let evaluator = PermissionEvaluator::new(&authority);

        assert!(evaluator.has_role("Viewer"));
        assert!(!evaluator.has_role("Admin"));
    }

    #[test]
    fn test_any_and_all_on_non_empty_lists() {
        let authority = SessionAuthority::new(["a", "b"], Vec::<String>::new());
        let evaluator = PermissionEvaluator::new(&authority);

        assert!(evaluator.has_any_permission(&["a", "z"]));
        assert!(!evaluator.has_any_permission(&["y", "z"]));
        assert!(evaluator.has_all_permissions(&["a", "b"]));
        assert!(!evaluator.has_all_permissions(&["a", "z"]));
    }

    #[test]
    fn test_empty_list_convention() {
        let authority = viewer();
        let evaluator = PermissionEvaluator::new(&authority);
        let none: [&str; 0] = [];

        assert!(evaluator.has_all_permissions(&none));
        assert!(!evaluator.has_any_permission(&none));
    }

    #[test]
    fn test_missing_authority_denies_everything() {
        let evaluator = PermissionEvaluator::from_option(None);
        let none: [&str; 0] = [];

        assert!(!evaluator.has_permission("ver_informes"));
        assert!(!evaluator.has_role("Viewer"));
        assert!(!evaluator.has_any_permission(&["ver_informes"]));
        assert!(!evaluator.has_all_permissions(&none));
    }

    #[test]
    fn test_evaluate_dispatches_on_policy() {
        let authority = viewer();
        let evaluator = PermissionEvaluator::new(&authority);

        assert!(evaluator.evaluate(&AccessPolicy::permission("ver_informes")));
        assert!(!evaluator.evaluate(&AccessPolicy::role("Admin")));
        assert!(evaluator.evaluate(&AccessPolicy::any_of(["crear_usuario", "ver_informes"])));
        assert!(!evaluator.evaluate(&AccessPolicy::all_of(["crear_usuario", "ver_informes"])));
    }
}
