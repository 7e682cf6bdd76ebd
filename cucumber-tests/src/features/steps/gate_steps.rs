use crate::features::world::RolegateWorld;
use cucumber::{given, then, when};
use rolegate_core::rbac::{
    AccessGate, AccessPolicy, GateOutcome, PermissionEvaluator, SessionAuthority, SessionState,
};

fn names(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect()
}

fn render(world: &mut RolegateWorld, policy: AccessPolicy) {
    let gate = AccessGate::new(policy);
    let outcome =
        gate.render_or(&world.session, || "content".to_string(), || "fallback".to_string());
    world.outcome = Some(outcome);
}

// ==================== SESSIONS ====================

#[given(expr = "a session with permissions {string} and roles {string}")]
async fn given_session(world: &mut RolegateWorld, permissions: String, roles: String) {
    world.session = SessionState::ready(SessionAuthority::new(names(&permissions), names(&roles)));
}

#[given(expr = "the session is still loading")]
async fn given_loading(world: &mut RolegateWorld) {
    world.session = SessionState::Loading;
}

#[given(expr = "no user is signed in")]
async fn given_anonymous(world: &mut RolegateWorld) {
    world.session = SessionState::Anonymous;
}

// ==================== GATES ====================

#[when(expr = "a gate requiring any of {string} renders")]
async fn when_any_of(world: &mut RolegateWorld, list: String) {
    render(world, AccessPolicy::any_of(names(&list)));
}

#[when(expr = "a gate requiring all of {string} renders")]
async fn when_all_of(world: &mut RolegateWorld, list: String) {
    render(world, AccessPolicy::all_of(names(&list)));
}

#[when(expr = "a gate requiring permission {string} renders")]
async fn when_permission(world: &mut RolegateWorld, name: String) {
    render(world, AccessPolicy::permission(name));
}

#[when(expr = "a gate requiring role {string} renders")]
async fn when_role(world: &mut RolegateWorld, name: String) {
    render(world, AccessPolicy::role(name));
}

// ==================== OUTCOMES ====================

#[then(expr = "the session has permission {string}")]
async fn then_has_permission(world: &mut RolegateWorld, name: String) {
    assert!(PermissionEvaluator::from_option(world.session.authority()).has_permission(&name));
}

#[then(expr = "the session lacks permission {string}")]
async fn then_lacks_permission(world: &mut RolegateWorld, name: String) {
    assert!(!PermissionEvaluator::from_option(world.session.authority()).has_permission(&name));
}

#[then(expr = "the session lacks role {string}")]
async fn then_lacks_role(world: &mut RolegateWorld, name: String) {
    assert!(!PermissionEvaluator::from_option(world.session.authority()).has_role(&name));
}

#[then(expr = "the protected content is shown")]
async fn then_content(world: &mut RolegateWorld) {
    assert_eq!(world.outcome, Some(GateOutcome::Granted("content".to_string())));
}

#[then(expr = "the fallback is shown")]
async fn then_fallback(world: &mut RolegateWorld) {
    assert_eq!(world.outcome, Some(GateOutcome::Denied(Some("fallback".to_string()))));
}

#[then(expr = "nothing is shown")]
async fn then_nothing(world: &mut RolegateWorld) {
    assert_eq!(world.outcome, Some(GateOutcome::Pending));
}
