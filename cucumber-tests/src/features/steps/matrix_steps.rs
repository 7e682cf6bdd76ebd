use crate::features::world::RolegateWorld;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use rolegate_core::error::AuthzError;
use rolegate_core::model::{Permission, Role};

/// Data rows of a step table, header skipped
fn table_rows(step: &Step) -> Vec<Vec<String>> {
    step.table.as_ref().map(|t| t.rows.iter().skip(1).cloned().collect()).unwrap_or_default()
}

// ==================== BACKGROUND ====================

#[given(expr = "the permissions:")]
async fn given_permissions(world: &mut RolegateWorld, step: &Step) {
    for row in table_rows(step) {
        let id = row[0].parse().expect("permission id");
        world.backend = world.backend.clone().with_permission(Permission::new(id, &row[1], &row[2]));
    }
}

#[given(expr = "the roles:")]
async fn given_roles(world: &mut RolegateWorld, step: &Step) {
    for row in table_rows(step) {
        let id = row[0].parse().expect("role id");
        world.backend = world.backend.clone().with_role(Role::new(id, &row[1]));
    }
}

#[given(expr = "role {int} is granted permission {int}")]
async fn given_assignment(world: &mut RolegateWorld, role: i64, permission: i64) {
    world.backend = world.backend.clone().with_assignment(role, permission);
}

#[given(expr = "the matrix is loaded")]
async fn given_matrix_loaded(world: &mut RolegateWorld) {
    let matrix = world.store().load_matrix().await.expect("initial load");
    world.last_matrix = Some(matrix);
}

#[given(expr = "the catalog goes offline")]
async fn given_offline(world: &mut RolegateWorld) {
    world.backend.set_offline(true);
}

#[given(expr = "the catalog holds mutations")]
async fn given_mutations_held(world: &mut RolegateWorld) {
    world.hold = Some(world.backend.hold_mutations().await);
}

// ==================== ACTIONS ====================

#[when(expr = "I load the matrix")]
async fn when_load(world: &mut RolegateWorld) {
    match world.store().load_matrix().await {
        Ok(matrix) => world.last_matrix = Some(matrix),
        Err(err) => {
            world.last_fallback = err.fallback().cloned();
            world.last_error = Some(err.to_string());
        }
    }
}

#[when(expr = "I toggle role {int} and permission {int}")]
async fn when_toggle(world: &mut RolegateWorld, role: i64, permission: i64) {
    let matrix = world.store().toggle_assignment(role, permission).await.expect("toggle");
    world.last_matrix = Some(matrix);
}

#[when(expr = "I start a toggle of role {int} and permission {int}")]
async fn when_start_toggle(world: &mut RolegateWorld, role: i64, permission: i64) {
    let store = world.store();
    world.toggles.push(tokio::spawn(async move { store.toggle_assignment(role, permission).await }));
    world.wait_until_busy(role, permission).await;
}

#[when(expr = "I try to toggle role {int} and permission {int} without waiting")]
async fn when_try_toggle(world: &mut RolegateWorld, role: i64, permission: i64) {
    match world.store().try_toggle_assignment(role, permission).await {
        Err(AuthzError::CellBusy(_)) => world.rejected_busy = true,
        other => world.last_error = Some(format!("expected CellBusy, got {:?}", other)),
    }
}

#[when(expr = "the catalog releases mutations")]
async fn when_release(world: &mut RolegateWorld) {
    world.hold = None;
}

// ==================== OUTCOMES ====================

#[then(expr = "role {int} has permission {int}")]
async fn then_has(world: &mut RolegateWorld, role: i64, permission: i64) {
    assert!(world.current_matrix().has_assignment(role, permission));
}

#[then(expr = "role {int} does not have permission {int}")]
async fn then_has_not(world: &mut RolegateWorld, role: i64, permission: i64) {
    assert!(!world.current_matrix().has_assignment(role, permission));
}

#[then(expr = "the load fails with the previous matrix as fallback")]
async fn then_load_failed(world: &mut RolegateWorld) {
    assert!(world.last_error.is_some(), "load did not fail");
    let fallback = world.last_fallback.clone().expect("fallback matrix");
    assert_eq!(Some(fallback), world.last_matrix);
}

#[then(expr = "all toggles complete")]
async fn then_toggles_complete(world: &mut RolegateWorld) {
    for handle in world.toggles.drain(..) {
        handle.await.expect("toggle task panicked").expect("toggle failed");
    }
}

#[then(expr = "the toggle is rejected because the cell is busy")]
async fn then_rejected(world: &mut RolegateWorld) {
    assert!(world.rejected_busy, "{:?}", world.last_error);
}

#[then(expr = "the catalog received {int} mutation(s)")]
async fn then_mutations(world: &mut RolegateWorld, count: usize) {
    assert_eq!(world.backend.mutations(), count);
}
