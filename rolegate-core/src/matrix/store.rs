//! Matrix store: owns the current snapshot and mediates mutation
//!
//! # Consistency
//!
//! - Every load takes a ticket from a monotonic counter before its request
//!   is issued. A response is applied only if its ticket is newer than the
//!   ticket of the applied snapshot; late responses of older loads are
//!   dropped.
//! - A toggle never patches the snapshot. It mutates the backend, then
//!   reloads the whole matrix.
//! - Toggles on one cell run one at a time (FIFO); toggles on different
//!   cells are independent.
//! - A failed load keeps the previous snapshot and hands it back as the
//!   error's fallback. Failures never advance the data watermark: an older
//!   load that succeeds after a newer one failed is still applied when its
//!   data is newer than the snapshot.
//! - A toggle reads the cell state from a snapshot taken after the newest
//!   failure, reloading first if needed.

use super::Matrix;
use crate::backend::PermissionBackend;
use crate::config::BusyPolicy;
use crate::error::{AuthzError, AuthzResult};
use crate::model::{Cell, PermissionId, RoleId};
use scc::HashMap as SccHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

#[derive(Default)]
struct StoreState {
    snapshot: Option<Arc<Matrix>>,
    /// Ticket of the newest load that failed
    failed: u64,
    last_error: Option<String>,
}

impl StoreState {
    fn snapshot_ticket(&self) -> u64 {
        self.snapshot.as_ref().map_or(0, |matrix| matrix.sequence())
    }
}

/// Owner of the role/permission matrix for one administration surface
pub struct MatrixStore {
    backend: Arc<dyn PermissionBackend>,
    state: RwLock<StoreState>,
    tickets: AtomicU64,
    cells: SccHashMap<Cell, Arc<Mutex<()>>>,
    busy_policy: BusyPolicy,
    closed: watch::Sender<bool>,
}

impl MatrixStore {
    /// Create an empty store; call [`MatrixStore::load_matrix`] to populate it
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            backend,
            state: RwLock::new(StoreState::default()),
            tickets: AtomicU64::new(0),
            cells: SccHashMap::new(),
            busy_policy: BusyPolicy::default(),
            closed,
        }
    }

    /// What `toggle_assignment` does when the cell is busy
    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current snapshot, if one was ever loaded
    pub fn snapshot(&self) -> Option<Arc<Matrix>> {
        self.read_state().snapshot.clone()
    }

    /// Reason of the newest failed load, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.clone()
    }

    /// Whether `role_id` grants `permission_id` in the current snapshot
    pub fn has_assignment(&self, role_id: RoleId, permission_id: PermissionId) -> bool {
        self.read_state()
            .snapshot
            .as_ref()
            .is_some_and(|matrix| matrix.has_assignment(role_id, permission_id))
    }

    /// Whether a toggle for this cell is in flight or queued
    ///
    /// Every such toggle holds a clone of the cell's lock; the table holds
    /// the last one.
    pub fn is_busy(&self, role_id: RoleId, permission_id: PermissionId) -> bool {
        self.cells
            .read_sync(&Cell::new(role_id, permission_id), |_, lock| Arc::strong_count(lock) > 1)
            .unwrap_or(false)
    }

    /// Cancel in-flight loads and refuse further work
    pub fn close(&self) {
        if !self.closed.send_replace(true) {
            log::debug!("Matrix store closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn ensure_open(&self) -> AuthzResult<()> {
        if self.is_closed() {
            return Err(AuthzError::Cancelled);
        }
        Ok(())
    }

    /// Fetch the whole matrix and swap it in
    ///
    /// Returns the snapshot that is current once this load settles. When a
    /// newer load already completed, that newer snapshot is returned and
    /// this response is discarded.
    pub async fn load_matrix(&self) -> AuthzResult<Arc<Matrix>> {
        self.ensure_open()?;
        let mut closed = self.closed.subscribe();

        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Matrix load #{} issued", ticket);

        let response = tokio::select! {
            response = self.backend.permission_matrix() => response,
            _ = closed.wait_for(|closed| *closed) => {
                log::debug!("Matrix load #{} cancelled", ticket);
                return Err(AuthzError::Cancelled);
            }
        };

        let matrix = match response {
            Ok(payload) => Matrix::from_payload(payload, ticket),
            Err(err) => Err(err.to_string()),
        };

        match matrix {
            Ok(matrix) => Ok(self.apply(matrix, ticket)),
            Err(reason) => Err(self.fail(reason, ticket)),
        }
    }

    fn apply(&self, matrix: Matrix, ticket: u64) -> Arc<Matrix> {
        let matrix = Arc::new(matrix);
        let mut state = self.write_state();

        if ticket > state.snapshot_ticket() {
            log::debug!(
                "Matrix load #{} applied: {} roles, {} permissions",
                ticket,
                matrix.roles().len(),
                matrix.permissions().len()
            );
            state.snapshot = Some(matrix.clone());
            if ticket > state.failed {
                state.last_error = None;
            }
            return matrix;
        }

        log::debug!("Matrix load #{} dropped, #{} is newer", ticket, state.snapshot_ticket());
        state.snapshot.clone().unwrap_or(matrix)
    }

    fn fail(&self, reason: String, ticket: u64) -> AuthzError {
        let mut state = self.write_state();
        if ticket > state.failed && ticket > state.snapshot_ticket() {
            log::warn!("Matrix load #{} failed: {}", ticket, reason);
            state.failed = ticket;
            state.last_error = Some(reason.clone());
        } else {
            log::debug!("Matrix load #{} failed after a newer load: {}", ticket, reason);
        }
        AuthzError::MatrixLoadError { reason, fallback: state.snapshot.clone() }
    }

    async fn cell_lock(&self, cell: Cell) -> Arc<Mutex<()>> {
        self.cells.entry_async(cell).await.or_insert_with(|| Arc::new(Mutex::new(()))).get().clone()
    }

    /// Flip one cell, then reload the whole matrix
    ///
    /// With [`BusyPolicy::Queue`] (default) a toggle on a busy cell waits for
    /// the running one to finish and then reads the fresh snapshot, so two
    /// queued toggles cancel out. With [`BusyPolicy::Reject`] it fails with
    /// [`AuthzError::CellBusy`].
    pub async fn toggle_assignment(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthzResult<Arc<Matrix>> {
        if self.busy_policy == BusyPolicy::Reject {
            return self.try_toggle_assignment(role_id, permission_id).await;
        }

        self.ensure_open()?;
        let cell = Cell::new(role_id, permission_id);
        let lock = self.cell_lock(cell).await;
        // table + ours; anything beyond is another toggle
        if Arc::strong_count(&lock) > 2 {
            log::debug!("Toggle on {} queued", cell);
        }
        let guard = lock.lock_owned().await;
        self.toggle_locked(cell, guard).await
    }

    /// Flip one cell, failing with [`AuthzError::CellBusy`] if it is busy
    pub async fn try_toggle_assignment(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthzResult<Arc<Matrix>> {
        self.ensure_open()?;
        let cell = Cell::new(role_id, permission_id);
        let guard = self
            .cell_lock(cell)
            .await
            .try_lock_owned()
            .map_err(|_| AuthzError::CellBusy(cell))?;
        self.toggle_locked(cell, guard).await
    }

    /// Mutate-then-reload; `_guard` keeps the cell busy until we return
    async fn toggle_locked(
        &self,
        cell: Cell,
        _guard: OwnedMutexGuard<()>,
    ) -> AuthzResult<Arc<Matrix>> {
        self.ensure_open()?;
        let stale = {
            let state = self.read_state();
            state.snapshot.is_none() || state.last_error.is_some()
        };
        if stale {
            log::debug!("Reloading before toggle on {}", cell);
            self.load_matrix().await?;
        }

        let assigned = self.has_assignment(cell.role, cell.permission);
        let outcome = if assigned {
            self.backend.revoke_permission(cell.role, cell.permission).await
        } else {
            self.backend.assign_permission(cell.role, cell.permission).await
        };

        match outcome.map_err(|e| AuthzError::mutation(cell, e)) {
            Ok(()) => {
                log::info!("{} {}", if assigned { "Revoked" } else { "Assigned" }, cell);
            }
            Err(err) if err.is_benign() => {
                log::debug!("{} already in requested state: {}", cell, err);
            }
            Err(err) => {
                log::warn!("Toggle on {} failed: {}", cell, err);
                return Err(err);
            }
        }

        self.load_matrix().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::{Permission, Role};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn scenario() -> MemoryBackend {
        MemoryBackend::new()
            .with_permission(Permission::new(1, "crear_usuario", "sistema"))
            .with_permission(Permission::new(2, "ver_informes", "informes"))
            .with_role(Role::new(10, "Admin"))
            .with_role(Role::new(11, "Viewer"))
            .with_assignment(10, 1)
            .with_assignment(10, 2)
            .with_assignment(11, 2)
    }

    fn store(backend: &MemoryBackend) -> Arc<MatrixStore> {
        Arc::new(MatrixStore::new(Arc::new(backend.clone())))
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_load_matrix_scenario() {
        let backend = scenario();
        let store = store(&backend);
        assert!(!store.has_assignment(10, 1));

        let matrix = store.load_matrix().await.unwrap();
        assert!(store.has_assignment(10, 1));
        assert!(!store.has_assignment(11, 1));
        for cell in matrix.cells() {
            assert!(store.has_assignment(cell.role, cell.permission));
        }
    }

    #[tokio::test]
    async fn test_toggle_assigns_then_revokes() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        let matrix = store.toggle_assignment(11, 1).await.unwrap();
        assert!(matrix.has_assignment(11, 1));
        assert_eq!(backend.assigned(11), BTreeSet::from([1, 2]));
        assert_eq!(backend.assigned(10), BTreeSet::from([1, 2]));

        let matrix = store.toggle_assignment(11, 1).await.unwrap();
        assert!(!matrix.has_assignment(11, 1));
        assert_eq!(backend.assigned(11), BTreeSet::from([2]));
    }

    #[tokio::test]
    async fn test_toggle_without_snapshot_loads_first() {
        let backend = scenario();
        let store = store(&backend);

        let matrix = store.toggle_assignment(10, 1).await.unwrap();
        assert!(!matrix.has_assignment(10, 1));
        assert_eq!(backend.matrix_fetches(), 2);
    }

    #[tokio::test]
    async fn test_toggle_reflects_server_side_cascade() {
        let backend = scenario()
            .with_permission(Permission::new(3, "editar_proyecto", "proyectos"))
            .with_permission(Permission::new(4, "ver_proyecto", "proyectos"))
            .with_implication(3, 4);
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        let matrix = store.toggle_assignment(11, 3).await.unwrap();
        assert!(matrix.has_assignment(11, 3));
        assert!(matrix.has_assignment(11, 4));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_snapshot() {
        let backend = scenario();
        let store = store(&backend);
        let good = store.load_matrix().await.unwrap();

        backend.set_offline(true);
        let err = store.load_matrix().await.unwrap_err();
        let fallback = err.fallback().cloned().unwrap();
        assert_eq!(fallback.sequence(), good.sequence());
        assert!(store.has_assignment(10, 1));
        assert!(store.last_error().is_some());

        backend.set_offline(false);
        store.load_matrix().await.unwrap();
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_first_load_failure_has_no_fallback() {
        let backend = scenario();
        backend.set_offline(true);
        let store = store(&backend);

        let err = store.load_matrix().await.unwrap_err();
        assert!(matches!(err, AuthzError::MatrixLoadError { fallback: None, .. }));
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_stale_reload_is_dropped() {
        let backend = scenario();
        let store = store(&backend);

        backend.delay_next_matrix_fetch(Duration::from_millis(200));
        let slow_store = store.clone();
        let slow = tokio::spawn(async move { slow_store.load_matrix().await });
        wait_until(|| backend.matrix_fetches() == 1).await;

        backend.assign_permission(11, 1).await.unwrap();
        let fresh = store.load_matrix().await.unwrap();
        assert!(fresh.has_assignment(11, 1));

        let late = slow.await.unwrap().unwrap();
        assert_eq!(late.sequence(), fresh.sequence());
        assert!(store.has_assignment(11, 1));
    }

    #[tokio::test]
    async fn test_older_load_applies_after_newer_failure() {
        let backend = scenario();
        let store = store(&backend);

        backend.delay_next_matrix_fetch(Duration::from_millis(200));
        let slow_store = store.clone();
        let slow = tokio::spawn(async move { slow_store.load_matrix().await });
        wait_until(|| backend.matrix_fetches() == 1).await;

        backend.set_offline(true);
        let err = store.load_matrix().await.unwrap_err();
        assert!(matches!(err, AuthzError::MatrixLoadError { fallback: None, .. }));
        backend.set_offline(false);

        let late = slow.await.unwrap().unwrap();
        assert_eq!(store.snapshot(), Some(late));
        assert!(store.has_assignment(10, 1));
        assert!(store.last_error().is_some());
    }

    #[tokio::test]
    async fn test_older_load_replaces_older_snapshot_after_newer_failure() {
        let backend = scenario();
        let store = store(&backend);
        let first = store.load_matrix().await.unwrap();

        backend.assign_permission(11, 1).await.unwrap();
        backend.delay_next_matrix_fetch(Duration::from_millis(200));
        let slow_store = store.clone();
        let slow = tokio::spawn(async move { slow_store.load_matrix().await });
        wait_until(|| backend.matrix_fetches() == 2).await;

        backend.set_offline(true);
        let err = store.load_matrix().await.unwrap_err();
        assert_eq!(err.fallback(), Some(&first));
        backend.set_offline(false);

        let late = slow.await.unwrap().unwrap();
        assert!(late.sequence() > first.sequence());
        assert!(store.has_assignment(11, 1));
    }

    #[tokio::test]
    async fn test_queued_toggle_reloads_after_failed_reload() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        let hold = backend.hold_mutations().await;
        let first_store = store.clone();
        let first = tokio::spawn(async move { first_store.toggle_assignment(11, 1).await });
        wait_until(|| store.is_busy(11, 1)).await;

        let second_store = store.clone();
        let second = tokio::spawn(async move { second_store.toggle_assignment(11, 1).await });

        // The first toggle's mutation lands but its reload fails
        backend.fail_next_matrix_fetches(1);
        drop(hold);

        let first = first.await.unwrap();
        assert!(matches!(first, Err(AuthzError::MatrixLoadError { .. })));
        let after_second = second.await.unwrap().unwrap();

        assert!(!after_second.has_assignment(11, 1));
        assert_eq!(backend.assigned(11), BTreeSet::from([2]));
        assert_eq!(backend.mutations(), 2);
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_toggle_fails_when_catch_up_reload_fails() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        backend.fail_next_matrix_fetches(2);
        store.load_matrix().await.unwrap_err();

        let err = store.toggle_assignment(11, 1).await.unwrap_err();
        assert!(matches!(err, AuthzError::MatrixLoadError { .. }));
        assert_eq!(backend.mutations(), 0);
        assert!(!store.is_busy(11, 1));
    }

    #[tokio::test]
    async fn test_is_busy_does_not_take_the_cell() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();
        store.toggle_assignment(11, 1).await.unwrap();

        // The cell entry exists now; polling it must not block a toggle
        assert!(!store.is_busy(11, 1));
        let lock = store.cell_lock(Cell::new(11, 1)).await;
        assert!(store.is_busy(11, 1));
        drop(lock);
        assert!(!store.is_busy(11, 1));
        assert!(store.try_toggle_assignment(11, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_mutation_failure_releases_cell_and_keeps_state() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        backend.set_offline(true);
        let err = store.toggle_assignment(11, 1).await.unwrap_err();
        assert!(matches!(err, AuthzError::NetworkError(_)));
        assert!(!store.is_busy(11, 1));
        assert!(!store.has_assignment(11, 1));

        backend.set_offline(false);
        let matrix = store.toggle_assignment(11, 1).await.unwrap();
        assert!(matrix.has_assignment(11, 1));
    }

    #[tokio::test]
    async fn test_conflict_is_benign() {
        let backend = scenario().with_strict_conflicts();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        // Another administrator grants the cell behind our back
        backend.assign_permission(11, 1).await.unwrap();

        // Our stale snapshot still says "absent", so we assign and get a 409
        let matrix = store.toggle_assignment(11, 1).await.unwrap();
        assert!(matrix.has_assignment(11, 1));
    }

    #[tokio::test]
    async fn test_same_cell_toggles_are_serialized() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        let hold = backend.hold_mutations().await;
        let first_store = store.clone();
        let first = tokio::spawn(async move { first_store.toggle_assignment(11, 1).await });
        wait_until(|| store.is_busy(11, 1)).await;

        let second_store = store.clone();
        let second = tokio::spawn(async move { second_store.toggle_assignment(11, 1).await });

        let rejected = store.try_toggle_assignment(11, 1).await.unwrap_err();
        assert!(matches!(rejected, AuthzError::CellBusy(cell) if cell == Cell::new(11, 1)));

        drop(hold);
        let after_first = first.await.unwrap().unwrap();
        let after_second = second.await.unwrap().unwrap();

        assert!(after_first.has_assignment(11, 1));
        assert!(!after_second.has_assignment(11, 1));
        assert_eq!(backend.assigned(11), BTreeSet::from([2]));
        assert_eq!(backend.mutations(), 2);
        assert!(!store.is_busy(11, 1));
    }

    #[tokio::test]
    async fn test_reject_policy() {
        let backend = scenario();
        let store = Arc::new(
            MatrixStore::new(Arc::new(backend.clone())).with_busy_policy(BusyPolicy::Reject),
        );
        store.load_matrix().await.unwrap();

        let hold = backend.hold_mutations().await;
        let first_store = store.clone();
        let first = tokio::spawn(async move { first_store.toggle_assignment(11, 1).await });
        wait_until(|| store.is_busy(11, 1)).await;

        let err = store.toggle_assignment(11, 1).await.unwrap_err();
        assert!(matches!(err, AuthzError::CellBusy(_)));

        drop(hold);
        assert!(first.await.unwrap().unwrap().has_assignment(11, 1));
        assert_eq!(backend.mutations(), 1);
    }

    #[tokio::test]
    async fn test_distinct_cells_proceed_independently() {
        let backend = scenario();
        let store = store(&backend);
        store.load_matrix().await.unwrap();

        let (a, b) = tokio::join!(store.toggle_assignment(11, 1), store.toggle_assignment(10, 2));
        a.unwrap();
        b.unwrap();

        let matrix = store.snapshot().unwrap();
        assert!(matrix.has_assignment(11, 1));
        assert!(!matrix.has_assignment(10, 2));
        assert_eq!(backend.matrix_fetches(), 3);
    }

    #[tokio::test]
    async fn test_close_cancels_in_flight_load() {
        let backend = scenario();
        let store = store(&backend);

        backend.delay_next_matrix_fetch(Duration::from_secs(5));
        let pending_store = store.clone();
        let pending = tokio::spawn(async move { pending_store.load_matrix().await });
        wait_until(|| backend.matrix_fetches() == 1).await;

        store.close();
        assert!(matches!(pending.await.unwrap(), Err(AuthzError::Cancelled)));
        assert!(matches!(store.toggle_assignment(11, 1).await, Err(AuthzError::Cancelled)));
        assert_eq!(backend.mutations(), 0);
    }
}
