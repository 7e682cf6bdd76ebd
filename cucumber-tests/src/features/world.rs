use cucumber::World as CucumberWorld;
use rolegate_core::backend::{MemoryBackend, MutationHold};
use rolegate_core::error::AuthzResult;
use rolegate_core::matrix::{Matrix, MatrixStore};
use rolegate_core::rbac::{GateOutcome, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub type ToggleHandle = JoinHandle<AuthzResult<Arc<Matrix>>>;

#[derive(CucumberWorld, Default)]
pub struct RolegateWorld {
    pub backend: MemoryBackend,
    pub store: Option<Arc<MatrixStore>>,
    pub last_matrix: Option<Arc<Matrix>>,
    pub last_error: Option<String>,
    pub last_fallback: Option<Arc<Matrix>>,
    pub rejected_busy: bool,
    pub hold: Option<MutationHold>,
    pub toggles: Vec<ToggleHandle>,
    pub session: SessionState,
    pub outcome: Option<GateOutcome<String>>,
}

impl std::fmt::Debug for RolegateWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolegateWorld")
            .field("store", &self.store.as_ref().map(|_| "<MatrixStore>"))
            .field("last_matrix", &self.last_matrix)
            .field("last_error", &self.last_error)
            .field("rejected_busy", &self.rejected_busy)
            .field("held", &self.hold.is_some())
            .field("pending_toggles", &self.toggles.len())
            .field("session", &self.session)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl RolegateWorld {
    /// Store over the scenario's backend, created on first use
    pub fn store(&mut self) -> Arc<MatrixStore> {
        let backend = self.backend.clone();
        self.store.get_or_insert_with(|| Arc::new(MatrixStore::new(Arc::new(backend)))).clone()
    }

    /// Wait until a spawned toggle holds the cell
    pub async fn wait_until_busy(&mut self, role: i64, permission: i64) {
        let store = self.store();
        let busy = async {
            while !store.is_busy(role, permission) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(Duration::from_secs(5), busy).await.is_err() {
            panic!("cell ({}, {}) never became busy", role, permission);
        }
    }

    pub fn current_matrix(&self) -> Arc<Matrix> {
        let store = self.store.as_ref().expect("matrix store not initialised");
        store.snapshot().expect("no matrix loaded")
    }
}
