//! Error taxonomy of the authorization core

use crate::backend::BackendError;
use crate::matrix::Matrix;
use crate::model::Cell;
use std::sync::Arc;

/// Result alias used by the catalog client, the matrix store and the resolver
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors surfaced to the calling UI layer
///
/// The evaluator and the gate never produce these: a missing authority
/// simply evaluates every predicate to false.
#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    /// Catalog fetch failed; blocking, retry is user-initiated
    #[error("Permission catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Matrix snapshot fetch failed. The last good snapshot, if any, is kept
    /// by the store and handed back as `fallback`.
    #[error("Matrix load failed: {reason}")]
    MatrixLoadError { reason: String, fallback: Option<Arc<Matrix>> },

    /// Assign of an assigned pair or remove of an absent pair
    #[error("Assignment conflict on {0}")]
    AssignmentConflict(Cell),

    /// Transport failure on a mutation; the cell is released for retry
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A toggle for this cell is already in flight
    #[error("Cell busy: {0}")]
    CellBusy(Cell),

    /// The administration surface was closed
    #[error("Operation cancelled")]
    Cancelled,

    /// Gate configured without any policy field
    #[error("Invalid access policy: {0}")]
    InvalidPolicy(String),
}

impl AuthzError {
    /// Map a backend failure on the catalog read path
    pub(crate) fn catalog(err: BackendError) -> Self {
        AuthzError::CatalogUnavailable(err.to_string())
    }

    /// Map a backend failure on a mutation
    pub(crate) fn mutation(cell: Cell, err: BackendError) -> Self {
        match err {
            BackendError::Conflict(_) => AuthzError::AssignmentConflict(cell),
            other => AuthzError::NetworkError(other.to_string()),
        }
    }

    /// Whether the error is a benign race with another administrator
    pub fn is_benign(&self) -> bool {
        matches!(self, AuthzError::AssignmentConflict(_))
    }

    /// Snapshot kept after a failed load, if any
    pub fn fallback(&self) -> Option<&Arc<Matrix>> {
        match self {
            AuthzError::MatrixLoadError { fallback, .. } => fallback.as_ref(),
            _ => None,
        }
    }
}
