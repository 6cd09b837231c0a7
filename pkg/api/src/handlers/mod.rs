pub mod apps;
pub mod environments;
pub mod leases;
pub mod probe;
pub mod rebuild;

use axum::http::StatusCode;
use pkg_types::error::LeaseError;

/// Map the lease taxonomy onto HTTP statuses.
pub fn error_status(err: &LeaseError) -> StatusCode {
    match err {
        LeaseError::NotFound => StatusCode::NOT_FOUND,
        LeaseError::RecordInconsistency(_) => StatusCode::CONFLICT,
        LeaseError::TransientNetwork(_) => StatusCode::GATEWAY_TIMEOUT,
        LeaseError::Provider(_) | LeaseError::FileWrite { .. } => StatusCode::BAD_GATEWAY,
        LeaseError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
