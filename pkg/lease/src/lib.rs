pub mod publisher;
pub mod rebuild;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

use pkg_types::error::LeaseError;

/// Fold a store-layer failure into the lease taxonomy.
pub(crate) fn store_err(e: anyhow::Error) -> LeaseError {
    LeaseError::Store(e.to_string())
}
