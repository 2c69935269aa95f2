//! Error taxonomy for the similarity and community core

use thiserror::Error;

/// Result alias for core graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised by similarity scoring and community partitioning.
///
/// Every variant is a caller bug detected synchronously; none are retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// Similarity threshold outside `[0.0, 1.0]` (or NaN).
    #[error("similarity threshold {threshold} is outside [0.0, 1.0]")]
    InvalidConfiguration {
        /// Rejected threshold.
        threshold: f64,
    },

    /// An operation referenced an entity that was never registered.
    #[error("entity {entity} was never registered")]
    UnregisteredEntity {
        /// Debug rendering of the entity.
        entity: String,
    },

    /// Mutation attempted after the partition was finalized.
    #[error("cannot {operation} after the partition has been finalized")]
    StateError {
        /// Rejected operation.
        operation: &'static str,
    },
}
