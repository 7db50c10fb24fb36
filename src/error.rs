use thiserror::Error;

/// Result alias for `mixt`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the composer, initializers, algorithms and strategies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Matrix dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// A random initialization left some cluster with fewer than two members.
    #[error("{method} initialization failed: smallest cluster has {min_count:.3} members")]
    InitFailed {
        /// Initialization method that failed.
        method: &'static str,
        /// Smallest cluster count after the draw.
        min_count: f64,
    },

    /// The mixture family could not re-estimate its parameters.
    #[error("parameter update failed")]
    ParameterUpdateFailed,

    /// A classification or stochastic step emptied a cluster.
    #[error("degenerate cluster: smallest cluster has {min_count:.3} members")]
    DegenerateCluster {
        /// Smallest cluster count.
        min_count: f64,
    },

    /// The likelihood became non-finite while iterating.
    #[error("did not converge after {iterations} iterations")]
    ConvergenceFailure {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// A strategy went through all its tries without storing a model.
    #[error("In {strategy}::run, all trials failed")]
    AllTrialsFailed {
        /// Name of the strategy.
        strategy: &'static str,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a strategy may recover from this error by moving to its next try.
    ///
    /// Initialization failures, refused parameter updates, collapsed clusters and
    /// failed convergence are local; anything else aborts the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InitFailed { .. }
                | Error::ParameterUpdateFailed
                | Error::DegenerateCluster { .. }
                | Error::ConvergenceFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::InitFailed {
            method: "random class",
            min_count: 1.0
        }
        .is_recoverable());
        assert!(Error::ParameterUpdateFailed.is_recoverable());
        assert!(Error::ConvergenceFailure { iterations: 3 }.is_recoverable());
        assert!(!Error::EmptyInput.is_recoverable());
        assert!(!Error::AllTrialsFailed { strategy: "SimpleStrategy" }.is_recoverable());
    }

    #[test]
    fn test_exhaustion_message() {
        let msg = Error::AllTrialsFailed {
            strategy: "FullStrategy",
        }
        .to_string();
        assert_eq!(msg, "In FullStrategy::run, all trials failed");
    }
}
