//! Strategy events and the sinks that receive them.
//!
//! Strategies report progress through an injected [`Observer`] instead of
//! printing. The default [`TracingObserver`] forwards every event to
//! `tracing`; tests use their own observers to assert on the sequence.

use std::fmt;

use crate::error::Error;
use tracing::{debug, warn, Level};

/// Phase of a strategy try in which an algorithm ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Refinement run inside an initializer.
    Init,
    /// Short run of a multi-start strategy.
    Short,
    /// Final (long) run.
    Long,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Short => write!(f, "short"),
            Phase::Long => write!(f, "long"),
        }
    }
}

/// Something that happened during a strategy run.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyEvent {
    /// An outer try begins.
    TryStarted {
        /// Strategy name.
        strategy: &'static str,
        /// Zero-based try index.
        try_index: usize,
    },
    /// An initializer failed and the strategy moves on.
    InitFailed {
        /// Strategy name.
        strategy: &'static str,
        /// Why.
        error: Error,
    },
    /// An algorithm failed and the strategy moves on.
    AlgoFailed {
        /// Strategy name.
        strategy: &'static str,
        /// Which run failed.
        phase: Phase,
        /// Why.
        error: Error,
    },
    /// A short run completed.
    ShortRunFinished {
        /// Strategy name.
        strategy: &'static str,
        /// Zero-based short-run index.
        run: usize,
        /// Likelihood reached.
        ln_likelihood: f64,
    },
    /// The long run completed.
    LongRunFinished {
        /// Strategy name.
        strategy: &'static str,
        /// Likelihood reached.
        ln_likelihood: f64,
    },
    /// A candidate replaced the stored model.
    ModelStored {
        /// Strategy name.
        strategy: &'static str,
        /// Likelihood of the stored model.
        ln_likelihood: f64,
    },
    /// All tries ran without storing a model.
    Exhausted {
        /// Strategy name.
        strategy: &'static str,
        /// Number of tries performed.
        nb_try: usize,
    },
}

impl StrategyEvent {
    /// Level at which [`TracingObserver`] logs this event. Recovered failures
    /// and exhaustion are warnings, progress is debug.
    pub fn level(&self) -> Level {
        match self {
            StrategyEvent::InitFailed { .. }
            | StrategyEvent::AlgoFailed { .. }
            | StrategyEvent::Exhausted { .. } => Level::WARN,
            _ => Level::DEBUG,
        }
    }
}

/// Receiver of strategy events.
pub trait Observer: fmt::Debug + Send + Sync {
    /// Called synchronously for each event.
    fn on_event(&self, event: &StrategyEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &StrategyEvent) {
        match event {
            StrategyEvent::TryStarted { strategy, try_index } => {
                debug!(strategy, try_index, "try started")
            }
            StrategyEvent::InitFailed { strategy, error } => {
                warn!(strategy, %error, "initialization failed")
            }
            StrategyEvent::AlgoFailed {
                strategy,
                phase,
                error,
            } => warn!(strategy, %phase, %error, "algorithm failed"),
            StrategyEvent::ShortRunFinished {
                strategy,
                run,
                ln_likelihood,
            } => debug!(strategy, run, ln_likelihood, "short run finished"),
            StrategyEvent::LongRunFinished {
                strategy,
                ln_likelihood,
            } => debug!(strategy, ln_likelihood, "long run finished"),
            StrategyEvent::ModelStored {
                strategy,
                ln_likelihood,
            } => debug!(strategy, ln_likelihood, "model stored"),
            StrategyEvent::Exhausted { strategy, nb_try } => {
                warn!(strategy, nb_try, "all trials failed")
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _event: &StrategyEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovered_failures_log_as_warnings() {
        let init = StrategyEvent::InitFailed {
            strategy: "XemStrategy",
            error: Error::ParameterUpdateFailed,
        };
        let algo = StrategyEvent::AlgoFailed {
            strategy: "XemStrategy",
            phase: Phase::Short,
            error: Error::DegenerateCluster { min_count: 1.0 },
        };
        let exhausted = StrategyEvent::Exhausted {
            strategy: "XemStrategy",
            nb_try: 2,
        };
        for event in [&init, &algo, &exhausted] {
            assert_eq!(event.level(), Level::WARN);
        }
    }

    #[test]
    fn test_progress_logs_as_debug() {
        let events = [
            StrategyEvent::TryStarted {
                strategy: "FullStrategy",
                try_index: 0,
            },
            StrategyEvent::ShortRunFinished {
                strategy: "FullStrategy",
                run: 1,
                ln_likelihood: -12.5,
            },
            StrategyEvent::LongRunFinished {
                strategy: "FullStrategy",
                ln_likelihood: -10.0,
            },
            StrategyEvent::ModelStored {
                strategy: "FullStrategy",
                ln_likelihood: -10.0,
            },
        ];
        for event in &events {
            assert_eq!(event.level(), Level::DEBUG);
            TracingObserver.on_event(event);
        }
    }
}
