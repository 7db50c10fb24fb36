//! Multi-start estimation strategies.
//!
//! EM converges to a local maximum, and which one depends on where it starts.
//! A strategy runs initializer + algorithm pairs on independent candidate
//! composers and keeps the one with the highest likelihood.
//!
//! ## Variants
//!
//! | Strategy | Per try |
//! |----------|---------|
//! | [`SimpleStrategy`] | init → algo |
//! | [`XemStrategy`] | `nb_short_run` × (init → short algo), best → long algo |
//! | [`FullStrategy`] | `nb_short_run` × (best of `nb_init_run` inits → short), best → long |
//!
//! All three share the outer loop of `nb_try` tries. Simple and Xem stop at
//! the first try whose final run succeeds, Full at the first one that improves
//! the stored model. A candidate replaces the stored model only with a
//! strictly greater likelihood; on ties the incumbent stays.
//!
//! ## Failures
//!
//! Recoverable errors ([`Error::is_recoverable`]) from an initializer or an
//! algorithm send the loop to its next iteration. Any other error aborts the
//! run; candidates are dropped on the way out. A run that never stores a model
//! returns [`Error::AllTrialsFailed`], whose message reads
//! `"In <Strategy>::run, all trials failed"`.
//!
//! ## Usage
//!
//! ```rust
//! use mixt::{Composer, DiagGaussian, InitParams, AlgoParams, SimpleStrategy, Strategy};
//!
//! let rows: Vec<Vec<f64>> = (0..40)
//!     .map(|i| vec![if i % 2 == 0 { 0.0 } else { 10.0 } + 0.01 * i as f64])
//!     .collect();
//! let mut model = Composer::new(DiagGaussian::from_rows(&rows, 2).unwrap()).unwrap();
//!
//! let strategy = SimpleStrategy::new(InitParams::default(), AlgoParams::em(500, 1e-8))
//!     .with_nb_try(3)
//!     .with_seed(42);
//! strategy.run(&mut model).unwrap();
//! model.finalize_step();
//! assert!(model.ln_likelihood().is_finite());
//! ```

mod full;
mod pool;
mod simple;
mod xem;

pub use full::{FullStrategy, FullStrategyParams};
pub use simple::{SimpleStrategy, SimpleStrategyParams};
pub use xem::{XemStrategy, XemStrategyParams};

use crate::composer::Composer;
use crate::error::{Error, Result};
use crate::mixture::Mixture;
use crate::observe::{Observer, Phase, StrategyEvent};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A restart policy estimating a mixture model.
pub trait Strategy<M: Mixture> {
    /// Estimate `model` in place.
    ///
    /// `model` is only replaced by a candidate with a strictly greater
    /// likelihood, so a fresh (unestimated) composer is the usual argument.
    fn run(&self, model: &mut Composer<M>) -> Result<()>;

    /// Name used in messages and events.
    fn name(&self) -> &'static str;
}

/// Any strategy, as a tagged configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    /// See [`SimpleStrategy`].
    Simple(SimpleStrategyParams),
    /// See [`XemStrategy`].
    Xem(XemStrategyParams),
    /// See [`FullStrategy`].
    Full(FullStrategyParams),
}

impl StrategyParams {
    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        match self {
            StrategyParams::Simple(p) => p.validate(),
            StrategyParams::Xem(p) => p.validate(),
            StrategyParams::Full(p) => p.validate(),
        }
    }

    /// Validate and build the configured strategy.
    pub fn build<M: Mixture>(&self) -> Result<Box<dyn Strategy<M>>> {
        self.validate()?;
        Ok(match self {
            StrategyParams::Simple(p) => Box::new(SimpleStrategy::from_params(p)),
            StrategyParams::Xem(p) => Box::new(XemStrategy::from_params(p)),
            StrategyParams::Full(p) => Box::new(FullStrategy::from_params(p)),
        })
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams::Xem(XemStrategyParams::default())
    }
}

/// Default long run: EM with a tight tolerance.
pub(crate) fn default_long_algo() -> crate::algo::AlgoParams {
    crate::algo::AlgoParams::em(1000, 1e-8)
}

/// Default short run: EM with a loose tolerance.
pub(crate) fn default_short_algo() -> crate::algo::AlgoParams {
    crate::algo::AlgoParams::em(200, 1e-4)
}

pub(crate) fn validate_nb_try(nb_try: usize) -> Result<()> {
    if nb_try == 0 {
        return Err(Error::InvalidParameter {
            name: "nb_try",
            message: "must be > 0",
        });
    }
    Ok(())
}

pub(crate) fn make_rng(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    }
}

/// Turn a step result into "go on" (`true`) / "skip" (`false`), reporting
/// recoverable failures and propagating the rest.
pub(crate) fn recover(
    result: Result<()>,
    observer: &dyn Observer,
    strategy: &'static str,
    phase: Option<Phase>,
) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(error) if error.is_recoverable() => {
            let event = match phase {
                None => StrategyEvent::InitFailed { strategy, error },
                Some(phase) => StrategyEvent::AlgoFailed {
                    strategy,
                    phase,
                    error,
                },
            };
            observer.on_event(&event);
            Ok(false)
        }
        Err(error) => Err(error),
    }
}

/// Final verdict of a run.
pub(crate) fn conclude(
    stored: bool,
    observer: &dyn Observer,
    strategy: &'static str,
    nb_try: usize,
) -> Result<()> {
    if stored {
        Ok(())
    } else {
        observer.on_event(&StrategyEvent::Exhausted { strategy, nb_try });
        Err(Error::AllTrialsFailed { strategy })
    }
}
