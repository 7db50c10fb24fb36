//! Short-run / long-run strategy.
//!
//! Many cheap runs explore the likelihood surface; only the best of them gets
//! the expensive run to convergence:
//!
//! ```text
//! for each try:
//!     best ← unestimated
//!     repeat nb_short_run:  current ← init; short algo; best ← max(best, current)
//!     if nb_short_run == 0: best ← init
//!     long algo on best; on success store best and stop
//! ```

use std::sync::Arc;

use super::pool::CandidatePool;
use super::{
    conclude, default_long_algo, default_short_algo, make_rng, recover, validate_nb_try, Strategy,
};
use crate::algo::{AlgoParams, Algorithm};
use crate::composer::{Composer, ModelState};
use crate::error::Result;
use crate::init::{InitParams, Initializer};
use crate::mixture::Mixture;
use crate::observe::{Observer, Phase, StrategyEvent, TracingObserver};
use serde::{Deserialize, Serialize};

const NAME: &str = "XemStrategy";

/// Configuration of an [`XemStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XemStrategyParams {
    /// Number of tries.
    pub nb_try: usize,
    /// Number of short runs per try. Zero initializes the long run directly.
    pub nb_short_run: usize,
    /// Initializer.
    pub init: InitParams,
    /// Algorithm of the short runs.
    pub short_algo: AlgoParams,
    /// Algorithm of the long run.
    pub long_algo: AlgoParams,
    /// Random seed.
    pub seed: Option<u64>,
}

impl XemStrategyParams {
    /// Set number of tries.
    pub fn with_nb_try(mut self, nb_try: usize) -> Self {
        self.nb_try = nb_try;
        self
    }

    /// Set number of short runs.
    pub fn with_nb_short_run(mut self, nb_short_run: usize) -> Self {
        self.nb_short_run = nb_short_run;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_nb_try(self.nb_try)?;
        self.init.validate()?;
        self.short_algo.validate()?;
        self.long_algo.validate()
    }
}

impl Default for XemStrategyParams {
    fn default() -> Self {
        Self {
            nb_try: 1,
            nb_short_run: 5,
            init: InitParams::default(),
            short_algo: default_short_algo(),
            long_algo: default_long_algo(),
            seed: None,
        }
    }
}

/// Best of several short runs, then one long run.
#[derive(Debug, Clone)]
pub struct XemStrategy<I = InitParams, A = AlgoParams> {
    nb_try: usize,
    nb_short_run: usize,
    init: I,
    short_algo: A,
    long_algo: A,
    seed: Option<u64>,
    observer: Arc<dyn Observer>,
}

impl<I: Initializer, A: Algorithm> XemStrategy<I, A> {
    /// Create a strategy with one try and five short runs.
    pub fn new(init: I, short_algo: A, long_algo: A) -> Self {
        Self {
            nb_try: 1,
            nb_short_run: 5,
            init,
            short_algo,
            long_algo,
            seed: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set number of tries.
    pub fn with_nb_try(mut self, nb_try: usize) -> Self {
        self.nb_try = nb_try;
        self
    }

    /// Set number of short runs per try.
    pub fn with_nb_short_run(mut self, nb_short_run: usize) -> Self {
        self.nb_short_run = nb_short_run;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Send events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }
}

impl XemStrategy {
    /// Build from a configuration.
    pub fn from_params(params: &XemStrategyParams) -> Self {
        let mut strategy = Self::new(params.init, params.short_algo, params.long_algo)
            .with_nb_try(params.nb_try)
            .with_nb_short_run(params.nb_short_run);
        strategy.seed = params.seed;
        strategy
    }
}

impl<M: Mixture, I: Initializer, A: Algorithm> Strategy<M> for XemStrategy<I, A> {
    fn run(&self, model: &mut Composer<M>) -> Result<()> {
        let observer = self.observer.as_ref();
        let mut rng = make_rng(self.seed);
        let (mut pool, slots) = CandidatePool::new(model, 2);
        let (mut current, mut best) = (slots[0], slots[1]);
        let mut stored = false;

        for try_index in 0..self.nb_try {
            observer.on_event(&StrategyEvent::TryStarted {
                strategy: NAME,
                try_index,
            });
            pool.get_mut(best).reset();

            for run in 0..self.nb_short_run {
                let init = self.init.run(pool.get_mut(current), &mut *rng);
                if !recover(init, observer, NAME, None)? {
                    continue;
                }
                let short = self.short_algo.run(pool.get_mut(current), &mut *rng);
                if !recover(short, observer, NAME, Some(Phase::Short))? {
                    continue;
                }
                observer.on_event(&StrategyEvent::ShortRunFinished {
                    strategy: NAME,
                    run,
                    ln_likelihood: pool.get(current).ln_likelihood(),
                });
                pool.keep_better(&mut current, &mut best);
            }

            if self.nb_short_run == 0 {
                let init = self.init.run(pool.get_mut(best), &mut *rng);
                if !recover(init, observer, NAME, None)? {
                    continue;
                }
            }
            // every short run failed
            if pool.get(best).state() < ModelState::ParamInitialized {
                continue;
            }

            let long = self.long_algo.run(pool.get_mut(best), &mut *rng);
            if !recover(long, observer, NAME, Some(Phase::Long))? {
                continue;
            }
            let ln_likelihood = pool.get(best).ln_likelihood();
            observer.on_event(&StrategyEvent::LongRunFinished {
                strategy: NAME,
                ln_likelihood,
            });
            if pool.store_into(model, best) {
                stored = true;
                observer.on_event(&StrategyEvent::ModelStored {
                    strategy: NAME,
                    ln_likelihood,
                });
            }
            break;
        }

        conclude(stored, observer, NAME, self.nb_try)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
