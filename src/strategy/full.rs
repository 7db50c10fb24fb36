//! Three-level best-of strategy.
//!
//! ```text
//! for each try:
//!     best_short ← uniform model
//!     if nb_short_run == 0:
//!         best_short ← best of nb_init_run inits
//!     else repeat nb_short_run:
//!         current_best ← uniform model
//!         current_best ← best of nb_init_run inits
//!         short algo on current_best; best_short ← max(best_short, current_best)
//!     long algo on best_short; if it beats the stored model, store it and stop
//! ```
//!
//! Candidates at each level must beat the likelihood of the uniform model
//! (the state right after `initialize_step`) to be kept.

use std::sync::Arc;

use super::pool::{CandidatePool, Slot};
use super::{
    conclude, default_long_algo, default_short_algo, make_rng, recover, validate_nb_try, Strategy,
};
use crate::algo::{AlgoParams, Algorithm};
use crate::composer::{Composer, ModelState};
use crate::error::{Error, Result};
use crate::init::{InitParams, Initializer};
use crate::mixture::Mixture;
use crate::observe::{Observer, Phase, StrategyEvent, TracingObserver};
use rand::RngCore;
use serde::{Deserialize, Serialize};

const NAME: &str = "FullStrategy";

/// Configuration of a [`FullStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullStrategyParams {
    /// Number of tries.
    pub nb_try: usize,
    /// Number of short runs per try. Zero skips the short runs: the long run
    /// starts from the best initialization.
    pub nb_short_run: usize,
    /// Number of initializations per short run.
    pub nb_init_run: usize,
    /// Initializer.
    pub init: InitParams,
    /// Algorithm of the short runs.
    pub short_algo: AlgoParams,
    /// Algorithm of the long run.
    pub long_algo: AlgoParams,
    /// Random seed.
    pub seed: Option<u64>,
}

impl FullStrategyParams {
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

    /// Set number of initializations per short run.
    pub fn with_nb_init_run(mut self, nb_init_run: usize) -> Self {
        self.nb_init_run = nb_init_run;
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
        validate_nb_init_run(self.nb_init_run)?;
        self.init.validate()?;
        self.short_algo.validate()?;
        self.long_algo.validate()
    }
}

fn validate_nb_init_run(nb_init_run: usize) -> Result<()> {
    if nb_init_run == 0 {
        return Err(Error::InvalidParameter {
            name: "nb_init_run",
            message: "must be > 0",
        });
    }
    Ok(())
}

impl Default for FullStrategyParams {
    fn default() -> Self {
        Self {
            nb_try: 1,
            nb_short_run: 5,
            nb_init_run: 5,
            init: InitParams::default(),
            short_algo: default_short_algo(),
            long_algo: default_long_algo(),
            seed: None,
        }
    }
}

/// Best of `nb_init_run` initializations, per short run; best of
/// `nb_short_run` short runs, per try; one long run on the winner.
#[derive(Debug, Clone)]
pub struct FullStrategy<I = InitParams, A = AlgoParams> {
    nb_try: usize,
    nb_short_run: usize,
    nb_init_run: usize,
    init: I,
    short_algo: A,
    long_algo: A,
    seed: Option<u64>,
    observer: Arc<dyn Observer>,
}

impl<I: Initializer, A: Algorithm> FullStrategy<I, A> {
    /// Create a strategy with one try, five short runs and five
    /// initializations per short run.
    pub fn new(init: I, short_algo: A, long_algo: A) -> Self {
        Self {
            nb_try: 1,
            nb_short_run: 5,
            nb_init_run: 5,
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

    /// Set number of initializations per short run. Zero is rejected by
    /// [`Strategy::run`].
    pub fn with_nb_init_run(mut self, nb_init_run: usize) -> Self {
        self.nb_init_run = nb_init_run;
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

    /// Run `nb_init_run` initializations on `current`, keeping the best in
    /// `best`.
    fn init_step<M: Mixture>(
        &self,
        pool: &mut CandidatePool<M>,
        current: &mut Slot,
        best: &mut Slot,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        let observer = self.observer.as_ref();
        for _ in 0..self.nb_init_run {
            let init = self.init.run(pool.get_mut(*current), rng);
            if recover(init, observer, NAME, None)? {
                pool.keep_better(current, best);
            }
        }
        Ok(())
    }
}

impl FullStrategy {
    /// Build from a configuration.
    pub fn from_params(params: &FullStrategyParams) -> Self {
        let mut strategy = Self::new(params.init, params.short_algo, params.long_algo)
            .with_nb_try(params.nb_try)
            .with_nb_short_run(params.nb_short_run)
            .with_nb_init_run(params.nb_init_run);
        strategy.seed = params.seed;
        strategy
    }
}

impl<M: Mixture, I: Initializer, A: Algorithm> Strategy<M> for FullStrategy<I, A> {
    fn run(&self, model: &mut Composer<M>) -> Result<()> {
        validate_nb_init_run(self.nb_init_run)?;
        let observer = self.observer.as_ref();
        let mut rng = make_rng(self.seed);
        let (mut pool, slots) = CandidatePool::new(model, 3);
        let (mut current, mut current_best, mut best_short) = (slots[0], slots[1], slots[2]);
        let mut stored = false;

        for try_index in 0..self.nb_try {
            observer.on_event(&StrategyEvent::TryStarted {
                strategy: NAME,
                try_index,
            });
            pool.get_mut(best_short).initialize_step();

            if self.nb_short_run == 0 {
                self.init_step(&mut pool, &mut current, &mut best_short, &mut *rng)?;
            } else {
                for run in 0..self.nb_short_run {
                    pool.get_mut(current_best).initialize_step();
                    self.init_step(&mut pool, &mut current, &mut current_best, &mut *rng)?;
                    // no initialization beat the uniform model
                    if pool.get(current_best).state() < ModelState::ParamInitialized {
                        continue;
                    }
                    let short = self.short_algo.run(pool.get_mut(current_best), &mut *rng);
                    if recover(short, observer, NAME, Some(Phase::Short))? {
                        observer.on_event(&StrategyEvent::ShortRunFinished {
                            strategy: NAME,
                            run,
                            ln_likelihood: pool.get(current_best).ln_likelihood(),
                        });
                        pool.keep_better(&mut current_best, &mut best_short);
                    }
                }
            }

            if pool.get(best_short).state() < ModelState::ParamInitialized {
                continue;
            }
            let long = self.long_algo.run(pool.get_mut(best_short), &mut *rng);
            if !recover(long, observer, NAME, Some(Phase::Long))? {
                continue;
            }
            let ln_likelihood = pool.get(best_short).ln_likelihood();
            observer.on_event(&StrategyEvent::LongRunFinished {
                strategy: NAME,
                ln_likelihood,
            });
            if pool.store_into(model, best_short) {
                stored = true;
                observer.on_event(&StrategyEvent::ModelStored {
                    strategy: NAME,
                    ln_likelihood,
                });
                break;
            }
        }

        conclude(stored, observer, NAME, self.nb_try)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
