//! Fixed pool of candidate composers addressed by slot.
//!
//! Strategies juggle "current", "best so far" and "best short run" models.
//! Rather than copying a responsibility matrix whenever a candidate wins,
//! the winner's [`Slot`] handle is swapped with the loser's. Promotion to the
//! caller's model is a move (`mem::swap`), never a clone.

use std::mem;

use crate::composer::Composer;
use crate::mixture::Mixture;

/// Handle to one composer in a [`CandidatePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(usize);

#[derive(Debug)]
pub(crate) struct CandidatePool<M> {
    slots: Vec<Composer<M>>,
}

impl<M: Mixture> CandidatePool<M> {
    /// `n` fresh composers created from `prototype`, and their handles.
    pub(crate) fn new(prototype: &Composer<M>, n: usize) -> (Self, Vec<Slot>) {
        let slots = (0..n).map(|_| prototype.create()).collect();
        (Self { slots }, (0..n).map(Slot).collect())
    }

    pub(crate) fn get(&self, slot: Slot) -> &Composer<M> {
        &self.slots[slot.0]
    }

    pub(crate) fn get_mut(&mut self, slot: Slot) -> &mut Composer<M> {
        &mut self.slots[slot.0]
    }

    /// If `challenger` has a strictly greater likelihood than `incumbent`,
    /// swap the two handles. Ties keep the incumbent.
    pub(crate) fn keep_better(&self, challenger: &mut Slot, incumbent: &mut Slot) -> bool {
        if self.get(*incumbent).ln_likelihood() < self.get(*challenger).ln_likelihood() {
            mem::swap(challenger, incumbent);
            true
        } else {
            false
        }
    }

    /// Move the composer in `slot` into `model` if it is strictly better.
    /// The previous content of `model` goes back into the pool.
    pub(crate) fn store_into(&mut self, model: &mut Composer<M>, slot: Slot) -> bool {
        if model.ln_likelihood() < self.get(slot).ln_likelihood() {
            mem::swap(model, self.get_mut(slot));
            true
        } else {
            false
        }
    }
}
