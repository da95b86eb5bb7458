//! Homomorphic accumulation of ballots into a batch's three running totals.
//!
//! Role, pause and cooldown checks belong to the ledger; this module runs the
//! batch-level preconditions in their fixed order (valid id, open, deadline
//! reached, first vote, well-formed ciphertexts) and computes the new totals
//! with the arithmetic library.
use crate::{
    arithmetic::{Ballot, Counters, EncryptedArithmetic},
    batch::BatchStore,
    error::{Result, TallyError},
    types::{ActorId, BatchId, Timestamp},
};

pub struct EncryptedTally<'a, A: EncryptedArithmetic> {
    arithmetic: &'a A,
}

impl<'a, A: EncryptedArithmetic> EncryptedTally<'a, A> {
    pub fn new(arithmetic: &'a A) -> Self {
        Self { arithmetic }
    }

    /// Counters for a freshly opened batch, each an encryption of zero
    pub fn zero_totals(&self) -> Counters<A::Handle> {
        Counters::new(
            self.arithmetic.zero(),
            self.arithmetic.zero(),
            self.arithmetic.zero(),
        )
    }

    /// Check that `voter` may add `ballot` to batch `batch_id` at time `now`
    /// and return the totals that would result. The store is not modified.
    pub fn prepare(
        &self,
        batches: &BatchStore<A::Handle>,
        batch_id: BatchId,
        voter: &ActorId,
        ballot: &Ballot<A::Handle>,
        now: Timestamp,
    ) -> Result<Counters<A::Handle>> {
        let batch = batches.get_open(batch_id)?;
        // votes are admitted from the deadline onwards, until the batch is closed
        if now < batch.get_deadline() {
            return Err(TallyError::DeadlineNotReached {
                deadline: batch.get_deadline(),
                now,
            });
        }
        if batches.has_voted(batch_id, voter) {
            return Err(TallyError::DuplicateVote(batch_id));
        }
        for (slot, handle) in ballot.slots() {
            if !self.arithmetic.is_initialized(handle) {
                return Err(TallyError::CiphertextNotInitialized { slot });
            }
        }

        let totals = batch
            .get_totals()
            .zip_with(ballot, |total, increment| self.arithmetic.add(total, increment));
        return Ok(totals);
    }

    /// Store totals computed by [`Self::prepare`] and record the voter
    pub fn commit(
        batches: &mut BatchStore<A::Handle>,
        batch_id: BatchId,
        voter: ActorId,
        totals: Counters<A::Handle>,
    ) -> Result<()> {
        batches.get_mut(batch_id)?.set_totals(totals);
        batches.record_voter(batch_id, voter)?;
        Ok(())
    }

    /// Prepare and commit in one step
    pub fn submit(
        &self,
        batches: &mut BatchStore<A::Handle>,
        batch_id: BatchId,
        voter: ActorId,
        ballot: &Ballot<A::Handle>,
        now: Timestamp,
    ) -> Result<()> {
        let totals = self.prepare(batches, batch_id, &voter, ballot, now)?;
        Self::commit(batches, batch_id, voter, totals)
    }
}
