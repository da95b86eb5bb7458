//! Batch records and per-batch voter membership.
//!
//! Batches live in an arena indexed by id (batch `n` is slot `n - 1`) and are
//! never removed. Voter membership is a flat set keyed by `(batch, actor)`, so
//! a batch record never owns a nested collection.
use crate::{
    arithmetic::Counters,
    error::{Result, TallyError},
    types::{ActorId, BatchId, Timestamp},
};
use serde::Serialize;
use std::collections::HashSet;

/// One voting round with its encrypted running totals
#[derive(Debug, Clone)]
pub struct Batch<H> {
    id: BatchId,
    is_open: bool,
    totals: Counters<H>,
    proposal_deadline: Timestamp,
    voter_count: usize,
}

impl<H> Batch<H> {
    pub fn get_id(&self) -> BatchId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn get_deadline(&self) -> Timestamp {
        self.proposal_deadline
    }

    /// The encrypted running totals. Only the arithmetic library can make
    /// anything of them.
    pub fn get_totals(&self) -> &Counters<H> {
        &self.totals
    }

    pub(crate) fn set_totals(&mut self, totals: Counters<H>) {
        self.totals = totals;
    }

    pub fn info(&self) -> BatchInfo {
        BatchInfo {
            id: self.id,
            is_open: self.is_open,
            proposal_deadline: self.proposal_deadline,
            voter_count: self.voter_count,
        }
    }
}

/// Client-readable view of a batch. Ciphertexts are left out: they carry no
/// meaning outside the arithmetic library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchInfo {
    pub id: BatchId,
    pub is_open: bool,
    pub proposal_deadline: Timestamp,
    pub voter_count: usize,
}

#[derive(Debug, Clone)]
pub struct BatchStore<H> {
    batches: Vec<Batch<H>>,
    voters: HashSet<(BatchId, ActorId)>,
}

impl<H> Default for BatchStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> BatchStore<H> {
    pub fn new() -> Self {
        return Self {
            batches: vec![],
            voters: HashSet::new(),
        };
    }

    /// Id of the most recently opened batch, or 0 if none was opened yet
    pub fn current_id(&self) -> BatchId {
        self.batches.len() as BatchId
    }

    /// Append a new open batch whose counters start at `zero_totals`
    pub fn open(&mut self, zero_totals: Counters<H>, proposal_deadline: Timestamp) -> BatchId {
        let id = self.current_id() + 1;
        self.batches.push(Batch {
            id,
            is_open: true,
            totals: zero_totals,
            proposal_deadline,
            voter_count: 0,
        });
        return id;
    }

    fn index(&self, id: BatchId) -> Result<usize> {
        if id == 0 || id > self.current_id() {
            return Err(TallyError::InvalidBatch(id));
        }
        usize::try_from(id - 1).map_err(|_| TallyError::InvalidBatch(id))
    }

    pub fn get(&self, id: BatchId) -> Result<&Batch<H>> {
        let index = self.index(id)?;
        Ok(&self.batches[index])
    }

    pub(crate) fn get_mut(&mut self, id: BatchId) -> Result<&mut Batch<H>> {
        let index = self.index(id)?;
        Ok(&mut self.batches[index])
    }

    /// Get a batch that must still be accepting votes
    pub fn get_open(&self, id: BatchId) -> Result<&Batch<H>> {
        let batch = self.get(id)?;
        if !batch.is_open {
            return Err(TallyError::BatchNotOpen(id));
        }
        Ok(batch)
    }

    /// Stop accepting votes. There is no way back.
    pub fn close(&mut self, id: BatchId) -> Result<()> {
        self.get_open(id)?;
        self.get_mut(id)?.is_open = false;
        Ok(())
    }

    pub fn info(&self, id: BatchId) -> Result<BatchInfo> {
        self.get(id).map(Batch::info)
    }

    pub fn has_voted(&self, id: BatchId, actor: &ActorId) -> bool {
        self.voters.contains(&(id, *actor))
    }

    /// Add `actor` to the voters of batch `id`. Returns false if already present.
    pub(crate) fn record_voter(&mut self, id: BatchId, actor: ActorId) -> Result<bool> {
        let index = self.index(id)?;
        if !self.voters.insert((id, actor)) {
            return Ok(false);
        }
        self.batches[index].voter_count += 1;
        Ok(true)
    }
}
