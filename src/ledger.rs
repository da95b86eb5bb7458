//! One protocol instance: the ledger state behind a single lock, and the
//! external collaborators it calls out to.
//!
//! Every mutating operation takes the lock once, runs all of its checks in a
//! fixed order, and only then writes. A rejected operation leaves no trace:
//! no state change, no event, no cooldown consumed.
use crate::{
    access::AccessRegistry,
    arithmetic::{Ballot, EncryptedArithmetic},
    batch::{BatchInfo, BatchStore},
    clock::Clock,
    config::ProtocolConfig,
    decryption::{DecryptionCoordinator, DecryptionInfo, DecryptionPhase},
    error::Result,
    events::{Event, EventLog, EventRecord},
    oracle::{Cleartexts, DecryptionOracle, ProofVerifier, TallyTotals},
    rate_limit::{ActionKind, RateLimiter},
    tally::EncryptedTally,
    types::{ActorId, BatchId, InstanceId, RequestId, Timestamp},
};
use std::sync::{Mutex, MutexGuard, PoisonError};

struct LedgerState<H> {
    access: AccessRegistry,
    limiter: RateLimiter,
    batches: BatchStore<H>,
    coordinator: DecryptionCoordinator,
    events: EventLog,
}

pub struct Ledger<A, O, V, C>
where
    A: EncryptedArithmetic,
{
    instance: InstanceId,
    state: Mutex<LedgerState<A::Handle>>,
    arithmetic: A,
    oracle: O,
    verifier: V,
    clock: C,
}

impl<A, O, V, C> Ledger<A, O, V, C>
where
    A: EncryptedArithmetic,
    O: DecryptionOracle,
    V: ProofVerifier,
    C: Clock,
{
    /// Build an instance from its configuration. Each initial provider is
    /// announced with a `ProviderAdded` event.
    pub fn new(config: ProtocolConfig, arithmetic: A, oracle: O, verifier: V, clock: C) -> Self {
        let instance = config.instance.unwrap_or_else(InstanceId::random);
        let now = clock.now();
        let mut access = AccessRegistry::new(config.owner);
        let mut events = EventLog::new();
        for provider in config.providers {
            access.add_provider(provider);
            events.emit(now, Event::ProviderAdded { provider });
        }

        let state = LedgerState {
            access,
            limiter: RateLimiter::new(config.cooldown_secs),
            batches: BatchStore::new(),
            coordinator: DecryptionCoordinator::new(instance),
            events,
        };
        return Self {
            instance,
            state: Mutex::new(state),
            arithmetic,
            oracle,
            verifier,
            clock,
        };
    }

    /// State is only written after every check has passed, so a panic while
    /// holding the lock cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, LedgerState<A::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn transfer_ownership(&self, caller: &ActorId, new_owner: ActorId) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;

        let previous = state.access.transfer_ownership(new_owner);
        state.events.emit(
            now,
            Event::OwnershipTransferred {
                previous,
                new: new_owner,
            },
        );
        Ok(())
    }

    pub fn add_provider(&self, caller: &ActorId, provider: ActorId) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;

        state.access.add_provider(provider);
        state.events.emit(now, Event::ProviderAdded { provider });
        Ok(())
    }

    pub fn remove_provider(&self, caller: &ActorId, provider: ActorId) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;

        state.access.remove_provider(&provider);
        state.events.emit(now, Event::ProviderRemoved { provider });
        Ok(())
    }

    /// Setting the flag to its current value succeeds without an event
    pub fn set_paused(&self, caller: &ActorId, paused: bool) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;

        if state.access.set_paused(paused) {
            let by = *caller;
            let event = if paused {
                Event::Paused { by }
            } else {
                Event::Unpaused { by }
            };
            state.events.emit(now, event);
        }
        Ok(())
    }

    pub fn set_cooldown(&self, caller: &ActorId, cooldown_secs: u64) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;

        let previous = state.limiter.set_cooldown(cooldown_secs);
        state.events.emit(
            now,
            Event::CooldownChanged {
                previous,
                new: cooldown_secs,
            },
        );
        Ok(())
    }

    /// Open the next batch with all three totals at an encryption of zero
    pub fn open_batch(&self, caller: &ActorId, proposal_deadline: Timestamp) -> Result<BatchId> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;
        state.access.require_not_paused()?;

        let zero_totals = EncryptedTally::new(&self.arithmetic).zero_totals();
        let batch_id = state.batches.open(zero_totals, proposal_deadline);
        state.events.emit(
            now,
            Event::BatchOpened {
                batch_id,
                deadline: proposal_deadline,
            },
        );
        Ok(batch_id)
    }

    pub fn close_batch(&self, caller: &ActorId, batch_id: BatchId) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_owner(caller)?;
        state.access.require_not_paused()?;

        state.batches.close(batch_id)?;
        state.events.emit(now, Event::BatchClosed { batch_id });
        Ok(())
    }

    /// Add a provider's encrypted ballot to the running totals of a batch
    pub fn submit_vote(
        &self,
        caller: &ActorId,
        batch_id: BatchId,
        ballot: &Ballot<A::Handle>,
    ) -> Result<()> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_provider(caller)?;
        state.access.require_not_paused()?;
        state.limiter.check(caller, ActionKind::SubmitVote, now)?;
        let tally = EncryptedTally::new(&self.arithmetic);
        let totals = tally.prepare(&state.batches, batch_id, caller, ballot, now)?;

        EncryptedTally::<A>::commit(&mut state.batches, batch_id, *caller, totals)?;
        state.limiter.record(*caller, ActionKind::SubmitVote, now);
        state.events.emit(
            now,
            Event::VoteSubmitted {
                batch_id,
                provider: *caller,
            },
        );
        Ok(())
    }

    /// Hand the totals of a closed batch to the oracle. Returns as soon as
    /// the oracle has accepted the request; the result arrives later through
    /// [`Self::handle_decryption_result`].
    pub fn request_decryption(&self, caller: &ActorId, batch_id: BatchId) -> Result<RequestId> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        state.access.require_provider(caller)?;
        state.access.require_not_paused()?;
        state
            .limiter
            .check(caller, ActionKind::RequestDecryption, now)?;
        let context = state.coordinator.prepare_request(
            &self.arithmetic,
            &self.oracle,
            &state.batches,
            batch_id,
        )?;

        let request_id = context.get_request_id();
        state.coordinator.register(context);
        state
            .limiter
            .record(*caller, ActionKind::RequestDecryption, now);
        state.events.emit(
            now,
            Event::DecryptionRequested {
                request_id,
                batch_id,
            },
        );
        Ok(request_id)
    }

    /// Oracle callback. Accepted at most once per request, and only when the
    /// batch ciphertexts are still the ones the request was issued for and
    /// the proof checks out.
    pub fn handle_decryption_result(
        &self,
        request_id: RequestId,
        cleartexts: &Cleartexts,
        proof: &[u8],
    ) -> Result<TallyTotals> {
        let mut guard = self.lock();
        let now = self.clock.now();
        let state = &mut *guard;
        let result = state.coordinator.prepare_result(
            &self.arithmetic,
            &self.verifier,
            &state.batches,
            request_id,
            cleartexts,
            proof,
        )?;

        state.coordinator.finalize(&result);
        let totals = result.totals;
        state.events.emit(
            now,
            Event::DecryptionCompleted {
                request_id,
                batch_id: result.batch_id,
                total_for: totals.in_favor,
                total_against: totals.against,
                total_abstain: totals.abstain,
            },
        );
        Ok(totals)
    }

    pub fn owner(&self) -> ActorId {
        *self.lock().access.get_owner()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().access.is_paused()
    }

    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.lock().access.is_provider(actor)
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.lock().limiter.get_cooldown()
    }

    pub fn last_action(&self, actor: &ActorId, kind: ActionKind) -> Option<Timestamp> {
        self.lock().limiter.last_action(actor, kind)
    }

    /// Id of the most recent batch, 0 before the first one is opened
    pub fn current_batch_id(&self) -> BatchId {
        self.lock().batches.current_id()
    }

    pub fn batch(&self, batch_id: BatchId) -> Result<BatchInfo> {
        self.lock().batches.info(batch_id)
    }

    pub fn has_voted(&self, batch_id: BatchId, actor: &ActorId) -> Result<bool> {
        let state = self.lock();
        state.batches.get(batch_id)?;
        Ok(state.batches.has_voted(batch_id, actor))
    }

    pub fn decryption(&self, request_id: RequestId) -> Option<DecryptionInfo> {
        self.lock().coordinator.get(request_id).map(|c| c.info())
    }

    pub fn decryption_phase(&self, batch_id: BatchId) -> Result<DecryptionPhase> {
        let state = self.lock();
        state.batches.get(batch_id)?;
        Ok(state.coordinator.phase(batch_id))
    }

    pub fn requests_for(&self, batch_id: BatchId) -> Vec<DecryptionInfo> {
        self.lock().coordinator.requests_for(batch_id)
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.lock().events.records().to_vec()
    }

    /// Events from sequence number `sequence` onwards, for observers polling
    /// the log
    pub fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        self.lock().events.since(sequence).to_vec()
    }

    pub fn export_events(&self) -> serde_json::Result<String> {
        self.lock().events.export_json()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    pub fn arithmetic(&self) -> &A {
        &self.arithmetic
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
