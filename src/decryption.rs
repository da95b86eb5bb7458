//! Decryption requests and oracle callbacks.
//!
//! Each request moves through `NoRequest -> Requested -> Finalized` and never
//! back. A request is bound to the batch ciphertexts it was issued for by a
//! state fingerprint; the callback recomputes that fingerprint from the batch
//! as it is *now*, so an answer for stale or substituted ciphertexts is
//! rejected even if its proof checks out.
//!
//! Work is split into a read-only `prepare_*` step, which performs every check
//! and may fail, and an infallible commit step, so the ledger can run all
//! preconditions before touching any state.
use crate::{
    arithmetic::{serialize_counters, EncryptedArithmetic, SerializedHandle},
    batch::{Batch, BatchStore},
    error::{Result, TallyError},
    fingerprint::{state_fingerprint, StateHash},
    oracle::{
        decode_cleartexts, CallbackTarget, Cleartexts, DecryptionOracle, ProofVerifier,
        TallyTotals,
    },
    types::{BatchId, InstanceId, RequestId},
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecryptionPhase {
    NoRequest,
    Requested,
    Finalized,
}

/// Correlation record for one outstanding or answered request
#[derive(Debug, Clone)]
pub struct DecryptionContext {
    request_id: RequestId,
    batch_id: BatchId,
    handles: [SerializedHandle; 3],
    state_hash: StateHash,
    processed: bool,
    totals: Option<TallyTotals>,
}

impl DecryptionContext {
    pub fn get_request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn get_batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// The ciphertexts handed to the oracle, in slot order
    pub fn get_handles(&self) -> &[SerializedHandle; 3] {
        &self.handles
    }

    pub fn get_state_hash(&self) -> &StateHash {
        &self.state_hash
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn phase(&self) -> DecryptionPhase {
        if self.processed {
            DecryptionPhase::Finalized
        } else {
            DecryptionPhase::Requested
        }
    }

    pub fn info(&self) -> DecryptionInfo {
        DecryptionInfo {
            request_id: self.request_id,
            batch_id: self.batch_id,
            processed: self.processed,
            totals: self.totals.clone(),
        }
    }
}

/// Client-readable view of a request; the state hash stays internal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptionInfo {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub processed: bool,
    pub totals: Option<TallyTotals>,
}

/// A callback that passed every check and is ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedResult {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub totals: TallyTotals,
}

#[derive(Debug, Clone)]
pub struct DecryptionCoordinator {
    instance: InstanceId,
    contexts: HashMap<RequestId, DecryptionContext>,
}

impl DecryptionCoordinator {
    pub fn new(instance: InstanceId) -> Self {
        return Self {
            instance,
            contexts: HashMap::new(),
        };
    }

    pub fn get_instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Fingerprint of the batch's current ciphertexts under this instance
    pub fn fingerprint<A: EncryptedArithmetic>(
        &self,
        arithmetic: &A,
        batch: &Batch<A::Handle>,
    ) -> StateHash {
        let handles = serialize_counters(arithmetic, batch.get_totals());
        state_fingerprint(&handles, &self.instance)
    }

    /// Check that `batch_id` can be decrypted, hand its ciphertexts to the
    /// oracle and build the context to store under the returned request id.
    /// Nothing is stored here; see [`Self::register`].
    pub fn prepare_request<A, O>(
        &self,
        arithmetic: &A,
        oracle: &O,
        batches: &BatchStore<A::Handle>,
        batch_id: BatchId,
    ) -> Result<DecryptionContext>
    where
        A: EncryptedArithmetic,
        O: DecryptionOracle,
    {
        let batch = batches.get(batch_id)?;
        if batch.is_open() {
            return Err(TallyError::BatchStillOpen(batch_id));
        }

        let handles = serialize_counters(arithmetic, batch.get_totals());
        let state_hash = state_fingerprint(&handles, &self.instance);
        let callback = CallbackTarget {
            instance: self.instance,
        };
        let request_id = oracle
            .submit(&handles, callback)
            .map_err(|err| TallyError::OracleRejected(err.0))?;
        if self.contexts.contains_key(&request_id) {
            return Err(TallyError::DuplicateRequest(request_id));
        }

        Ok(DecryptionContext {
            request_id,
            batch_id,
            handles,
            state_hash,
            processed: false,
            totals: None,
        })
    }

    pub fn register(&mut self, context: DecryptionContext) {
        self.contexts.insert(context.request_id, context);
    }

    /// Run every callback check, in order: known request, replay guard, state
    /// binding, proof. The proof must cover the ciphertexts recorded for this
    /// request, so an answer computed for other handles is rejected even when
    /// it carries the same request id. Decodes the totals on success without
    /// recording them.
    pub fn prepare_result<A, V>(
        &self,
        arithmetic: &A,
        verifier: &V,
        batches: &BatchStore<A::Handle>,
        request_id: RequestId,
        cleartexts: &Cleartexts,
        proof: &[u8],
    ) -> Result<VerifiedResult>
    where
        A: EncryptedArithmetic,
        V: ProofVerifier,
    {
        let context = self
            .contexts
            .get(&request_id)
            .ok_or(TallyError::UnknownRequest(request_id))?;
        if context.processed {
            return Err(TallyError::ReplayDetected(request_id));
        }

        // compare the batch as it is now against the fingerprint taken at request time
        let batch = batches.get(context.batch_id)?;
        if self.fingerprint(arithmetic, batch) != context.state_hash {
            return Err(TallyError::StateMismatch(request_id));
        }

        if !verifier.verify(request_id, &context.handles, cleartexts, proof) {
            return Err(TallyError::InvalidProof(request_id));
        }

        Ok(VerifiedResult {
            request_id,
            batch_id: context.batch_id,
            totals: decode_cleartexts(cleartexts),
        })
    }

    /// Mark the request processed and record its totals. This is the only
    /// transition out of `Requested`, and it happens once.
    pub fn finalize(&mut self, result: &VerifiedResult) {
        if let Some(context) = self.contexts.get_mut(&result.request_id) {
            if context.processed {
                return;
            }
            context.processed = true;
            context.totals = Some(result.totals.clone());
        }
    }

    pub fn get(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.contexts.get(&request_id)
    }

    /// Most advanced phase over all requests issued for `batch_id`
    pub fn phase(&self, batch_id: BatchId) -> DecryptionPhase {
        let mut phase = DecryptionPhase::NoRequest;
        for context in self.contexts.values().filter(|c| c.batch_id == batch_id) {
            match context.phase() {
                DecryptionPhase::Finalized => return DecryptionPhase::Finalized,
                other => phase = other,
            }
        }
        phase
    }

    /// Every request issued for `batch_id`, ordered by request id
    pub fn requests_for(&self, batch_id: BatchId) -> Vec<DecryptionInfo> {
        let mut infos: Vec<DecryptionInfo> = self
            .contexts
            .values()
            .filter(|c| c.batch_id == batch_id)
            .map(DecryptionContext::info)
            .collect();
        infos.sort_by_key(|info| info.request_id);
        infos
    }
}
