//! In-memory stand-ins for the external collaborators, used by the tests.
//!
//! `RegistryArithmetic` is not encryption. It hands out numbered handles and
//! remembers the value behind each one, the way a coprocessor keeps
//! ciphertexts behind pointers, so tests can check sums end to end.
use crate::{
    arithmetic::{Ballot, Counters, EncryptedArithmetic, SerializedHandle, HANDLE_BYTES},
    clock::Clock,
    oracle::{
        decryption_digest, encode_totals, CallbackTarget, Cleartexts, DecryptionOracle,
        Ed25519ProofVerifier, OracleError,
    },
    types::{RequestId, Timestamp},
};
use crypto_bigint::U256;
use ed25519_dalek::{Signer, SigningKey};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

const HANDLE_TAG: &[u8; 4] = b"mock";

/// Handle into a [`RegistryArithmetic`]; 0 is never issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle(u64);

pub struct RegistryArithmetic {
    next_id: AtomicU64,
    values: Mutex<HashMap<u64, u64>>,
}

impl RegistryArithmetic {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// "Encrypt" a value
    pub fn encrypt(&self, value: u64) -> MockHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.values.lock().unwrap().insert(id, value);
        MockHandle(id)
    }

    pub fn ballot(&self, in_favor: u64, against: u64, abstain: u64) -> Ballot<MockHandle> {
        Counters::new(
            self.encrypt(in_favor),
            self.encrypt(against),
            self.encrypt(abstain),
        )
    }

    /// A handle the registry never issued
    pub fn uninitialized(&self) -> MockHandle {
        MockHandle(0)
    }

    /// What the oracle would see after decrypting a serialized handle
    pub fn decrypt(&self, handle: &SerializedHandle) -> Option<u64> {
        let bytes = handle.as_bytes();
        if &bytes[..4] != HANDLE_TAG {
            return None;
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[HANDLE_BYTES - 8..]);
        self.values
            .lock()
            .unwrap()
            .get(&u64::from_be_bytes(id))
            .copied()
    }

    fn value(&self, handle: &MockHandle) -> u64 {
        self.values.lock().unwrap()[&handle.0]
    }
}

impl EncryptedArithmetic for RegistryArithmetic {
    type Handle = MockHandle;

    fn zero(&self) -> MockHandle {
        self.encrypt(0)
    }

    fn add(&self, lhs: &MockHandle, rhs: &MockHandle) -> MockHandle {
        let sum = self.value(lhs) + self.value(rhs);
        self.encrypt(sum)
    }

    fn is_initialized(&self, handle: &MockHandle) -> bool {
        self.values.lock().unwrap().contains_key(&handle.0)
    }

    fn serialize(&self, handle: &MockHandle) -> SerializedHandle {
        let mut bytes = [0u8; HANDLE_BYTES];
        bytes[..4].copy_from_slice(HANDLE_TAG);
        bytes[HANDLE_BYTES - 8..].copy_from_slice(&handle.0.to_be_bytes());
        SerializedHandle::new(bytes)
    }
}

/// A request the oracle accepted and has not answered yet
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub handles: [SerializedHandle; 3],
    pub callback: CallbackTarget,
}

/// Oracle that queues requests for the test to answer by hand
pub struct QueueOracle {
    next_id: AtomicU64,
    rejecting: AtomicBool,
    repeating: AtomicBool,
    pending: Mutex<Vec<PendingRequest>>,
}

impl QueueOracle {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            rejecting: AtomicBool::new(false),
            repeating: AtomicBool::new(false),
            pending: Mutex::new(vec![]),
        }
    }

    pub fn take_pending(&self) -> Vec<PendingRequest> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    /// Refuse every subsequent submission
    pub fn reject_all(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Hand out the same request id again and again
    pub fn repeat_ids(&self, repeating: bool) {
        self.repeating.store(repeating, Ordering::SeqCst);
    }
}

impl DecryptionOracle for QueueOracle {
    fn submit(
        &self,
        handles: &[SerializedHandle; 3],
        callback: CallbackTarget,
    ) -> Result<RequestId, OracleError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(OracleError("queue full".to_string()));
        }
        let id = if self.repeating.load(Ordering::SeqCst) {
            self.next_id.load(Ordering::SeqCst)
        } else {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        };
        let request_id = RequestId(id);
        self.pending.lock().unwrap().push(PendingRequest {
            request_id,
            handles: *handles,
            callback,
        });
        Ok(request_id)
    }
}

/// The oracle's signing key, producing results the ledger accepts
pub struct OracleSigner {
    key: SigningKey,
}

impl OracleSigner {
    pub fn new() -> Self {
        Self {
            key: SigningKey::from_bytes(&[42u8; 32]),
        }
    }

    pub fn verifier(&self) -> Ed25519ProofVerifier {
        Ed25519ProofVerifier::new(self.key.verifying_key())
    }

    pub fn sign(
        &self,
        request_id: RequestId,
        handles: &[SerializedHandle; 3],
        cleartexts: &Cleartexts,
    ) -> Vec<u8> {
        self.key
            .sign(&decryption_digest(request_id, handles, cleartexts))
            .to_bytes()
            .to_vec()
    }

    /// Decrypt a pending request honestly and sign the result
    pub fn answer(
        &self,
        arithmetic: &RegistryArithmetic,
        pending: &PendingRequest,
    ) -> (RequestId, Cleartexts, Vec<u8>) {
        let [in_favor, against, abstain] = pending
            .handles
            .map(|handle| U256::from_u64(arithmetic.decrypt(&handle).unwrap()));
        let cleartexts = encode_totals(&Counters::new(in_favor, against, abstain));
        let proof = self.sign(pending.request_id, &pending.handles, &cleartexts);
        (pending.request_id, cleartexts, proof)
    }
}

/// Clock the test moves by hand
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}
