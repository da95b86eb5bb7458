//! Interfaces to the external decryption oracle and its proof verifier, and
//! the fixed cleartext layout the oracle answers with.
//!
//! The oracle receives the three serialized handles of a closed batch together
//! with a callback target, answers immediately with a request id, and later
//! delivers `(request id, cleartexts, proof)` to
//! [`crate::ledger::Ledger::handle_decryption_result`]. The proof covers the
//! ciphertexts as well as the cleartexts, so an answer can only be accepted
//! for the request whose handles it was computed from.
use crate::{
    arithmetic::{Counters, SerializedHandle},
    error::{Result, TallyError},
    fingerprint::keccak256_concat,
    types::{InstanceId, RequestId},
};
use crypto_bigint::{Encoding, U256};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Serialize;
use thiserror::Error;

/// Width of one decrypted total in bytes
pub const TOTAL_BYTES: usize = 32;

/// Width of the cleartext buffer: three big-endian totals, for / against / abstain
pub const CLEARTEXT_BYTES: usize = 3 * TOTAL_BYTES;

pub type Cleartexts = [u8; CLEARTEXT_BYTES];

/// Plaintext totals of a batch, revealed only when a decryption completes
pub type TallyTotals = Counters<U256>;

/// Domain tag for the message an oracle signs over a decryption result
pub const DECRYPTION_DOMAIN: &[u8] = b"confidential-tally:decryption:v1";

/// Where the oracle must deliver its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallbackTarget {
    pub instance: InstanceId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct OracleError(pub String);

/// Asynchronous decryption service.
///
/// `submit` must only enqueue the request; it may not call back into the
/// ledger before returning, since the ledger is locked for the duration of
/// the call.
pub trait DecryptionOracle {
    fn submit(
        &self,
        handles: &[SerializedHandle; 3],
        callback: CallbackTarget,
    ) -> std::result::Result<RequestId, OracleError>;
}

/// Checks that `cleartexts` is the faithful decryption of `handles`, the
/// ciphertexts submitted under `request_id`
pub trait ProofVerifier {
    fn verify(
        &self,
        request_id: RequestId,
        handles: &[SerializedHandle; 3],
        cleartexts: &Cleartexts,
        proof: &[u8],
    ) -> bool;
}

/// Split the cleartext buffer into its three big-endian totals
pub fn decode_cleartexts(cleartexts: &Cleartexts) -> TallyTotals {
    let (in_favor, rest) = cleartexts.split_at(TOTAL_BYTES);
    let (against, abstain) = rest.split_at(TOTAL_BYTES);
    return Counters::new(
        U256::from_be_slice(in_favor),
        U256::from_be_slice(against),
        U256::from_be_slice(abstain),
    );
}

/// Inverse of [`decode_cleartexts`], for oracles building their answer
pub fn encode_totals(totals: &TallyTotals) -> Cleartexts {
    let mut cleartexts = [0u8; CLEARTEXT_BYTES];
    for (i, (_, total)) in totals.slots().iter().enumerate() {
        cleartexts[i * TOTAL_BYTES..(i + 1) * TOTAL_BYTES].copy_from_slice(&total.to_be_bytes());
    }
    cleartexts
}

/// The message an oracle signs to vouch that `cleartexts` decrypts `handles`
pub fn decryption_digest(
    request_id: RequestId,
    handles: &[SerializedHandle; 3],
    cleartexts: &Cleartexts,
) -> [u8; 32] {
    let [in_favor, against, abstain] = handles;
    keccak256_concat(&[
        DECRYPTION_DOMAIN,
        request_id.to_be_bytes().as_slice(),
        in_favor.as_bytes().as_slice(),
        against.as_bytes().as_slice(),
        abstain.as_bytes().as_slice(),
        cleartexts.as_slice(),
    ])
}

/// Accepts a result when `proof` is an ed25519 signature by the oracle's key
/// over [`decryption_digest`]
#[derive(Debug, Clone)]
pub struct Ed25519ProofVerifier {
    oracle_key: VerifyingKey,
}

impl Ed25519ProofVerifier {
    pub fn new(oracle_key: VerifyingKey) -> Self {
        Self { oracle_key }
    }

    pub fn from_bytes(oracle_key: &[u8; 32]) -> Result<Self> {
        let oracle_key = VerifyingKey::from_bytes(oracle_key)
            .map_err(|err| TallyError::Config(format!("oracle key: {err}")))?;
        Ok(Self::new(oracle_key))
    }

    pub fn get_oracle_key(&self) -> &VerifyingKey {
        &self.oracle_key
    }
}

impl ProofVerifier for Ed25519ProofVerifier {
    fn verify(
        &self,
        request_id: RequestId,
        handles: &[SerializedHandle; 3],
        cleartexts: &Cleartexts,
        proof: &[u8],
    ) -> bool {
        let signature = match Signature::from_slice(proof) {
            Ok(signature) => signature,
            Err(_) => return false,
        };
        let digest = decryption_digest(request_id, handles, cleartexts);
        self.oracle_key.verify_strict(&digest, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn totals(in_favor: u64, against: u64, abstain: u64) -> TallyTotals {
        Counters::new(
            U256::from_u64(in_favor),
            U256::from_u64(against),
            U256::from_u64(abstain),
        )
    }

    #[test]
    fn test_decode_layout() {
        let mut cleartexts = [0u8; CLEARTEXT_BYTES];
        cleartexts[31] = 1;
        cleartexts[63] = 2;
        cleartexts[94] = 1; // 256 in the last word
        assert_eq!(decode_cleartexts(&cleartexts), totals(1, 2, 256));
    }

    #[test]
    fn test_encode_inverts_decode() {
        let expected = totals(7, 0, u64::MAX);
        assert_eq!(decode_cleartexts(&encode_totals(&expected)), expected);
    }

    fn handles(seed: u8) -> [SerializedHandle; 3] {
        [
            SerializedHandle::new([seed; 32]),
            SerializedHandle::new([seed + 1; 32]),
            SerializedHandle::new([seed + 2; 32]),
        ]
    }

    #[test]
    fn test_signature_verifier() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let verifier = Ed25519ProofVerifier::new(key.verifying_key());
        let request_id = RequestId(5);
        let submitted = handles(1);
        let cleartexts = encode_totals(&totals(1, 1, 0));
        let proof = key
            .sign(&decryption_digest(request_id, &submitted, &cleartexts))
            .to_bytes();

        assert!(verifier.verify(request_id, &submitted, &cleartexts, &proof));
        // bound to the request id
        assert!(!verifier.verify(RequestId(6), &submitted, &cleartexts, &proof));
        // bound to the cleartexts
        let forged = encode_totals(&totals(2, 0, 0));
        assert!(!verifier.verify(request_id, &submitted, &forged, &proof));
        // malformed proofs are rejected, not panicked on
        assert!(!verifier.verify(request_id, &submitted, &cleartexts, &proof[..10]));
    }

    #[test]
    fn test_signature_is_bound_to_ciphertexts() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let verifier = Ed25519ProofVerifier::new(key.verifying_key());
        let cleartexts = encode_totals(&totals(0, 0, 99));
        let proof = key
            .sign(&decryption_digest(RequestId(1), &handles(4), &cleartexts))
            .to_bytes();

        assert!(verifier.verify(RequestId(1), &handles(4), &cleartexts, &proof));
        // same id and cleartexts, but another batch's ciphertexts
        assert!(!verifier.verify(RequestId(1), &handles(1), &cleartexts, &proof));
        // same handles in another order
        let [a, b, c] = handles(4);
        assert!(!verifier.verify(RequestId(1), &[b, a, c], &cleartexts, &proof));
    }

    #[test]
    fn test_signature_from_other_key_is_rejected() {
        let oracle = SigningKey::from_bytes(&[42u8; 32]);
        let impostor = SigningKey::from_bytes(&[43u8; 32]);
        let verifier = Ed25519ProofVerifier::new(oracle.verifying_key());
        let cleartexts = encode_totals(&totals(1, 0, 0));
        let proof = impostor
            .sign(&decryption_digest(RequestId(1), &handles(1), &cleartexts))
            .to_bytes();
        assert!(!verifier.verify(RequestId(1), &handles(1), &cleartexts, &proof));
    }

    #[test]
    fn test_verifier_from_key_bytes() {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let verifier = Ed25519ProofVerifier::from_bytes(key.verifying_key().as_bytes()).unwrap();
        assert_eq!(verifier.get_oracle_key(), &key.verifying_key());
    }
}
