//! Keccak-256 fingerprints binding a decryption request to the exact
//! ciphertexts it targets and to the protocol instance that issued it.
use crate::{arithmetic::SerializedHandle, types::InstanceId};
use digest::Digest;
use sha3::Keccak256;

/// 32-byte fingerprint of a batch's three ciphertext handles
pub type StateHash = [u8; 32];

/// Domain tag for state fingerprints
pub const STATE_DOMAIN: &[u8] = b"confidential-tally:state:v1";

/// Compute keccak256 of the concatenation of `inputs`
pub fn keccak256_concat(inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for chunk in inputs {
        hasher.update(chunk);
    }
    let out = hasher.finalize();
    let mut h = [0u8; 32];
    h.copy_from_slice(&out);
    h
}

/// Fingerprint of the ordered handles `[for, against, abstain]` under `instance`.
/// Any change to a handle, to their order, or to the instance changes the result.
pub fn state_fingerprint(handles: &[SerializedHandle; 3], instance: &InstanceId) -> StateHash {
    let [in_favor, against, abstain] = handles;
    keccak256_concat(&[
        STATE_DOMAIN,
        in_favor.as_bytes().as_slice(),
        against.as_bytes().as_slice(),
        abstain.as_bytes().as_slice(),
        instance.as_bytes().as_slice(),
    ])
}
