//! Confidential tallying of encrypted votes in discrete batches, with results
//! revealed by an external decryption oracle and bound to the exact
//! ciphertexts they were computed from.
//!
//! The encryption scheme, the oracle and its proofs live outside this crate
//! and are plugged in through [`EncryptedArithmetic`], [`DecryptionOracle`]
//! and [`ProofVerifier`]. A [`Ledger`] is one protocol instance.
pub mod access;
pub mod arithmetic;
pub mod batch;
pub mod clock;
pub mod config;
pub mod decryption;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod ledger;
pub mod oracle;
pub mod rate_limit;
pub mod tally;
pub mod types;

#[cfg(test)]
mod testing;

pub use arithmetic::{Ballot, Counters, EncryptedArithmetic, SerializedHandle};
pub use clock::{Clock, SystemClock};
pub use config::ProtocolConfig;
pub use error::{Result, TallyError};
pub use events::{Event, EventRecord};
pub use ledger::Ledger;
pub use oracle::{DecryptionOracle, Ed25519ProofVerifier, ProofVerifier, TallyTotals};
pub use types::{ActorId, BatchId, InstanceId, RequestId, Timestamp};
