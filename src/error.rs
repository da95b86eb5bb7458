//! Error type for the ledger
use crate::{
    rate_limit::ActionKind,
    types::{BatchId, RequestId, Timestamp},
};
use thiserror::Error;

/// Role an operation required of its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Provider,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Provider => f.write_str("provider"),
        }
    }
}

/// Slot of a ciphertext within a ballot or a batch tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    For,
    Against,
    Abstain,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::For => f.write_str("for"),
            Slot::Against => f.write_str("against"),
            Slot::Abstain => f.write_str("abstain"),
        }
    }
}

/// Every way a ledger operation can be rejected. Each variant is reported at
/// the first violated precondition and nothing has been mutated when it is
/// returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    /// Caller lacks the owner or provider role
    #[error("caller is not the {role}")]
    Unauthorized { role: Role },

    #[error("ledger is paused")]
    Paused,

    #[error("{kind} cooldown active until {ready_at}")]
    CooldownActive { kind: ActionKind, ready_at: Timestamp },

    #[error("batch {0} does not exist")]
    InvalidBatch(BatchId),

    #[error("batch {0} is not open")]
    BatchNotOpen(BatchId),

    /// Decryption was requested while the totals can still change
    #[error("batch {0} is still open")]
    BatchStillOpen(BatchId),

    #[error("provider already voted in batch {0}")]
    DuplicateVote(BatchId),

    /// Votes are only admitted once the proposal deadline has been reached
    #[error("proposal deadline {deadline} not reached at {now}")]
    DeadlineNotReached { deadline: Timestamp, now: Timestamp },

    #[error("{slot} ciphertext is not initialized")]
    CiphertextNotInitialized { slot: Slot },

    #[error("no decryption request {0}")]
    UnknownRequest(RequestId),

    #[error("decryption request {0} already processed")]
    ReplayDetected(RequestId),

    /// The batch ciphertexts no longer match the fingerprint taken at request time
    #[error("ciphertext state changed since request {0}")]
    StateMismatch(RequestId),

    #[error("decryption proof for request {0} is invalid")]
    InvalidProof(RequestId),

    /// The oracle handed out a request id that already has a context
    #[error("oracle reused request id {0}")]
    DuplicateRequest(RequestId),

    #[error("oracle rejected decryption request: {0}")]
    OracleRejected(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
