//! Append-only record of every state transition.
//!
//! Events never carry ciphertexts or vote contents; the only plaintext values
//! that appear are decrypted totals, after the oracle has revealed them.
use crate::types::{ActorId, BatchId, RequestId, Timestamp};
use crypto_bigint::U256;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OwnershipTransferred {
        previous: ActorId,
        new: ActorId,
    },
    ProviderAdded {
        provider: ActorId,
    },
    ProviderRemoved {
        provider: ActorId,
    },
    Paused {
        by: ActorId,
    },
    Unpaused {
        by: ActorId,
    },
    CooldownChanged {
        previous: u64,
        new: u64,
    },
    BatchOpened {
        batch_id: BatchId,
        deadline: Timestamp,
    },
    BatchClosed {
        batch_id: BatchId,
    },
    VoteSubmitted {
        batch_id: BatchId,
        provider: ActorId,
    },
    DecryptionRequested {
        request_id: RequestId,
        batch_id: BatchId,
    },
    DecryptionCompleted {
        request_id: RequestId,
        batch_id: BatchId,
        total_for: U256,
        total_against: U256,
        total_abstain: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0
    pub sequence: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn emit(&mut self, timestamp: Timestamp, event: Event) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            timestamp,
            event,
        });
        return sequence;
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with a sequence number of at least `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One JSON object per line, in sequence order
    pub fn export_json(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}
