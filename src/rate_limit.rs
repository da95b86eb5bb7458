//! Per-actor cooldowns.
//!
//! One global cooldown duration applies to every action kind, but each
//! `(actor, kind)` pair keeps its own timer: submitting a vote does not delay
//! a decryption request by the same provider.
use crate::{
    error::{Result, TallyError},
    types::{ActorId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    SubmitVote,
    RequestDecryption,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::SubmitVote => f.write_str("vote submission"),
            ActionKind::RequestDecryption => f.write_str("decryption request"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown_secs: u64,
    last_action: HashMap<(ActorId, ActionKind), Timestamp>,
}

impl RateLimiter {
    pub fn new(cooldown_secs: u64) -> Self {
        return Self {
            cooldown_secs,
            last_action: HashMap::new(),
        };
    }

    pub fn get_cooldown(&self) -> u64 {
        self.cooldown_secs
    }

    /// Replace the cooldown, returning the previous value
    pub fn set_cooldown(&mut self, cooldown_secs: u64) -> u64 {
        std::mem::replace(&mut self.cooldown_secs, cooldown_secs)
    }

    pub fn last_action(&self, actor: &ActorId, kind: ActionKind) -> Option<Timestamp> {
        self.last_action.get(&(*actor, kind)).copied()
    }

    /// Fail if `now` is still inside the actor's cooldown window for `kind`.
    /// An actor that never acted is always allowed.
    pub fn check(&self, actor: &ActorId, kind: ActionKind, now: Timestamp) -> Result<()> {
        if let Some(last) = self.last_action(actor, kind) {
            let ready_at = last.saturating_add(self.cooldown_secs);
            if now < ready_at {
                return Err(TallyError::CooldownActive { kind, ready_at });
            }
        }
        Ok(())
    }

    pub fn record(&mut self, actor: ActorId, kind: ActionKind, now: Timestamp) {
        self.last_action.insert((actor, kind), now);
    }

    pub fn check_and_record(
        &mut self,
        actor: &ActorId,
        kind: ActionKind,
        now: Timestamp,
    ) -> Result<()> {
        self.check(actor, kind, now)?;
        self.record(*actor, kind, now);
        Ok(())
    }
}
