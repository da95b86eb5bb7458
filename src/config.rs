//! Deployment parameters of one ledger instance.
//!
//! Identities are written as hex strings, optionally `0x`-prefixed:
//!
//! ```json
//! {
//!   "owner": "0101...01",
//!   "providers": ["0202...02"],
//!   "cooldown_secs": 30
//! }
//! ```
//!
//! `providers` and `cooldown_secs` may be left out. Without an `instance` a
//! fresh random instance id is drawn when the ledger is built.
use crate::{
    error::Result,
    types::{ActorId, InstanceId},
};
use serde::Deserialize;

pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    pub owner: ActorId,
    #[serde(default)]
    pub providers: Vec<ActorId>,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub instance: Option<InstanceId>,
}

impl ProtocolConfig {
    pub fn new(owner: ActorId) -> Self {
        return Self {
            owner,
            providers: vec![],
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            instance: None,
        };
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = ActorId>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn with_cooldown(mut self, cooldown_secs: u64) -> Self {
        self.cooldown_secs = cooldown_secs;
        self
    }

    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
