//! Owner and provider bookkeeping, and the pause switch.
//!
//! The registry only answers questions and flips flags; emitting events for
//! the changes is left to the ledger, which owns the event log.
use crate::{
    error::{Result, Role, TallyError},
    types::ActorId,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AccessRegistry {
    owner: ActorId,
    providers: HashSet<ActorId>,
    paused: bool,
}

impl AccessRegistry {
    pub fn new(owner: ActorId) -> Self {
        return Self {
            owner,
            providers: HashSet::new(),
            paused: false,
        };
    }

    pub fn get_owner(&self) -> &ActorId {
        &self.owner
    }

    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.providers.contains(actor)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn require_owner(&self, caller: &ActorId) -> Result<()> {
        if *caller != self.owner {
            return Err(TallyError::Unauthorized { role: Role::Owner });
        }
        Ok(())
    }

    pub fn require_provider(&self, caller: &ActorId) -> Result<()> {
        if !self.is_provider(caller) {
            return Err(TallyError::Unauthorized {
                role: Role::Provider,
            });
        }
        Ok(())
    }

    pub fn require_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(TallyError::Paused);
        }
        Ok(())
    }

    /// Replace the owner, returning the previous one
    pub fn transfer_ownership(&mut self, new_owner: ActorId) -> ActorId {
        std::mem::replace(&mut self.owner, new_owner)
    }

    /// Grant the provider role. Granting it twice is harmless.
    pub fn add_provider(&mut self, actor: ActorId) {
        self.providers.insert(actor);
    }

    /// Revoke the provider role. Revoking an absent role is harmless.
    pub fn remove_provider(&mut self, actor: &ActorId) {
        self.providers.remove(actor);
    }

    /// Set the pause flag. Returns false when the flag already had that value.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: ActorId = ActorId::new([1; 32]);
    const ALICE: ActorId = ActorId::new([2; 32]);

    #[test]
    fn test_owner_guard() {
        let registry = AccessRegistry::new(OWNER);
        assert!(registry.require_owner(&OWNER).is_ok());
        assert_eq!(
            registry.require_owner(&ALICE),
            Err(TallyError::Unauthorized { role: Role::Owner })
        );
    }

    #[test]
    fn test_provider_roles_are_idempotent() {
        let mut registry = AccessRegistry::new(OWNER);
        registry.add_provider(ALICE);
        registry.add_provider(ALICE);
        assert!(registry.require_provider(&ALICE).is_ok());

        registry.remove_provider(&ALICE);
        registry.remove_provider(&ALICE);
        assert_eq!(
            registry.require_provider(&ALICE),
            Err(TallyError::Unauthorized {
                role: Role::Provider
            })
        );
    }

    #[test]
    fn test_owner_is_not_implicitly_a_provider() {
        let registry = AccessRegistry::new(OWNER);
        assert!(registry.require_provider(&OWNER).is_err());
    }

    #[test]
    fn test_set_paused_reports_changes_only() {
        let mut registry = AccessRegistry::new(OWNER);
        assert!(!registry.set_paused(false));
        assert!(registry.set_paused(true));
        assert_eq!(registry.require_not_paused(), Err(TallyError::Paused));
        assert!(!registry.set_paused(true));
        assert!(registry.set_paused(false));
        assert!(registry.require_not_paused().is_ok());
    }

    #[test]
    fn test_transfer_ownership_returns_previous() {
        let mut registry = AccessRegistry::new(OWNER);
        assert_eq!(registry.transfer_ownership(ALICE), OWNER);
        assert!(registry.require_owner(&ALICE).is_ok());
        assert!(registry.require_owner(&OWNER).is_err());
    }
}
