//! Access Control Registry.
//!
//! Roles are a capability lookup keyed by identity. Privileged operations
//! check it explicitly before doing anything else.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Identity, Role};
use std::collections::{BTreeSet, HashMap};

/// Role memberships
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessControl {
    members: HashMap<Role, BTreeSet<Identity>>,
}

impl AccessControl {
    /// Whether `identity` holds `role`
    #[must_use]
    pub fn has_role(&self, role: Role, identity: &Identity) -> bool {
        self.members
            .get(&role)
            .is_some_and(|holders| holders.contains(identity))
    }

    /// Every holder of `role`, in identity order
    #[must_use]
    pub fn holders(&self, role: Role) -> Vec<Identity> {
        self.members
            .get(&role)
            .map(|holders| holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Fail with `Unauthorized` unless `caller` holds `role`
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] when the role is missing.
    pub fn require(&self, role: Role, caller: &Identity) -> LedgerResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{caller} does not hold {role}"
            )))
        }
    }

    /// Fail with `LastAdmin` if removing `role` from `account` would leave
    /// the ledger without an administrator
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LastAdmin`].
    pub fn ensure_removable(&self, role: Role, account: &Identity) -> LedgerResult<()> {
        let holders = self.members.get(&role).map_or(0, BTreeSet::len);
        if role == Role::Admin && holders == 1 && self.has_role(role, account) {
            return Err(LedgerError::LastAdmin(role));
        }
        Ok(())
    }

    pub(crate) fn grant(&mut self, role: Role, account: Identity) {
        self.members.entry(role).or_default().insert(account);
    }

    pub(crate) fn revoke(&mut self, role: Role, account: &Identity) {
        if let Some(holders) = self.members.get_mut(&role) {
            holders.remove(account);
        }
    }
}
