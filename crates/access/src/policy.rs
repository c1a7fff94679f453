//! Access policy: the pure allow/deny decision.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ledgerguard_core::{TenantId, UserId};

use crate::grant::Principal;
use crate::store::GrantStore;

/// External user directory: maps a principal identifier to a user id.
///
/// Backed by whatever identity storage the host application uses; the
/// in-memory implementation below is for tests/dev.
pub trait UserDirectory: Send + Sync {
    fn find_by_principal(&self, principal: &Principal) -> Option<UserId>;
}

impl<D> UserDirectory for Arc<D>
where
    D: UserDirectory + ?Sized,
{
    fn find_by_principal(&self, principal: &Principal) -> Option<UserId> {
        (**self).find_by_principal(principal)
    }
}

/// In-memory user directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Principal, UserId>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, principal: Principal, user_id: UserId) {
        self.users.write().unwrap().insert(principal, user_id);
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_principal(&self, principal: &Principal) -> Option<UserId> {
        self.users.read().unwrap().get(principal).copied()
    }
}

/// The tenant-access decision function.
///
/// `is_authorized` is defined as "an active grant exists right now": it hits
/// the store on every call and caches nothing, so a revocation takes effect
/// on the very next check.
pub struct AccessPolicy<S, D> {
    store: S,
    directory: D,
}

impl<S, D> AccessPolicy<S, D>
where
    S: GrantStore,
    D: UserDirectory,
{
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    /// True iff the user holds an active grant for the tenant.
    ///
    /// - No IO beyond the store lookup
    /// - No side effects
    pub fn is_authorized(&self, user_id: UserId, tenant_id: TenantId) -> bool {
        self.store.find_active(user_id, tenant_id).is_some()
    }

    /// Principal-based overload: resolves the principal through the
    /// directory first. Unknown principals are never authorized.
    pub fn is_principal_authorized(&self, principal: &Principal, tenant_id: TenantId) -> bool {
        self.directory
            .find_by_principal(principal)
            .map(|user_id| self.is_authorized(user_id, tenant_id))
            .unwrap_or(false)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}
