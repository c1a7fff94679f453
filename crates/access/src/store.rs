//! Grant storage abstraction and the in-memory implementation.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use ledgerguard_core::{TenantId, UserId};

use crate::grant::{AccessGrant, Principal};

/// Grant store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    /// An active grant already exists for the pair; revoke it first.
    #[error("user {user_id} already has an active grant for tenant {tenant_id}")]
    DuplicateGrant { user_id: UserId, tenant_id: TenantId },

    /// Revocation requested where no active grant exists.
    #[error("no active grant for user {user_id} on tenant {tenant_id}")]
    NoActiveGrant { user_id: UserId, tenant_id: TenantId },
}

/// Grant store abstraction.
///
/// Mutations persist synchronously before returning and reads observe the
/// most recent committed write. `grant`/`revoke` must be atomic with their
/// uniqueness check so two concurrent grants for the same pair cannot both
/// succeed; implementations run the check-then-act under their own
/// transaction or lock.
pub trait GrantStore: Send + Sync {
    /// Issue a new active grant for (user, tenant).
    ///
    /// Fails with [`GrantError::DuplicateGrant`] if an active grant already
    /// exists for the pair. A revoked history for the pair does not block
    /// re-granting.
    fn grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        granted_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError>;

    /// Revoke the single active grant for (user, tenant).
    ///
    /// Fails with [`GrantError::NoActiveGrant`] if none is active. The record
    /// is kept, flipped inactive and stamped with revocation metadata.
    fn revoke(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        revoked_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError>;

    /// The active grant for (user, tenant), if any.
    fn find_active(&self, user_id: UserId, tenant_id: TenantId) -> Option<AccessGrant>;

    /// All grants for a user, oldest first. `include_inactive` adds revoked
    /// history records.
    fn list_by_user(&self, user_id: UserId, include_inactive: bool) -> Vec<AccessGrant>;

    /// All grants for a tenant, oldest first. `include_inactive` adds revoked
    /// history records.
    fn list_by_tenant(&self, tenant_id: TenantId, include_inactive: bool) -> Vec<AccessGrant>;
}

impl<S> GrantStore for Arc<S>
where
    S: GrantStore + ?Sized,
{
    fn grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        granted_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError> {
        (**self).grant(user_id, tenant_id, granted_by, now)
    }

    fn revoke(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        revoked_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError> {
        (**self).revoke(user_id, tenant_id, revoked_by, now)
    }

    fn find_active(&self, user_id: UserId, tenant_id: TenantId) -> Option<AccessGrant> {
        (**self).find_active(user_id, tenant_id)
    }

    fn list_by_user(&self, user_id: UserId, include_inactive: bool) -> Vec<AccessGrant> {
        (**self).list_by_user(user_id, include_inactive)
    }

    fn list_by_tenant(&self, tenant_id: TenantId, include_inactive: bool) -> Vec<AccessGrant> {
        (**self).list_by_tenant(tenant_id, include_inactive)
    }
}

/// In-memory grant store for tests/dev.
///
/// Records are held in insertion order; the single write lock makes the
/// uniqueness check atomic with the insert/update.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    grants: RwLock<Vec<AccessGrant>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(Vec::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl GrantStore for InMemoryGrantStore {
    fn grant(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        granted_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError> {
        let mut grants = self.grants.write().unwrap();
        let duplicate = grants
            .iter()
            .any(|g| g.user_id == user_id && g.tenant_id == tenant_id && g.active);
        if duplicate {
            return Err(GrantError::DuplicateGrant { user_id, tenant_id });
        }
        let grant = AccessGrant::issue(user_id, tenant_id, granted_by, now);
        grants.push(grant.clone());
        Ok(grant)
    }

    fn revoke(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        revoked_by: Principal,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, GrantError> {
        let mut grants = self.grants.write().unwrap();
        let active = grants
            .iter_mut()
            .find(|g| g.user_id == user_id && g.tenant_id == tenant_id && g.active);
        match active {
            Some(grant) => {
                grant.revoke(revoked_by, now);
                Ok(grant.clone())
            }
            None => Err(GrantError::NoActiveGrant { user_id, tenant_id }),
        }
    }

    fn find_active(&self, user_id: UserId, tenant_id: TenantId) -> Option<AccessGrant> {
        self.grants
            .read()
            .unwrap()
            .iter()
            .find(|g| g.user_id == user_id && g.tenant_id == tenant_id && g.active)
            .cloned()
    }

    fn list_by_user(&self, user_id: UserId, include_inactive: bool) -> Vec<AccessGrant> {
        self.grants
            .read()
            .unwrap()
            .iter()
            .filter(|g| g.user_id == user_id && (include_inactive || g.active))
            .cloned()
            .collect()
    }

    fn list_by_tenant(&self, tenant_id: TenantId, include_inactive: bool) -> Vec<AccessGrant> {
        self.grants
            .read()
            .unwrap()
            .iter()
            .filter(|g| g.tenant_id == tenant_id && (include_inactive || g.active))
            .cloned()
            .collect()
    }
}
