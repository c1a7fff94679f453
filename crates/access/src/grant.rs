//! Access-grant records and the acting principal identity.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerguard_core::{GrantId, TenantId, UserId};

/// Identity of the caller as supplied by the external identity provider
/// (e.g. a username or a service-account subject).
///
/// Principals are modeled as opaque strings at this layer; mapping a
/// principal to a [`UserId`](ledgerguard_core::UserId) is the job of a
/// [`UserDirectory`](crate::UserDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(Cow<'static, str>);

impl Principal {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Principal {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// One grant of tenant access to a user.
///
/// Grants are never physically deleted: revocation flips `active` to false
/// and stamps `revoked_at`/`revoked_by`, preserving an audit trail. The
/// store enforces that at most one record per (user, tenant) pair is active
/// at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: GrantId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub active: bool,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Principal,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Principal>,
}

impl AccessGrant {
    /// Build a fresh active grant stamped with the acting principal.
    pub fn issue(
        user_id: UserId,
        tenant_id: TenantId,
        granted_by: Principal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GrantId::new(),
            user_id,
            tenant_id,
            active: true,
            granted_at: now,
            granted_by,
            revoked_at: None,
            revoked_by: None,
        }
    }

    /// Transition this grant to the revoked state.
    ///
    /// The caller (the store) is responsible for only revoking active grants.
    pub(crate) fn revoke(&mut self, revoked_by: Principal, now: DateTime<Utc>) {
        self.active = false;
        self.revoked_at = Some(now);
        self.revoked_by = Some(revoked_by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn issued_grant_is_active_and_unrevoked() {
        let grant = AccessGrant::issue(
            UserId::new(),
            TenantId::new(),
            Principal::new("admin"),
            test_time(),
        );
        assert!(grant.active);
        assert_eq!(grant.granted_at, test_time());
        assert_eq!(grant.granted_by, Principal::new("admin"));
        assert!(grant.revoked_at.is_none());
        assert!(grant.revoked_by.is_none());
    }

    #[test]
    fn revoke_stamps_metadata_and_deactivates() {
        let mut grant = AccessGrant::issue(
            UserId::new(),
            TenantId::new(),
            Principal::new("admin"),
            test_time(),
        );
        let later = test_time() + chrono::Duration::hours(1);
        grant.revoke(Principal::new("auditor"), later);
        assert!(!grant.active);
        assert_eq!(grant.revoked_at, Some(later));
        assert_eq!(grant.revoked_by, Some(Principal::new("auditor")));
        // issuance metadata is retained for the audit trail
        assert_eq!(grant.granted_by, Principal::new("admin"));
    }
}
