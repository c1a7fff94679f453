//! The guard: the wrapping mechanism that enforces tenant access around a
//! protected operation.

use thiserror::Error;
use tracing::{debug, error, warn};

use ledgerguard_core::TenantId;

use crate::grant::Principal;
use crate::operation::OperationMetadata;
use crate::policy::{AccessPolicy, UserDirectory};
use crate::resolve::{CallArgs, ResolveError, resolve};
use crate::store::GrantStore;

/// Why a guarded call did not run.
///
/// The three variants are deliberately distinguishable: only
/// [`GuardError::AccessDenied`] is safe to translate into a generic
/// "forbidden" response; the other two mean the call could not even be
/// evaluated and belong in front of an operator, not an end user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The operation's declared strategy does not match its actual call
    /// shape. A latent security hole, never a legitimate rejection.
    #[error("operation '{operation}' is misconfigured: {source}")]
    Configuration {
        operation: String,
        #[source]
        source: ResolveError,
    },

    /// The directory has no user for the acting principal.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(Principal),

    /// Target resolved, principal known, but no active grant exists.
    #[error("access denied to tenant {tenant_id} for operation '{operation}'")]
    AccessDenied {
        operation: String,
        tenant_id: TenantId,
    },
}

/// Orchestrates one authorization decision per guarded invocation:
/// resolve the target tenant, identify the principal, consult the policy.
///
/// Stateless and side-effect-free; every check hits the grant store fresh.
/// There are no retries — a denied or misconfigured call is never silently
/// retried, since a retry could race against a revoked grant.
pub struct Guard<S, D> {
    policy: AccessPolicy<S, D>,
}

impl<S, D> Guard<S, D>
where
    S: GrantStore,
    D: UserDirectory,
{
    pub fn new(policy: AccessPolicy<S, D>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy<S, D> {
        &self.policy
    }

    /// Decide whether `principal` may run `operation` with `args`.
    ///
    /// Returns the resolved tenant id on allow so the wrapped operation can
    /// reuse it without resolving twice.
    pub fn check(
        &self,
        principal: &Principal,
        operation: &OperationMetadata,
        args: &CallArgs,
    ) -> Result<TenantId, GuardError> {
        let tenant_id = resolve(operation.strategy(), args).map_err(|source| {
            error!(
                operation = operation.name(),
                error = %source,
                "tenant resolution failed; declared strategy does not match the call"
            );
            GuardError::Configuration {
                operation: operation.name().to_string(),
                source,
            }
        })?;

        let user_id = self
            .policy
            .directory()
            .find_by_principal(principal)
            .ok_or_else(|| {
                warn!(
                    principal = %principal,
                    operation = operation.name(),
                    "principal not found in user directory"
                );
                GuardError::UnknownPrincipal(principal.clone())
            })?;

        if self.policy.is_authorized(user_id, tenant_id) {
            debug!(
                principal = %principal,
                tenant_id = %tenant_id,
                operation = operation.name(),
                "access allowed"
            );
            Ok(tenant_id)
        } else {
            warn!(
                principal = %principal,
                tenant_id = %tenant_id,
                operation = operation.name(),
                "access denied"
            );
            Err(GuardError::AccessDenied {
                operation: operation.name().to_string(),
                tenant_id,
            })
        }
    }

    /// Run `f` only if the check allows it; its result is returned
    /// unchanged. On deny, `f` never executes.
    pub fn invoke<R>(
        &self,
        principal: &Principal,
        operation: &OperationMetadata,
        args: &CallArgs,
        f: impl FnOnce(TenantId) -> R,
    ) -> Result<R, GuardError> {
        let tenant_id = self.check(principal, operation, args)?;
        Ok(f(tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};

    use ledgerguard_core::UserId;

    use super::*;
    use crate::policy::InMemoryUserDirectory;
    use crate::resolve::ArgValue;
    use crate::store::InMemoryGrantStore;
    use crate::tenant::TenantScoped;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Fixture {
        guard: Guard<Arc<InMemoryGrantStore>, Arc<InMemoryUserDirectory>>,
        store: Arc<InMemoryGrantStore>,
        directory: Arc<InMemoryUserDirectory>,
    }

    fn fixture() -> Fixture {
        let store = InMemoryGrantStore::arc();
        let directory = Arc::new(InMemoryUserDirectory::new());
        let guard = Guard::new(AccessPolicy::new(store.clone(), directory.clone()));
        Fixture {
            guard,
            store,
            directory,
        }
    }

    #[test]
    fn granted_principal_runs_the_wrapped_operation() {
        let fx = fixture();
        let (user, tenant) = (UserId::new(), TenantId::new());
        fx.directory.insert(Principal::new("alice"), user);
        fx.store
            .grant(user, tenant, Principal::new("admin"), test_time())
            .unwrap();

        let op = OperationMetadata::param("list_accounts", "tenant_id");
        let args = CallArgs::new().arg("tenant_id", ArgValue::tenant(tenant));

        let calls = AtomicUsize::new(0);
        let result = fx
            .guard
            .invoke(&Principal::new("alice"), &op, &args, |resolved| {
                calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(resolved, tenant);
                "account listing"
            })
            .unwrap();

        assert_eq!(result, "account listing");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ungranted_principal_is_denied_and_operation_never_runs() {
        let fx = fixture();
        let (alice, bob) = (UserId::new(), UserId::new());
        let tenant = TenantId::new();
        fx.directory.insert(Principal::new("alice"), alice);
        fx.directory.insert(Principal::new("bob"), bob);
        fx.store
            .grant(alice, tenant, Principal::new("admin"), test_time())
            .unwrap();

        let op = OperationMetadata::param("list_accounts", "tenant_id");
        let args = CallArgs::new().arg("tenant_id", ArgValue::tenant(tenant));

        let calls = AtomicUsize::new(0);
        let err = fx
            .guard
            .invoke(&Principal::new("bob"), &op, &args, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();

        assert_eq!(
            err,
            GuardError::AccessDenied {
                operation: "list_accounts".to_string(),
                tenant_id: tenant,
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn misconfigured_operation_fails_distinctly_from_denial() {
        let fx = fixture();
        let user = UserId::new();
        fx.directory.insert(Principal::new("alice"), user);

        // declared to read "tenant_id" but the call has no such parameter
        let op = OperationMetadata::param("list_accounts", "tenant_id");
        let args = CallArgs::new().arg("page", ArgValue::Opaque);

        let calls = AtomicUsize::new(0);
        let err = fx
            .guard
            .invoke(&Principal::new("alice"), &op, &args, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();

        assert_eq!(
            err,
            GuardError::Configuration {
                operation: "list_accounts".to_string(),
                source: ResolveError::UnknownParameter("tenant_id".to_string()),
            }
        );
        assert!(!matches!(err, GuardError::AccessDenied { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_principal_is_its_own_error_kind() {
        let fx = fixture();
        let op = OperationMetadata::param("list_accounts", "tenant_id");
        let args = CallArgs::new().arg("tenant_id", ArgValue::tenant(TenantId::new()));

        let err = fx
            .guard
            .check(&Principal::new("ghost"), &op, &args)
            .unwrap_err();
        assert_eq!(err, GuardError::UnknownPrincipal(Principal::new("ghost")));
    }

    #[test]
    fn revocation_is_observed_on_the_next_call() {
        let fx = fixture();
        let (user, tenant) = (UserId::new(), TenantId::new());
        fx.directory.insert(Principal::new("alice"), user);
        fx.store
            .grant(user, tenant, Principal::new("admin"), test_time())
            .unwrap();

        let op = OperationMetadata::param("list_accounts", "tenant_id");
        let args = CallArgs::new().arg("tenant_id", ArgValue::tenant(tenant));
        let alice = Principal::new("alice");

        assert!(fx.guard.check(&alice, &op, &args).is_ok());

        fx.store
            .revoke(user, tenant, Principal::new("admin"), test_time())
            .unwrap();
        let err = fx.guard.check(&alice, &op, &args).unwrap_err();
        assert!(matches!(err, GuardError::AccessDenied { tenant_id, .. } if tenant_id == tenant));
    }

    #[test]
    fn infer_strategy_guards_operations_on_tenant_owned_objects() {
        struct Transaction {
            tenant_id: TenantId,
        }

        impl TenantScoped for Transaction {
            fn tenant_id(&self) -> TenantId {
                self.tenant_id
            }
        }

        let fx = fixture();
        let (user, tenant) = (UserId::new(), TenantId::new());
        fx.directory.insert(Principal::new("alice"), user);
        fx.store
            .grant(user, tenant, Principal::new("admin"), test_time())
            .unwrap();

        let op = OperationMetadata::infer("post_transaction");
        let args = CallArgs::new().arg(
            "transaction",
            ArgValue::scoped(Transaction { tenant_id: tenant }),
        );

        assert_eq!(fx.guard.check(&Principal::new("alice"), &op, &args).unwrap(), tenant);
    }

    #[test]
    fn dotted_path_strategy_guards_payload_operations_end_to_end() {
        use serde::Serialize;

        #[derive(Serialize)]
        struct CreateCustomer {
            tenant_id: TenantId,
            name: String,
        }

        let fx = fixture();
        let (user, tenant) = (UserId::new(), TenantId::new());
        fx.directory.insert(Principal::new("alice"), user);
        fx.store
            .grant(user, tenant, Principal::new("admin"), test_time())
            .unwrap();

        let op = OperationMetadata::path("create_customer", "request.tenant_id").unwrap();
        let request = CreateCustomer {
            tenant_id: tenant,
            name: "ACME GmbH".to_string(),
        };
        let args = CallArgs::new().arg("request", ArgValue::payload(&request).unwrap());

        let created = fx
            .guard
            .invoke(&Principal::new("alice"), &op, &args, |resolved| resolved)
            .unwrap();
        assert_eq!(created, tenant);
    }
}
