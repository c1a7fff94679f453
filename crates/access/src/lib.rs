//! `ledgerguard-access` — the tenant-access boundary of the ledger backend.
//!
//! Every business record belongs to exactly one tenant (legal entity); this
//! crate decides, before any side effect, whether the acting principal may
//! touch the tenant a call targets. It is intentionally decoupled from HTTP
//! and storage: callers thread the current principal in explicitly and plug
//! in their own [`GrantStore`] / [`UserDirectory`] implementations.

pub mod grant;
pub mod guard;
pub mod operation;
pub mod policy;
pub mod resolve;
pub mod store;
pub mod tenant;

pub use grant::{AccessGrant, Principal};
pub use guard::{Guard, GuardError};
pub use operation::OperationMetadata;
pub use policy::{AccessPolicy, InMemoryUserDirectory, UserDirectory};
pub use resolve::{ArgValue, CallArgs, FieldPath, ResolutionStrategy, ResolveError, resolve};
pub use store::{GrantError, GrantStore, InMemoryGrantStore};
pub use tenant::TenantScoped;
