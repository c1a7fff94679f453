//! Target resolution: locating the tenant id a call is about to touch.
//!
//! Protected operations differ wildly in shape: a bare tenant-id parameter,
//! a nested request payload, or a domain object that already knows its own
//! tenant. Each operation declares one [`ResolutionStrategy`] and the guard
//! stays strategy-agnostic. Resolution failures are configuration errors,
//! never silent passes: an operation whose target cannot be resolved must
//! not execute.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use ledgerguard_core::{DomainError, TenantId};

use crate::tenant::TenantScoped;

/// A single call argument, as seen by the resolver.
///
/// Callers describe each argument by what it can contribute to resolution;
/// arguments that carry no tenant information (paging, flags, ...) are
/// [`ArgValue::Opaque`] and only participate in name lookups.
pub enum ArgValue {
    /// A bare tenant id parameter.
    Tenant(TenantId),
    /// A structured request payload; dotted paths traverse its fields.
    Payload(Value),
    /// A domain object exposing its owning tenant ([`TenantScoped`]).
    Scoped(Arc<dyn TenantScoped + Send + Sync>),
    /// An argument that cannot contribute a tenant id.
    Opaque,
}

impl ArgValue {
    pub fn tenant(id: TenantId) -> Self {
        Self::Tenant(id)
    }

    /// Serialize a request object into a traversable payload.
    pub fn payload<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Payload(serde_json::to_value(value)?))
    }

    pub fn scoped<T>(value: T) -> Self
    where
        T: TenantScoped + Send + Sync + 'static,
    {
        Self::Scoped(Arc::new(value))
    }
}

impl core::fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArgValue::Tenant(id) => f.debug_tuple("Tenant").field(id).finish(),
            ArgValue::Payload(value) => f.debug_tuple("Payload").field(value).finish(),
            ArgValue::Scoped(scoped) => {
                f.debug_tuple("Scoped").field(&scoped.tenant_id()).finish()
            }
            ArgValue::Opaque => f.write_str("Opaque"),
        }
    }
}

/// The named arguments of one invocation, in declaration order.
///
/// Order matters: the `infer` strategy scans arguments first to last.
#[derive(Debug, Default)]
pub struct CallArgs {
    args: Vec<(Cow<'static, str>, ArgValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, name: impl Into<Cow<'static, str>>, value: ArgValue) -> Self {
        self.args.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.args.iter().map(|(n, v)| (n.as_ref(), v))
    }
}

/// A dotted field path (`"request.tenant_id"`), parsed once at the point an
/// operation is declared so malformed paths fail at registration time, not
/// inside a live authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    param: String,
    fields: Vec<String>,
}

impl FieldPath {
    /// Parameter name the path is rooted at.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Field chain applied to the root argument.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The original dotted form, for error messages.
    pub fn dotted(&self) -> String {
        let mut out = self.param.clone();
        for field in &self.fields {
            out.push('.');
            out.push_str(field);
        }
        out
    }
}

impl FromStr for FieldPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('.').collect();
        if segments.len() < 2 {
            return Err(DomainError::validation(format!(
                "field path '{s}' must name a parameter and at least one field"
            )));
        }
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(DomainError::validation(format!(
                "field path '{s}' contains an empty segment"
            )));
        }
        Ok(Self {
            param: segments[0].to_string(),
            fields: segments[1..].iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// How a protected operation's target tenant id is located among its
/// arguments. Declared statically per operation; never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// A named parameter holds the tenant id directly.
    Param(Cow<'static, str>),
    /// A named parameter holds a payload; follow the field chain into it.
    Path(FieldPath),
    /// Scan arguments in order for the first [`TenantScoped`] value.
    Infer,
}

impl ResolutionStrategy {
    pub fn param(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Param(name.into())
    }

    /// Parse a dotted path (`"request.tenant_id"`). Fails at registration
    /// time if the path is malformed.
    pub fn path(dotted: &str) -> Result<Self, DomainError> {
        Ok(Self::Path(dotted.parse()?))
    }
}

/// Resolution failure.
///
/// Every variant is a configuration error: the declared strategy does not
/// match the operation's actual call shape. None of these may be downgraded
/// to "access denied" — an unresolvable target aborts the call loudly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The strategy names a parameter the call does not have.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A field along the path is absent or its parent is not traversable.
    #[error("could not access field '{field}' in path '{path}'")]
    PropertyAccess { path: String, field: String },

    /// The resolved value is not a tenant id.
    #[error("value at '{at}' is not a tenant id")]
    TypeMismatch { at: String },

    /// `infer` found no argument exposing a tenant id.
    #[error("no argument exposes a tenant id")]
    NoResolvableTarget,
}

/// Extract the tenant id an invocation targets, per its declared strategy.
pub fn resolve(strategy: &ResolutionStrategy, args: &CallArgs) -> Result<TenantId, ResolveError> {
    match strategy {
        ResolutionStrategy::Param(name) => {
            let arg = args
                .get(name)
                .ok_or_else(|| ResolveError::UnknownParameter(name.to_string()))?;
            match arg {
                ArgValue::Tenant(id) => Ok(*id),
                ArgValue::Payload(value) => coerce_tenant_id(value)
                    .ok_or_else(|| ResolveError::TypeMismatch { at: name.to_string() }),
                _ => Err(ResolveError::TypeMismatch {
                    at: name.to_string(),
                }),
            }
        }
        ResolutionStrategy::Path(path) => {
            let root = args
                .get(path.param())
                .ok_or_else(|| ResolveError::UnknownParameter(path.param().to_string()))?;
            let ArgValue::Payload(root) = root else {
                // only payloads have addressable fields
                return Err(ResolveError::PropertyAccess {
                    path: path.dotted(),
                    field: path.fields()[0].clone(),
                });
            };
            let mut current = root;
            for field in path.fields() {
                current = match current {
                    Value::Object(map) => {
                        map.get(field).ok_or_else(|| ResolveError::PropertyAccess {
                            path: path.dotted(),
                            field: field.clone(),
                        })?
                    }
                    _ => {
                        return Err(ResolveError::PropertyAccess {
                            path: path.dotted(),
                            field: field.clone(),
                        });
                    }
                };
            }
            coerce_tenant_id(current).ok_or_else(|| ResolveError::TypeMismatch {
                at: path.dotted(),
            })
        }
        ResolutionStrategy::Infer => {
            for (_, arg) in args.iter() {
                if let ArgValue::Scoped(scoped) = arg {
                    return Ok(scoped.tenant_id());
                }
            }
            Err(ResolveError::NoResolvableTarget)
        }
    }
}

/// A tenant id inside a payload is its serde-transparent form: a UUID string.
fn coerce_tenant_id(value: &Value) -> Option<TenantId> {
    match value {
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
