//! Per-operation authorization metadata.

use std::borrow::Cow;

use ledgerguard_core::DomainError;

use crate::resolve::ResolutionStrategy;

/// Declarative metadata attached to a protected operation.
///
/// Declared once, where the operation is defined, and never mutated at
/// runtime. The `name` is used for audit logging and error reporting only;
/// the `strategy` tells the resolver where the target tenant id lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMetadata {
    name: Cow<'static, str>,
    strategy: ResolutionStrategy,
}

impl OperationMetadata {
    pub fn new(name: impl Into<Cow<'static, str>>, strategy: ResolutionStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }

    /// Operation whose tenant id sits in a named scalar parameter.
    pub fn param(
        name: impl Into<Cow<'static, str>>,
        param: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(name, ResolutionStrategy::param(param))
    }

    /// Operation whose tenant id sits behind a dotted path into a payload
    /// parameter. The path is validated here, at registration time.
    pub fn path(
        name: impl Into<Cow<'static, str>>,
        dotted: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(name, ResolutionStrategy::path(dotted)?))
    }

    /// Operation whose tenant id is inferred from a [`TenantScoped`]
    /// argument.
    ///
    /// [`TenantScoped`]: crate::tenant::TenantScoped
    pub fn infer(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ResolutionStrategy::Infer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &ResolutionStrategy {
        &self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_constructor_rejects_malformed_paths_at_declaration() {
        assert!(OperationMetadata::path("create_transaction", "request.tenant_id").is_ok());
        assert!(OperationMetadata::path("create_transaction", "request").is_err());
        assert!(OperationMetadata::path("create_transaction", "").is_err());
    }
}
