use ledgerguard_core::TenantId;

/// Capability trait for business objects that know their owning tenant.
///
/// Implement this on any domain type (transaction, allocation template, ...)
/// whose instances belong to a tenant. The resolver's `infer` strategy scans
/// call arguments for the first value exposing this capability, so operations
/// that take a tenant-owned object need no explicit tenant parameter.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}
