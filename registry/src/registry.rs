use crate::metrics_defs::{POPULATE_CALLS, SEED_DURATION, SEED_FAILURES};
use crate::store::{FunctionStore, StoreError};
use crate::types::{FunctionDescriptor, TenantKey};
use parking_lot::RwLock;
use shared::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// In-memory function lists per tenant, keyed by the canonical tenant string.
///
/// Entries are only ever appended to. Cloning yields another handle to the
/// same registry.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: Arc<RwLock<HashMap<String, Vec<FunctionDescriptor>>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `descriptors` to the list stored for (identity, region).
    pub fn populate(&self, identity: &str, region: &str, descriptors: Vec<FunctionDescriptor>) {
        self.populate_tenant(&TenantKey::new(identity, region), descriptors);
    }

    pub fn populate_tenant(&self, tenant: &TenantKey, descriptors: Vec<FunctionDescriptor>) {
        let added = descriptors.len();
        self.functions
            .write()
            .entry(tenant.canonical())
            .or_default()
            .extend(descriptors);

        counter!(POPULATE_CALLS).increment(1);
        tracing::debug!(%tenant, added, "Populated functions");
    }

    /// Returns a copy of the functions for (identity, region), falling back to
    /// the default tenant's functions and then to an empty list.
    pub fn lookup(&self, identity: &str, region: &str) -> Vec<FunctionDescriptor> {
        self.lookup_tenant(&TenantKey::new(identity, region))
    }

    pub fn lookup_tenant(&self, tenant: &TenantKey) -> Vec<FunctionDescriptor> {
        let read_guard = self.functions.read();
        read_guard
            .get(&tenant.canonical())
            .or_else(|| read_guard.get(&TenantKey::default_tenant().canonical()))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a copy of the functions stored for exactly `tenant`, without
    /// falling back to the default tenant.
    pub fn get(&self, tenant: &TenantKey) -> Option<Vec<FunctionDescriptor>> {
        self.functions.read().get(&tenant.canonical()).cloned()
    }

    pub fn tenant_count(&self) -> usize {
        self.functions.read().len()
    }

    /// Populates the registry with every tenant persisted in `store`.
    ///
    /// A tenant that fails to load is recorded in the report and skipped; only
    /// a failure to list the store's tenants aborts the pass.
    pub async fn seed_from(&self, store: &dyn FunctionStore) -> Result<SeedReport, StoreError> {
        let started = Instant::now();
        let tenants = store.tenants().await?;
        let mut report = SeedReport::default();

        for tenant in tenants {
            match store.load(&tenant).await {
                Ok(functions) => {
                    self.populate_tenant(&tenant, functions);
                    report.loaded.push(tenant);
                }
                Err(error) => {
                    tracing::warn!(%tenant, %error, "Failed to seed tenant from store");
                    counter!(SEED_FAILURES).increment(1);
                    report.failures.push(SeedFailure { tenant, error });
                }
            }
        }

        histogram!(SEED_DURATION).record(started.elapsed().as_secs_f64());
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "Seeded function registry"
        );

        Ok(report)
    }
}

#[derive(Debug)]
pub struct SeedFailure {
    pub tenant: TenantKey,
    pub error: StoreError,
}

/// Outcome of a seed pass.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub loaded: Vec<TenantKey>,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
