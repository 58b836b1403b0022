pub mod config;
pub mod metrics_defs;
pub mod registry;
pub mod store;
pub mod types;

pub use registry::{FunctionRegistry, SeedFailure, SeedReport};
pub use store::{FilesystemFunctionStore, FunctionStore, NoopFunctionStore, StoreError};
pub use types::{DEFAULT_IDENTITY, DEFAULT_REGION, FunctionDescriptor, TenantKey};
