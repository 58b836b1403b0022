use std::fmt;
use std::hash::{Hash, Hasher};

/// Metadata for a single function. The shape is owned by whoever produced it,
/// so it is stored and returned verbatim.
pub type FunctionDescriptor = serde_json::Value;

pub const DEFAULT_IDENTITY: &str = "default";
pub const DEFAULT_REGION: &str = "us-east-1";

const SEPARATOR: &str = "::";

/// The (identity, region) pair functions are registered under.
///
/// Equality and hashing follow the canonical `identity::region` form, so two
/// keys are equal exactly when their canonical strings are.
#[derive(Clone, Debug)]
pub struct TenantKey {
    identity: String,
    region: String,
}

impl TenantKey {
    pub fn new<I, R>(identity: I, region: R) -> Self
    where
        I: Into<String>,
        R: Into<String>,
    {
        TenantKey {
            identity: identity.into(),
            region: region.into(),
        }
    }

    /// The tenant used when a request carries no usable identity.
    pub fn default_tenant() -> Self {
        TenantKey::new(DEFAULT_IDENTITY, DEFAULT_REGION)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn canonical(&self) -> String {
        format!("{}{SEPARATOR}{}", self.identity, self.region)
    }

    pub fn is_default(&self) -> bool {
        *self == TenantKey::default_tenant()
    }

    fn canonical_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.identity
            .bytes()
            .chain(SEPARATOR.bytes())
            .chain(self.region.bytes())
    }
}

impl PartialEq for TenantKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_bytes().eq(other.canonical_bytes())
    }
}

impl Eq for TenantKey {}

impl Hash for TenantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.identity, self.region)
    }
}
