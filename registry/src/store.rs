//! Persistence for per-tenant function lists, so a registry can be seeded
//! from a copy written by an earlier run.
use crate::config::Compression;
use crate::types::{FunctionDescriptor, TenantKey};
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tenant component: {0:?}")]
    InvalidTenant(String),
}

#[async_trait]
pub trait FunctionStore: Send + Sync {
    /// Every tenant that currently has a persisted function list.
    async fn tenants(&self) -> Result<Vec<TenantKey>, StoreError>;

    async fn load(&self, tenant: &TenantKey) -> Result<Vec<FunctionDescriptor>, StoreError>;

    /// Replaces the persisted function list for `tenant`.
    async fn store(
        &self,
        tenant: &TenantKey,
        functions: &[FunctionDescriptor],
    ) -> Result<(), StoreError>;
}

struct Codec {
    compression: Compression,
}

impl Codec {
    fn new(compression: Compression) -> Self {
        Codec { compression }
    }

    fn extension(&self) -> &'static str {
        match self.compression.zstd_level() {
            None => "json",
            Some(_) => "json.zst",
        }
    }

    fn encode(&self, functions: &[FunctionDescriptor]) -> Result<Vec<u8>, StoreError> {
        let json = serde_json::to_vec(functions)?;
        match self.compression.zstd_level() {
            None => Ok(json),
            Some(level) => Ok(zstd::stream::encode_all(json.as_slice(), level)?),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<FunctionDescriptor>, StoreError> {
        match self.compression.zstd_level() {
            None => Ok(serde_json::from_slice(bytes)?),
            Some(_) => {
                let json = zstd::stream::decode_all(bytes)?;
                Ok(serde_json::from_slice(&json)?)
            }
        }
    }
}

/// Store that never has anything persisted. Writes are dropped.
pub struct NoopFunctionStore;

#[async_trait]
impl FunctionStore for NoopFunctionStore {
    async fn tenants(&self) -> Result<Vec<TenantKey>, StoreError> {
        Ok(Vec::new())
    }

    async fn load(&self, _tenant: &TenantKey) -> Result<Vec<FunctionDescriptor>, StoreError> {
        Ok(Vec::new())
    }

    async fn store(
        &self,
        tenant: &TenantKey,
        _functions: &[FunctionDescriptor],
    ) -> Result<(), StoreError> {
        tracing::warn!(%tenant, "Discarding functions written to the no-op store");
        Ok(())
    }
}

/// Keeps one file per tenant at `<base_dir>/<identity>/<region>.json`
/// (`.json.zst` when compressed).
pub struct FilesystemFunctionStore {
    base_dir: PathBuf,
    codec: Codec,
}

impl FilesystemFunctionStore {
    pub fn new<P: AsRef<Path>>(base_dir: P, compression: Compression) -> Self {
        FilesystemFunctionStore {
            base_dir: base_dir.as_ref().to_path_buf(),
            codec: Codec::new(compression),
        }
    }

    fn tenant_path(&self, tenant: &TenantKey) -> Result<PathBuf, StoreError> {
        validate_component(tenant.identity())?;
        validate_component(tenant.region())?;

        Ok(self.base_dir.join(tenant.identity()).join(format!(
            "{}.{}",
            tenant.region(),
            self.codec.extension()
        )))
    }
}

// Identity and region become path components, so they must not escape the base dir.
fn validate_component(value: &str) -> Result<(), StoreError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(StoreError::InvalidTenant(value.to_string()));
    }
    Ok(())
}

async fn list_regions(identity_dir: &Path, suffix: &str) -> io::Result<Vec<String>> {
    let mut regions = Vec::new();
    let mut entries = tokio::fs::read_dir(identity_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        if let Some(region) = file_name.to_str().and_then(|name| name.strip_suffix(suffix))
            && !region.is_empty()
        {
            regions.push(region.to_string());
        }
    }
    Ok(regions)
}

#[async_trait]
impl FunctionStore for FilesystemFunctionStore {
    async fn tenants(&self) -> Result<Vec<TenantKey>, StoreError> {
        let mut identities = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", self.codec.extension());
        let mut tenants = Vec::new();

        while let Some(identity_entry) = identities.next_entry().await? {
            let identity_path = identity_entry.path();
            // Follows symlinks, so a linked identity directory is listed like any other
            match tokio::fs::metadata(&identity_path).await {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => continue,
                Err(error) => {
                    tracing::warn!(path = ?identity_path, %error, "Skipping unreadable identity entry");
                    continue;
                }
            }
            let Some(identity) = identity_entry.file_name().to_str().map(String::from) else {
                tracing::warn!(path = ?identity_path, "Skipping non UTF-8 identity directory");
                continue;
            };

            match list_regions(&identity_path, &suffix).await {
                Ok(regions) => tenants.extend(
                    regions
                        .into_iter()
                        .map(|region| TenantKey::new(identity.clone(), region)),
                ),
                Err(error) => {
                    tracing::warn!(path = ?identity_path, %error, "Skipping unreadable identity directory");
                }
            }
        }

        tenants.sort_by_key(TenantKey::canonical);
        Ok(tenants)
    }

    async fn load(&self, tenant: &TenantKey) -> Result<Vec<FunctionDescriptor>, StoreError> {
        let path = self.tenant_path(tenant)?;
        let bytes = tokio::fs::read(&path).await?;
        self.codec.decode(&bytes)
    }

    async fn store(
        &self,
        tenant: &TenantKey,
        functions: &[FunctionDescriptor],
    ) -> Result<(), StoreError> {
        let path = self.tenant_path(tenant)?;
        let bytes = self.codec.encode(functions)?;

        let parent = path.parent().unwrap_or(&self.base_dir).to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        // Each write gets its own temp file next to the target, then replaces it atomically
        let target = path.clone();
        let len = bytes.len();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        tracing::debug!(
            %tenant,
            path = %path.display(),
            functions = functions.len(),
            bytes = len,
            "Stored functions"
        );

        Ok(())
    }
}
