use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::errors::{FakeLambdaError, Result};
use registry::{FunctionDescriptor, FunctionRegistry, FunctionStore, SeedReport, TenantKey};
use shared::http::serve_http_service;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningServer {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

/// A local stand-in for the Lambda management API.
///
/// Each instance owns its own registry, so several can run side by side in
/// one process. Dropping a running instance also shuts its listener down.
pub struct FakeLambdaApi {
    config: Config,
    registry: FunctionRegistry,
    store: Arc<dyn FunctionStore>,
    server: Option<RunningServer>,
}

impl FakeLambdaApi {
    pub fn new(config: Config) -> Self {
        let store = config.store.build();
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn FunctionStore>) -> Self {
        Self {
            config,
            registry: FunctionRegistry::new(),
            store,
            server: None,
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Seeds from the store if configured to, then starts listening.
    pub async fn bootstrap(&mut self) -> Result<SocketAddr> {
        if self.config.seed_on_start {
            let report = self.seed_from_cache().await?;
            if !report.is_complete() {
                tracing::warn!(
                    failed = report.failures.len(),
                    "Some tenants could not be seeded"
                );
            }
        }
        self.start().await
    }

    /// Binds the configured listener and starts serving in the background.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(server) = &self.server {
            return Err(FakeLambdaError::AlreadyRunning(server.local_addr));
        }
        self.config.validate()?;

        let listener = &self.config.listener;
        let tcp_listener = TcpListener::bind((listener.host.as_str(), listener.port)).await?;
        let local_addr = tcp_listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let dispatcher = Dispatcher::new(self.registry.clone());
        let handle = tokio::spawn(serve_http_service(tcp_listener, dispatcher, async move {
            // Also resolves when the sender is dropped
            let _ = shutdown_rx.await;
        }));

        tracing::info!(%local_addr, "Fake Lambda API listening");

        self.server = Some(RunningServer {
            local_addr,
            shutdown_tx,
            handle,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections, releases the socket and waits for open
    /// connections to close. Does nothing if the server is not running.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(server) = self.server.take() else {
            return Ok(());
        };

        let _ = server.shutdown_tx.send(());
        server
            .handle
            .await
            .map_err(|e| FakeLambdaError::ServerTask(e.to_string()))??;

        tracing::info!(local_addr = %server.local_addr, "Fake Lambda API stopped");
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.local_addr)
    }

    /// The `host:port` endpoint clients should use, with the configured host
    /// name and the bound port.
    pub fn host_port(&self) -> Option<String> {
        self.local_addr()
            .map(|addr| format!("{}:{}", self.config.listener.host, addr.port()))
    }

    pub fn populate(&self, identity: &str, region: &str, descriptors: Vec<FunctionDescriptor>) {
        self.registry.populate(identity, region, descriptors);
    }

    /// Loads every tenant persisted in the store into the registry.
    pub async fn seed_from_cache(&self) -> Result<SeedReport> {
        Ok(self.registry.seed_from(self.store.as_ref()).await?)
    }

    /// Persists `descriptors` as the cached function list for (identity, region).
    pub async fn cache_functions(
        &self,
        identity: &str,
        region: &str,
        descriptors: &[FunctionDescriptor],
    ) -> Result<()> {
        let tenant = TenantKey::new(identity, region);
        self.store.store(&tenant, descriptors).await?;
        Ok(())
    }

    /// Persists the functions currently registered for exactly (identity, region).
    ///
    /// Fails with [`FakeLambdaError::UnknownTenant`] if nothing was ever
    /// populated for it; the store is left untouched.
    pub async fn cache_tenant(&self, identity: &str, region: &str) -> Result<()> {
        let tenant = TenantKey::new(identity, region);
        let Some(functions) = self.registry.get(&tenant) else {
            return Err(FakeLambdaError::UnknownTenant(tenant));
        };
        self.store.store(&tenant, &functions).await?;
        Ok(())
    }
}
