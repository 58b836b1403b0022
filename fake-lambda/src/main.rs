use clap::{Args, Parser, Subcommand};
use lambda_api::FakeLambdaApi;
use registry::FunctionDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod config;
mod observability;

#[derive(Parser)]
#[command(name = "fake-lambda", about = "Local stand-in for the Lambda ListFunctions API")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the fake Lambda API until interrupted
    Serve(ServeArgs),
    /// Write a list of functions into the configured store for one tenant
    Cache(CacheArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    config: PathBuf,
}

#[derive(Args)]
struct CacheArgs {
    #[arg(long)]
    config: PathBuf,
    #[arg(long)]
    identity: String,
    #[arg(long)]
    region: String,
    /// JSON file holding either an array of functions or a ListFunctions response
    #[arg(long)]
    file: PathBuf,
}

impl CliCommand {
    fn config_path(&self) -> &Path {
        match self {
            CliCommand::Serve(args) => &args.config,
            CliCommand::Cache(args) => &args.config,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Observability(#[from] observability::ObservabilityError),
    #[error(transparent)]
    FakeLambda(#[from] lambda_api::FakeLambdaError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse functions file: {0}")]
    FunctionsFile(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FunctionsFile {
    List(Vec<FunctionDescriptor>),
    Response {
        #[serde(rename = "Functions")]
        functions: Vec<FunctionDescriptor>,
    },
}

impl FunctionsFile {
    fn into_functions(self) -> Vec<FunctionDescriptor> {
        match self {
            FunctionsFile::List(functions) => functions,
            FunctionsFile::Response { functions } => functions,
        }
    }
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = config::Config::from_file(cli.command.config_path())?;

    let _sentry = observability::init_logging(&config.logging)?;
    if let Some(metrics) = &config.metrics {
        observability::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = rt.block_on(async move {
        match cli.command {
            CliCommand::Serve(_) => serve(config.lambda).await,
            CliCommand::Cache(args) => cache(config.lambda, args).await,
        }
    });

    if let Err(e) = &result {
        tracing::error!(error = %e, "fake-lambda failed");
    }
    result
}

async fn serve(config: lambda_api::Config) -> Result<(), CliError> {
    let mut api = FakeLambdaApi::new(config);
    api.bootstrap().await?;
    tracing::info!(endpoint = ?api.host_port(), "Ready, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    api.stop().await?;
    Ok(())
}

async fn cache(config: lambda_api::Config, args: CacheArgs) -> Result<(), CliError> {
    let contents = tokio::fs::read(&args.file).await?;
    let functions = serde_json::from_slice::<FunctionsFile>(&contents)?.into_functions();

    let api = FakeLambdaApi::new(config);
    api.cache_functions(&args.identity, &args.region, &functions)
        .await?;

    tracing::info!(
        identity = %args.identity,
        region = %args.region,
        functions = functions.len(),
        "Cached functions"
    );
    Ok(())
}
