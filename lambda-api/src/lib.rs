pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod identity;
pub mod metrics_defs;
pub mod server;

pub use config::Config;
pub use errors::{FakeLambdaError, Result};
pub use server::FakeLambdaApi;
