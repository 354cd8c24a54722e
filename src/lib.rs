pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::AwsServiceProvider;
#[cfg(feature = "cli")]
pub use config::Cli;
pub use config::{FrameworkSettings, HandlerKind, LambdaConfig};
pub use utils::error::{FrameworkError, Result};
