#[cfg(feature = "cli")]
pub mod cli;
pub mod lambda;
pub mod settings;

#[cfg(feature = "cli")]
pub use cli::Cli;
pub use lambda::{HandlerKind, LambdaConfig};
pub use settings::{FrameworkSettings, WaitPolicy};
