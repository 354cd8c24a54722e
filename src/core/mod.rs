pub mod actions;
pub mod artifacts;
pub mod custom_resource;
pub mod framework_config;
pub mod installer;
pub mod job;
pub mod nuke;
pub mod organization;
pub mod parameters;
pub mod poller;
pub mod repository;
pub mod stack;
pub mod stack_set;
pub mod teardown;

pub use crate::domain::model::{CleanupResult, JobOutcome, OperationPhase};
pub use crate::domain::ports::{Scope, ServiceProvider};
pub use crate::utils::error::Result;
pub use job::{run_job, CodePipelineEvent, PipelineAction};
pub use poller::{advance, LongRunningOperation, OperationState};
