// Adapters layer: AWS SDK implementations of the domain ports.

pub mod aws;

pub use aws::AwsServiceProvider;
