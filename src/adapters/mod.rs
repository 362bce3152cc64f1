// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod memory;

#[cfg(feature = "aws")]
pub mod dynamodb;
#[cfg(feature = "aws")]
pub mod sns;
#[cfg(feature = "aws")]
pub mod ssm;
