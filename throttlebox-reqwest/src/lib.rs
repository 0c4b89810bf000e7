#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod global;
mod transport;

pub use global::{ReqwestGovernor, global};
pub use transport::ReqwestTransport;

// Re-export common types
pub use throttlebox::{FetchError, Governor, GovernorConfig, Payload};
