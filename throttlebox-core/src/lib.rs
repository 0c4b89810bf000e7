#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod transport;

pub use entry::{CacheEntry, DEFAULT_TTL};
pub use error::{FailureKind, FetchError, TransportError};
pub use transport::{Transport, TransportResponse};
