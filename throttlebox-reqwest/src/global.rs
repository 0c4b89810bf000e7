//! Process-wide governor instance.

use lazy_static::lazy_static;
use throttlebox::Governor;

use crate::transport::ReqwestTransport;

/// Governor over the reqwest transport.
pub type ReqwestGovernor = Governor<ReqwestTransport>;

lazy_static! {
    static ref GLOBAL: ReqwestGovernor = Governor::new(ReqwestTransport::new());
}

/// The governor shared by the whole process.
///
/// Created on first use with the default limits and kept for the lifetime of
/// the process, so every caller goes through the same cache, queue and rate
/// gate.
pub fn global() -> &'static ReqwestGovernor {
    &GLOBAL
}
