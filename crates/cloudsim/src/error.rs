//! Simulation errors.

use thiserror::Error;

use crate::core::common::AllocationVerdict;

/// Errors reported by the cloud model.
///
/// Conditions expected during normal operation, such as a provisioner lacking capacity,
/// are reported as `bool` or [`AllocationVerdict`] values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Rejected parameter of host, VM, cloudlet or simulation config.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No host can accommodate the VM.
    #[error("no suitable host for vm {vm_id}: {reason}")]
    PlacementFailure { vm_id: u32, reason: AllocationVerdict },

    /// Lookup of unknown object.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },
}

pub type SimResult<T> = Result<T, SimError>;

pub(crate) fn invalid<T>(msg: impl Into<String>) -> SimResult<T> {
    Err(SimError::InvalidConfiguration(msg.into()))
}
