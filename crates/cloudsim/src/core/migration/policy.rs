//! Consolidation settings of a datacenter.

use crate::core::config::sim_config::MigrationConfig;
use crate::core::migration::overload_detector::{overload_detector_resolver, OverloadDetector};
use crate::core::migration::vm_selection::{vm_selection_resolver, MinimumMigrationTime, VmSelectionPolicy};
use crate::error::{invalid, SimResult};

pub const DEFAULT_UNDERLOAD_THRESHOLD: f64 = 0.3;

/// Combination of overload detector, VM selection policy and underload threshold
/// used by datacenter to consolidate VMs once per scheduling interval.
pub struct MigrationPolicy {
    pub detector: OverloadDetector,
    pub selection: Box<dyn VmSelectionPolicy>,
    pub underload_threshold: f64,
}

impl MigrationPolicy {
    pub fn new(detector: OverloadDetector, selection: Box<dyn VmSelectionPolicy>, underload_threshold: f64) -> Self {
        Self {
            detector,
            selection,
            underload_threshold,
        }
    }

    pub fn from_config(config: &MigrationConfig) -> SimResult<Self> {
        let detector = match &config.overload_detector {
            Some(s) => overload_detector_resolver(s)?,
            None => OverloadDetector::default(),
        };
        let selection = match &config.vm_selection {
            Some(s) => vm_selection_resolver(s)?,
            None => Box::new(MinimumMigrationTime),
        };
        let underload_threshold = config.underload_threshold.unwrap_or(DEFAULT_UNDERLOAD_THRESHOLD);
        if !(0. ..=1.).contains(&underload_threshold) {
            return invalid(format!("underload threshold must be in [0, 1], got {}", underload_threshold));
        }
        Ok(Self::new(detector, selection, underload_threshold))
    }

    pub fn is_underloaded(&self, utilization: f64) -> bool {
        utilization < self.underload_threshold
    }
}
