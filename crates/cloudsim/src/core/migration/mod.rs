//! Dynamic VM consolidation: utilization tracking, overload detection and selection of VMs to migrate.

pub mod overload_detector;
pub mod policy;
pub mod stats;
pub mod utilization_history;
pub mod vm_selection;
