//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::migration::overload_detector::overload_detector_resolver;
use crate::core::migration::utilization_history::DEFAULT_HISTORY_LENGTH;
use crate::core::migration::vm_selection::vm_selection_resolver;
use crate::core::vm_placement_algorithm::placement_algorithm_resolver;
use crate::core::vm_scheduler::VmSchedulingPolicy;
use crate::error::{invalid, SimResult};

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub scheduling_interval: Option<f64>,
    pub message_delay: Option<f64>,
    pub min_time_between_events: Option<f64>,
    pub vm_creation_retry_delay: Option<f64>,
    pub vm_creation_max_retries: Option<u32>,
    pub retry_backoff: Option<BackoffPolicy>,
    pub vm_migration_overhead: Option<f64>,
    pub migration_bandwidth_share: Option<f64>,
    pub utilization_history_length: Option<usize>,
    pub vm_destruction_delay: Option<f64>,
    pub terminate_at: Option<f64>,
    pub vm_allocation: Option<String>,
    pub migration: Option<MigrationConfig>,
    pub hosts: Option<Vec<HostConfig>>,
}

/// Delay policy for retrying failed VM creation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BackoffPolicy {
    /// Each retry happens after `vm_creation_retry_delay`.
    Fixed,
    /// The delay is multiplied by `factor` after each retry round.
    Exponential { factor: f64 },
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Number of host PEs.
    pub pes: u32,
    /// Capacity of each PE in MIPS.
    pub pe_mips: f64,
    /// RAM capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Distribution of host PEs among VMs, time-shared by default.
    pub vm_scheduler: Option<VmSchedulingPolicy>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl HostConfig {
    /// Names of hosts described by this config, `None` entries should get generated names.
    pub fn host_names(&self) -> Vec<Option<String>> {
        let count = self.count.unwrap_or(1);
        (0..count)
            .map(|i| match (&self.name, &self.name_prefix) {
                (_, Some(prefix)) => Some(format!("{}{}", prefix, i)),
                (Some(name), None) if count == 1 => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Holds configuration of dynamic VM consolidation.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Overload detector, e.g. `Mad[safety=2.5,fallback=0.7]`.
    pub overload_detector: Option<String>,
    /// VM selection policy, e.g. `MinimumMigrationTime`.
    pub vm_selection: Option<String>,
    /// Hosts with CPU utilization below this value are drained.
    pub underload_threshold: Option<f64>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Period in seconds of utilization sampling and VM consolidation in datacenters.
    pub scheduling_interval: f64,
    /// Delay in seconds of messages between brokers and datacenters.
    pub message_delay: f64,
    /// Minimal delay between consecutive recomputations of cloudlet processing.
    pub min_time_between_events: f64,
    /// Delay in seconds before retrying failed VM creation.
    pub vm_creation_retry_delay: f64,
    /// Number of retry rounds over all datacenters before VM is considered failed.
    pub vm_creation_max_retries: u32,
    /// Growth of delay between retry rounds.
    pub retry_backoff: BackoffPolicy,
    /// Fraction of VM CPU request granted on the destination host during migration.
    pub vm_migration_overhead: f64,
    /// Fraction of destination host bandwidth used for VM migration.
    pub migration_bandwidth_share: f64,
    /// Number of utilization samples kept for each VM.
    pub utilization_history_length: usize,
    /// Idle time after which broker destroys VM, VMs are kept until all work is done if not set.
    pub vm_destruction_delay: Option<f64>,
    /// Simulation time limit.
    pub terminate_at: Option<f64>,
    /// VM placement algorithm used by datacenters.
    pub vm_allocation: String,
    /// Dynamic VM consolidation, disabled if not set.
    pub migration: Option<MigrationConfig>,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            scheduling_interval: raw.scheduling_interval.unwrap_or(300.),
            message_delay: raw.message_delay.unwrap_or(0.),
            min_time_between_events: raw.min_time_between_events.unwrap_or(0.001),
            vm_creation_retry_delay: raw.vm_creation_retry_delay.unwrap_or(10.),
            vm_creation_max_retries: raw.vm_creation_max_retries.unwrap_or(3),
            retry_backoff: raw.retry_backoff.unwrap_or(BackoffPolicy::Fixed),
            vm_migration_overhead: raw.vm_migration_overhead.unwrap_or(0.1),
            migration_bandwidth_share: raw.migration_bandwidth_share.unwrap_or(0.5),
            utilization_history_length: raw.utilization_history_length.unwrap_or(DEFAULT_HISTORY_LENGTH),
            vm_destruction_delay: raw.vm_destruction_delay,
            terminate_at: raw.terminate_at,
            vm_allocation: raw.vm_allocation.unwrap_or_else(|| "FirstFit".to_string()),
            migration: raw.migration,
            hosts: raw.hosts.unwrap_or_default(),
        }
    }

    /// Creates simulation config by parsing YAML string
    /// (uses default values if some parameters are absent).
    pub fn from_yaml_str(yaml: &str) -> SimResult<Self> {
        let raw: RawSimulationConfig = if yaml.trim().is_empty() {
            RawSimulationConfig::default()
        } else {
            match serde_yaml::from_str(yaml) {
                Ok(raw) => raw,
                Err(e) => return invalid(format!("can't parse YAML: {}", e)),
            }
        };
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> SimResult<Self> {
        match std::fs::read_to_string(file_name) {
            Ok(yaml) => Self::from_yaml_str(&yaml),
            Err(e) => invalid(format!("can't read file {}: {}", file_name, e)),
        }
    }

    /// Checks parameter values, including resolvability of algorithm names.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.scheduling_interval > 0.) {
            return invalid(format!(
                "scheduling_interval must be positive, got {}",
                self.scheduling_interval
            ));
        }
        for (name, value) in [
            ("message_delay", self.message_delay),
            ("min_time_between_events", self.min_time_between_events),
            ("vm_creation_retry_delay", self.vm_creation_retry_delay),
        ] {
            if !(value >= 0.) {
                return invalid(format!("{} must be non-negative, got {}", name, value));
            }
        }
        if let BackoffPolicy::Exponential { factor } = self.retry_backoff {
            if !(factor >= 1.) {
                return invalid(format!("backoff factor must be at least 1, got {}", factor));
            }
        }
        if !(0. ..=1.).contains(&self.vm_migration_overhead) {
            return invalid(format!(
                "vm_migration_overhead must be in [0, 1], got {}",
                self.vm_migration_overhead
            ));
        }
        if !(self.migration_bandwidth_share > 0. && self.migration_bandwidth_share <= 1.) {
            return invalid(format!(
                "migration_bandwidth_share must be in (0, 1], got {}",
                self.migration_bandwidth_share
            ));
        }
        if self.utilization_history_length == 0 {
            return invalid("utilization_history_length must be positive");
        }
        if let Some(delay) = self.vm_destruction_delay {
            if !(delay >= 0.) {
                return invalid(format!("vm_destruction_delay must be non-negative, got {}", delay));
            }
        }
        if let Some(time) = self.terminate_at {
            if !(time >= 0.) {
                return invalid(format!("terminate_at must be non-negative, got {}", time));
            }
        }
        placement_algorithm_resolver(&self.vm_allocation)?;
        if let Some(migration) = &self.migration {
            if let Some(detector) = &migration.overload_detector {
                overload_detector_resolver(detector)?;
            }
            if let Some(selection) = &migration.vm_selection {
                vm_selection_resolver(selection)?;
            }
            if let Some(threshold) = migration.underload_threshold {
                if !(0. ..=1.).contains(&threshold) {
                    return invalid(format!("underload_threshold must be in [0, 1], got {}", threshold));
                }
            }
        }
        for host in self.hosts.iter() {
            if host.pes == 0 || !(host.pe_mips > 0.) {
                return invalid(format!("host config {:?} must have positive pes and pe_mips", host.name));
            }
            if host.count.unwrap_or(1) > 1 && host.name_prefix.is_none() && host.name.is_some() {
                return invalid(format!(
                    "host config {:?} describes several hosts and needs name_prefix",
                    host.name
                ));
            }
        }
        Ok(())
    }

    /// Delay before the VM creation retry round `round` (starting from 1).
    pub fn retry_delay(&self, round: u32) -> f64 {
        match self.retry_backoff {
            BackoffPolicy::Fixed => self.vm_creation_retry_delay,
            BackoffPolicy::Exponential { factor } => {
                self.vm_creation_retry_delay * factor.powi(round.saturating_sub(1) as i32)
            }
        }
    }
}
