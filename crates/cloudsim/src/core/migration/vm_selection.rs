//! Policies selecting a VM to migrate from an overloaded host.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::config::options::{option_or, parse_config_value, parse_options};
use crate::core::migration::stats;
use crate::core::vm::Vm;
use crate::error::{invalid, SimResult};

/// Trait for implementation of VM selection policies.
///
/// The policy receives the VMs of an overloaded host and returns ID of the VM to migrate, or `None` if there is no
/// suitable VM. VMs which are being migrated are never selected.
pub trait VmSelectionPolicy {
    fn select_vm(&mut self, vms: &[&Vm], time: f64) -> Option<u32>;
}

fn migratable<'a>(vms: &[&'a Vm]) -> Vec<&'a Vm> {
    vms.iter().copied().filter(|vm| vm.is_migratable()).collect()
}

/// Resolves selection policy from config string, e.g. `Random[seed=42]` or
/// `MaximumCorrelation[fallback=MinimumUtilization]`.
pub fn vm_selection_resolver(config_str: &str) -> SimResult<Box<dyn VmSelectionPolicy>> {
    let (name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    match name.as_str() {
        "Random" => Ok(Box::new(RandomSelection::new(option_or(&options, "seed", 123)?))),
        "MinimumMigrationTime" => Ok(Box::new(MinimumMigrationTime)),
        "MinimumUtilization" => Ok(Box::new(MinimumUtilization)),
        "MaximumCorrelation" => {
            let fallback = match options.get("fallback") {
                Some(fallback) if fallback.starts_with("MaximumCorrelation") => {
                    return invalid("maximum correlation policy can't be its own fallback")
                }
                Some(fallback) => vm_selection_resolver(fallback)?,
                None => Box::new(MinimumMigrationTime),
            };
            Ok(Box::new(MaximumCorrelation::new(fallback)))
        }
        _ => invalid(format!("can't resolve vm selection policy: {}", config_str)),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Selects uniformly random migratable VM.
pub struct RandomSelection {
    rand: Pcg64,
}

impl RandomSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl VmSelectionPolicy for RandomSelection {
    fn select_vm(&mut self, vms: &[&Vm], _time: f64) -> Option<u32> {
        let candidates = migratable(vms);
        if candidates.is_empty() {
            return None;
        }
        let sample: f64 = self.rand.gen();
        let index = ((sample * candidates.len() as f64) as usize).min(candidates.len() - 1);
        Some(candidates[index].id)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Selects VM with the least RAM, i.e. the fastest one to migrate.
pub struct MinimumMigrationTime;

impl VmSelectionPolicy for MinimumMigrationTime {
    fn select_vm(&mut self, vms: &[&Vm], _time: f64) -> Option<u32> {
        migratable(vms).into_iter().min_by_key(|vm| vm.ram).map(|vm| vm.id)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Selects VM with the lowest current CPU usage in MIPS.
pub struct MinimumUtilization;

impl VmSelectionPolicy for MinimumUtilization {
    fn select_vm(&mut self, vms: &[&Vm], time: f64) -> Option<u32> {
        migratable(vms)
            .into_iter()
            .min_by(|a, b| a.current_requested_mips(time).total_cmp(&b.current_requested_mips(time)))
            .map(|vm| vm.id)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Selects VM whose utilization is the most correlated with utilization of other VMs on the host.
///
/// Correlation of each VM is the mean of Pearson coefficients between its history and histories of other
/// candidates. If no coefficient can be computed (single candidate, short or constant histories),
/// the fallback policy decides.
pub struct MaximumCorrelation {
    fallback: Box<dyn VmSelectionPolicy>,
}

impl MaximumCorrelation {
    pub fn new(fallback: Box<dyn VmSelectionPolicy>) -> Self {
        Self { fallback }
    }

    fn mean_correlation(vm: &Vm, others: &[&Vm]) -> Option<f64> {
        let history = vm.utilization_history().samples();
        let coefficients: Vec<f64> = others
            .iter()
            .filter(|other| other.id != vm.id)
            .filter_map(|other| stats::correlation(&history, &other.utilization_history().samples()))
            .collect();
        stats::mean(&coefficients)
    }
}

impl VmSelectionPolicy for MaximumCorrelation {
    fn select_vm(&mut self, vms: &[&Vm], time: f64) -> Option<u32> {
        let candidates = migratable(vms);
        if candidates.is_empty() {
            return None;
        }
        let mut best: Option<(u32, f64)> = None;
        for vm in candidates.iter() {
            if let Some(correlation) = Self::mean_correlation(vm, &candidates) {
                if best.map_or(true, |(_, max)| correlation > max) {
                    best = Some((vm.id, correlation));
                }
            }
        }
        match best {
            Some((vm_id, _)) => Some(vm_id),
            None => self.fallback.select_vm(&candidates, time),
        }
    }
}
