//! Virtual machine placement algorithms.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::options::parse_config_value;
use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithms::best_fit::BestFit;
use crate::core::vm_placement_algorithms::first_fit::FirstFit;
use crate::core::vm_placement_algorithms::round_robin::RoundRobin;
use crate::core::vm_placement_algorithms::worst_fit::WorstFit;
use crate::error::{invalid, SimResult};

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of VM and current state of datacenter hosts, which returns an ID of host
/// selected for VM placement or `None` if there is no suitable host. Hosts from `excluded` set must not be selected.
///
/// It is possible to implement arbitrary placement algorithm and use it in datacenter allocation policy.
pub trait VmPlacementAlgorithm {
    fn select_host(&mut self, vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> Option<u32>;
}

/// Iterates over hosts which are not excluded and can accommodate the VM.
pub(crate) fn suitable_hosts<'a>(
    vm: &'a Vm,
    hosts: &'a BTreeMap<u32, Host>,
    excluded: &'a BTreeSet<u32>,
) -> impl Iterator<Item = &'a Host> + 'a {
    hosts
        .values()
        .filter(move |host| !excluded.contains(&host.id) && host.is_suitable_for_vm(vm))
}

pub fn placement_algorithm_resolver(config_str: &str) -> SimResult<Box<dyn VmPlacementAlgorithm>> {
    let (algorithm_name, _options) = parse_config_value(config_str);
    match algorithm_name.as_str() {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "RoundRobin" => Ok(Box::new(RoundRobin::new())),
        _ => invalid(format!("can't resolve placement algorithm: {}", config_str)),
    }
}
