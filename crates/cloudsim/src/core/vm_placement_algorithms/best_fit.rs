//! Best Fit algorithm.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::{suitable_hosts, VmPlacementAlgorithm};

/// Uses the most loaded (by available CPU) suitable host.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for BestFit {
    fn select_host(&mut self, vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_available_mips = f64::MAX;
        for host in suitable_hosts(vm, hosts, excluded) {
            if host.available_mips() < min_available_mips {
                min_available_mips = host.available_mips();
                result = Some(host.id);
            }
        }
        result
    }
}
