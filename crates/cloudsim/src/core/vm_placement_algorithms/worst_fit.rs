//! Worst Fit algorithm.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::{suitable_hosts, VmPlacementAlgorithm};

/// Uses the least loaded (by available CPU) suitable host.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for WorstFit {
    fn select_host(&mut self, vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_available_mips = -1.;
        for host in suitable_hosts(vm, hosts, excluded) {
            if host.available_mips() > max_available_mips {
                max_available_mips = host.available_mips();
                result = Some(host.id);
            }
        }
        result
    }
}
