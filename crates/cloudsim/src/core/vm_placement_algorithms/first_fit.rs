//! First Fit algorithm.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::{suitable_hosts, VmPlacementAlgorithm};

/// Uses the first suitable host in order of host ids.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmPlacementAlgorithm for FirstFit {
    fn select_host(&mut self, vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> Option<u32> {
        suitable_hosts(vm, hosts, excluded).next().map(|host| host.id)
    }
}
