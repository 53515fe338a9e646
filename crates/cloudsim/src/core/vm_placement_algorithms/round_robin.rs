//! Round Robin algorithm.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::{suitable_hosts, VmPlacementAlgorithm};

/// Uses the first suitable host following the previously selected one, wrapping around host list.
#[derive(Default)]
pub struct RoundRobin {
    last_host: Option<u32>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { last_host: None }
    }
}

impl VmPlacementAlgorithm for RoundRobin {
    fn select_host(&mut self, vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> Option<u32> {
        let last = self.last_host;
        let after_last = suitable_hosts(vm, hosts, excluded).find(|host| last.map_or(true, |last| host.id > last));
        let selected = after_last
            .or_else(|| suitable_hosts(vm, hosts, excluded).next())
            .map(|host| host.id);
        if selected.is_some() {
            self.last_host = selected;
        }
        selected
    }
}
