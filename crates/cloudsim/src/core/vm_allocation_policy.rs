//! Selection of hosts for VMs within a datacenter.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::AllocationVerdict;
use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_placement_algorithm::{placement_algorithm_resolver, VmPlacementAlgorithm};
use crate::error::{SimError, SimResult};

/// Datacenter VM allocation policy driven by a placement algorithm.
pub struct VmAllocationPolicy {
    algorithm: Box<dyn VmPlacementAlgorithm>,
}

impl VmAllocationPolicy {
    pub fn new(algorithm: Box<dyn VmPlacementAlgorithm>) -> Self {
        Self { algorithm }
    }

    pub fn from_str(config_str: &str) -> SimResult<Self> {
        Ok(Self::new(placement_algorithm_resolver(config_str)?))
    }

    /// Selects host for the VM without placing it.
    ///
    /// Returns [`SimError::PlacementFailure`] if no host (outside of `excluded`) can accommodate the VM.
    pub fn allocate_host_for_vm(
        &mut self,
        vm: &Vm,
        hosts: &BTreeMap<u32, Host>,
        excluded: &BTreeSet<u32>,
    ) -> SimResult<u32> {
        match self.algorithm.select_host(vm, hosts, excluded) {
            Some(host_id) => Ok(host_id),
            None => Err(SimError::PlacementFailure {
                vm_id: vm.id,
                reason: Self::failure_reason(vm, hosts, excluded),
            }),
        }
    }

    /// Selects host for the VM and creates the VM there.
    pub fn place_vm(&mut self, vm: Vm, hosts: &mut BTreeMap<u32, Host>) -> SimResult<u32> {
        let host_id = self.allocate_host_for_vm(&vm, hosts, &BTreeSet::new())?;
        let vm_id = vm.id;
        let host = hosts.get_mut(&host_id).ok_or(SimError::NotFound { kind: "host", id: host_id })?;
        match host.create_vm(vm) {
            AllocationVerdict::Success => Ok(host_id),
            reason => Err(SimError::PlacementFailure { vm_id, reason }),
        }
    }

    // The common verdict of all candidate hosts, if they agree.
    fn failure_reason(vm: &Vm, hosts: &BTreeMap<u32, Host>, excluded: &BTreeSet<u32>) -> AllocationVerdict {
        let mut verdicts = hosts
            .values()
            .filter(|host| !excluded.contains(&host.id))
            .map(|host| host.check_vm(vm));
        let first = match verdicts.next() {
            Some(verdict) => verdict,
            None => return AllocationVerdict::HostNotFound,
        };
        if first != AllocationVerdict::Success && verdicts.all(|verdict| verdict == first) {
            first
        } else {
            AllocationVerdict::NoSuitableHost
        }
    }
}
