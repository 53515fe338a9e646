//! Physical host.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::cloudlet::Cloudlet;
use crate::core::common::AllocationVerdict;
use crate::core::migration::utilization_history::UtilizationHistory;
use crate::core::pe::Pe;
use crate::core::provisioner::{ResourceKind, ResourceProvisioner};
use crate::core::vm::{Vm, VmStatus};
use crate::core::vm_scheduler::{VmScheduler, VmSchedulingPolicy};
use crate::error::{invalid, SimResult};

/// Physical host which owns its PEs and resident VMs.
///
/// Besides resident VMs, the host can hold reservations for VMs which are migrating to it.
/// Such VM still runs on the source host and is added to this host only when the migration completes.
#[derive(Clone)]
pub struct Host {
    pub id: u32,
    pub name: String,
    ram: ResourceProvisioner,
    bw: ResourceProvisioner,
    storage: ResourceProvisioner,
    vm_scheduler: VmScheduler,
    vms: BTreeMap<u32, Vm>,
    migrating_in: BTreeSet<u32>,
    failed: bool,
}

impl Host {
    pub fn new(
        id: u32,
        pes: Vec<Pe>,
        ram: u64,
        bw: u64,
        storage: u64,
        policy: VmSchedulingPolicy,
        migration_overhead: f64,
    ) -> SimResult<Self> {
        if pes.is_empty() {
            return invalid(format!("host {} has no pes", id));
        }
        if let Some(pe) = pes.iter().find(|pe| !(pe.mips > 0.)) {
            return invalid(format!("pe {} of host {} has non-positive mips {}", pe.id, id, pe.mips));
        }
        if !(0. ..=1.).contains(&migration_overhead) {
            return invalid(format!("migration overhead must be in [0, 1], got {}", migration_overhead));
        }
        Ok(Self {
            id,
            name: format!("host-{}", id),
            ram: ResourceProvisioner::new(ResourceKind::Ram, ram),
            bw: ResourceProvisioner::new(ResourceKind::Bw, bw),
            storage: ResourceProvisioner::new(ResourceKind::Storage, storage),
            vm_scheduler: VmScheduler::new(policy, pes, migration_overhead),
            vms: BTreeMap::new(),
            migrating_in: BTreeSet::new(),
            failed: false,
        })
    }

    /// Creates host with `pes` identical PEs.
    pub fn with_uniform_pes(
        id: u32,
        pes: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        policy: VmSchedulingPolicy,
        migration_overhead: f64,
    ) -> SimResult<Self> {
        let pes = (0..pes).map(|i| Pe::new(i, pe_mips)).collect();
        Self::new(id, pes, ram, bw, storage, policy, migration_overhead)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn vm_scheduler(&self) -> &VmScheduler {
        &self.vm_scheduler
    }

    pub fn ram(&self) -> &ResourceProvisioner {
        &self.ram
    }

    pub fn bw(&self) -> &ResourceProvisioner {
        &self.bw
    }

    pub fn storage(&self) -> &ResourceProvisioner {
        &self.storage
    }

    pub fn total_mips(&self) -> f64 {
        self.vm_scheduler.total_mips()
    }

    /// CPU capacity not requested by resident VMs and reservations.
    pub fn available_mips(&self) -> f64 {
        self.vm_scheduler.available_mips()
    }

    // Verdict for the VM in the current state, without changing anything.
    pub fn check_vm(&self, vm: &Vm) -> AllocationVerdict {
        if self.failed {
            return AllocationVerdict::HostFailed;
        }
        let verdict = self.vm_scheduler.check_vm(vm.id, &vm.requested_mips());
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        for (provisioner, amount) in [(&self.ram, vm.ram), (&self.bw, vm.bw), (&self.storage, vm.size)] {
            if !provisioner.is_suitable(vm.id, amount) {
                return provisioner.shortage_verdict();
            }
        }
        AllocationVerdict::Success
    }

    pub fn is_suitable_for_vm(&self, vm: &Vm) -> bool {
        self.check_vm(vm) == AllocationVerdict::Success
    }

    /// Allocates PEs, RAM, bandwidth and storage for the VM.
    ///
    /// Either every resource is allocated, or the host state is left unchanged.
    fn allocate_resources_for_vm(&mut self, vm: &Vm) -> AllocationVerdict {
        if self.failed {
            return AllocationVerdict::HostFailed;
        }
        let verdict = self.vm_scheduler.allocate_pes_for_vm(vm.id, &vm.requested_mips());
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        if !self.ram.allocate(vm.id, vm.ram) {
            self.vm_scheduler.deallocate_pes_for_vm(vm.id);
            return AllocationVerdict::NotEnoughRam;
        }
        if !self.bw.allocate(vm.id, vm.bw) {
            self.ram.deallocate(vm.id);
            self.vm_scheduler.deallocate_pes_for_vm(vm.id);
            return AllocationVerdict::NotEnoughBw;
        }
        if !self.storage.allocate(vm.id, vm.size) {
            self.bw.deallocate(vm.id);
            self.ram.deallocate(vm.id);
            self.vm_scheduler.deallocate_pes_for_vm(vm.id);
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    fn deallocate_resources_for_vm(&mut self, vm_id: u32) {
        self.vm_scheduler.deallocate_pes_for_vm(vm_id);
        self.ram.deallocate(vm_id);
        self.bw.deallocate(vm_id);
        self.storage.deallocate(vm_id);
    }

    fn refresh_shares(&mut self) {
        for (vm_id, vm) in self.vms.iter_mut() {
            vm.set_allocated_mips(self.vm_scheduler.allocated_mips_for_vm(*vm_id));
        }
    }

    /// Places the VM on this host. On failure the VM is dropped and the host is left unchanged.
    pub fn create_vm(&mut self, mut vm: Vm) -> AllocationVerdict {
        let verdict = self.allocate_resources_for_vm(&vm);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        vm.host_id = Some(self.id);
        vm.set_status(VmStatus::Running);
        self.vms.insert(vm.id, vm);
        self.refresh_shares();
        AllocationVerdict::Success
    }

    /// Removes resident VM releasing its resources.
    pub fn remove_vm(&mut self, vm_id: u32) -> Option<Vm> {
        let mut vm = self.vms.remove(&vm_id)?;
        self.deallocate_resources_for_vm(vm_id);
        vm.set_allocated_mips(Vec::new());
        vm.host_id = None;
        self.refresh_shares();
        Some(vm)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: u32) -> Option<&mut Vm> {
        self.vms.get_mut(&vm_id)
    }

    pub fn vms(&self) -> impl Iterator<Item = &Vm> + '_ {
        self.vms.values()
    }

    pub fn vm_ids(&self) -> Vec<u32> {
        self.vms.keys().copied().collect()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    // Migration ///////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Reserves resources for the VM migrating to this host.
    ///
    /// Until the migration completes the reservation is granted only the migration overhead share of its CPU request.
    pub fn reserve_for_migration(&mut self, vm: &Vm) -> AllocationVerdict {
        if self.vms.contains_key(&vm.id) || self.migrating_in.contains(&vm.id) {
            return AllocationVerdict::Success;
        }
        let verdict = self.allocate_resources_for_vm(vm);
        if verdict == AllocationVerdict::Success {
            self.vm_scheduler.set_migrating_in(vm.id, true);
            self.migrating_in.insert(vm.id);
            self.refresh_shares();
        }
        verdict
    }

    /// Releases the reservation of migrating VM, returns `false` if there was none.
    pub fn cancel_migration_reservation(&mut self, vm_id: u32) -> bool {
        if !self.migrating_in.remove(&vm_id) {
            return false;
        }
        self.deallocate_resources_for_vm(vm_id);
        self.refresh_shares();
        true
    }

    /// Turns the reservation into resident VM which gets its full CPU request.
    pub fn complete_migration_in(&mut self, mut vm: Vm) -> bool {
        if !self.migrating_in.remove(&vm.id) {
            return false;
        }
        self.vm_scheduler.set_migrating_in(vm.id, false);
        vm.host_id = Some(self.id);
        vm.set_status(VmStatus::Running);
        self.vms.insert(vm.id, vm);
        self.refresh_shares();
        true
    }

    pub fn is_migrating_in(&self, vm_id: u32) -> bool {
        self.migrating_in.contains(&vm_id)
    }

    pub fn migrating_in_ids(&self) -> Vec<u32> {
        self.migrating_in.iter().copied().collect()
    }

    /// Marks resident VM as migrating out, it keeps running at reduced capacity.
    pub fn start_migration_out(&mut self, vm_id: u32) -> bool {
        match self.vms.get_mut(&vm_id) {
            Some(vm) if vm.is_migratable() => {
                vm.set_status(VmStatus::MigratingOut);
                self.vm_scheduler.set_migrating_out(vm_id, true);
                self.refresh_shares();
                true
            }
            _ => false,
        }
    }

    /// Returns VM to normal execution after its migration was aborted.
    pub fn abort_migration_out(&mut self, vm_id: u32) {
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            if vm.status() == VmStatus::MigratingOut {
                vm.set_status(VmStatus::Running);
            }
            self.vm_scheduler.set_migrating_out(vm_id, false);
            self.refresh_shares();
        }
    }

    // Processing //////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Advances cloudlets of all VMs up to `time`, returns the delay until the earliest cloudlet completion.
    pub fn update_processing(&mut self, time: f64) -> Option<f64> {
        self.refresh_shares();
        let mut next: Option<f64> = None;
        for vm in self.vms.values_mut() {
            if let Some(delay) = vm.update_processing(time) {
                next = Some(next.map_or(delay, |n| n.min(delay)));
            }
        }
        next
    }

    /// Returns `true` if some resident VM has unfinished cloudlets.
    pub fn has_unfinished_cloudlets(&self) -> bool {
        self.vms.values().any(|vm| vm.cloudlet_scheduler().has_unfinished())
    }

    pub fn take_finished_cloudlets(&mut self) -> Vec<Cloudlet> {
        let mut finished = Vec::new();
        for vm in self.vms.values_mut() {
            finished.extend(vm.cloudlet_scheduler_mut().take_finished());
        }
        finished
    }

    /// MIPS actually used by resident VMs and granted to migration reservations.
    pub fn used_mips(&self, time: f64) -> f64 {
        let resident: f64 = self.vms.values().map(|vm| vm.current_used_mips(time)).sum();
        let reserved: f64 = self
            .migrating_in
            .iter()
            .map(|vm_id| self.vm_scheduler.total_allocated_mips_for_vm(*vm_id))
            .sum();
        resident + reserved
    }

    /// Fraction of host CPU capacity in use.
    pub fn cpu_utilization(&self, time: f64) -> f64 {
        let total = self.total_mips();
        if total <= 0. {
            return 0.;
        }
        (self.used_mips(time) / total).min(1.)
    }

    /// CPU utilization the host would have without `removed` VMs and with `added` VMs running at their current demand.
    pub fn projected_utilization(&self, time: f64, removed: &[u32], added: &[&Vm]) -> f64 {
        let total = self.total_mips();
        if total <= 0. {
            return 0.;
        }
        let removed_mips: f64 = removed
            .iter()
            .filter_map(|vm_id| self.vms.get(vm_id))
            .map(|vm| vm.current_used_mips(time))
            .sum();
        let added_mips: f64 = added.iter().map(|vm| vm.current_requested_mips(time)).sum();
        ((self.used_mips(time) - removed_mips).max(0.) + added_mips) / total
    }

    /// Samples current utilization of every resident VM into its history.
    pub fn record_utilization(&mut self, time: f64) {
        for vm in self.vms.values_mut() {
            vm.record_utilization(time);
        }
    }

    /// Host CPU utilization history derived from histories of resident VMs weighted by their MIPS.
    pub fn utilization_history(&self) -> UtilizationHistory {
        let total = self.total_mips();
        let capacity = self
            .vms
            .values()
            .map(|vm| vm.utilization_history().capacity())
            .max()
            .unwrap_or_default();
        let length = self
            .vms
            .values()
            .map(|vm| vm.utilization_history().len())
            .max()
            .unwrap_or_default();
        let mut samples = vec![0.; length];
        if total > 0. {
            for vm in self.vms.values() {
                for (i, sample) in vm.utilization_history().samples().iter().enumerate() {
                    samples[i] += sample * vm.total_mips() / total;
                }
            }
        }
        samples.reverse();
        UtilizationHistory::from_chronological(capacity.max(length), &samples)
    }

    // Failures ////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Fails `count` working PEs (all of them if `count` is `None`).
    ///
    /// Returns ids of resident VMs and migration reservations which used the failed PEs.
    /// The host becomes failed when no working PE is left.
    pub fn fail_pes(&mut self, count: Option<usize>) -> Vec<u32> {
        let working = self.vm_scheduler.pes().len() - self.vm_scheduler.failed_pes();
        let affected = self.vm_scheduler.fail_pes(count.unwrap_or(working).min(working));
        if self.vm_scheduler.failed_pes() == self.vm_scheduler.pes().len() {
            self.failed = true;
        }
        self.refresh_shares();
        if self.failed {
            let mut all: Vec<u32> = self.vm_ids();
            all.extend(self.migrating_in.iter());
            all.sort_unstable();
            all.dedup();
            return all;
        }
        affected
    }
}
