//! Distribution of host CPU capacity among resident VMs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::common::AllocationVerdict;
use crate::core::pe::{Pe, PeStatus};

const EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmSchedulingPolicy {
    /// Each VM PE gets a dedicated host PE.
    SpaceShared,
    /// VM PEs share host PEs, total requested MIPS can not exceed the host capacity.
    TimeShared,
    /// Same as `TimeShared`, but admits VMs beyond the host capacity shrinking their shares.
    TimeSharedOverSubscription,
}

/// Max-min fair division of `capacity` among `demands`.
fn water_fill(capacity: f64, demands: &[f64]) -> Vec<f64> {
    let mut alloc = vec![0.; demands.len()];
    let mut remaining = capacity;
    let mut active: Vec<usize> = (0..demands.len()).filter(|i| demands[*i] > 0.).collect();
    while !active.is_empty() && remaining > EPSILON {
        let share = remaining / active.len() as f64;
        let mut unsatisfied = Vec::new();
        for &i in active.iter() {
            let need = demands[i] - alloc[i];
            if need <= share {
                alloc[i] += need;
                remaining -= need;
            } else {
                alloc[i] += share;
                remaining -= share;
                unsatisfied.push(i);
            }
        }
        if unsatisfied.len() == active.len() {
            break;
        }
        active = unsatisfied;
    }
    alloc
}

/// VM scheduler of a single host, owns the host PEs.
#[derive(Clone, Debug)]
pub struct VmScheduler {
    policy: VmSchedulingPolicy,
    pes: Vec<Pe>,
    migration_overhead: f64,
    requests: BTreeMap<u32, Vec<f64>>,
    pe_map: BTreeMap<u32, Vec<usize>>,
    migrating_in: BTreeSet<u32>,
    migrating_out: BTreeSet<u32>,
    allocations: BTreeMap<u32, Vec<f64>>,
}

impl VmScheduler {
    pub fn new(policy: VmSchedulingPolicy, pes: Vec<Pe>, migration_overhead: f64) -> Self {
        Self {
            policy,
            pes,
            migration_overhead,
            requests: BTreeMap::new(),
            pe_map: BTreeMap::new(),
            migrating_in: BTreeSet::new(),
            migrating_out: BTreeSet::new(),
            allocations: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> VmSchedulingPolicy {
        self.policy
    }

    pub fn pes(&self) -> &[Pe] {
        &self.pes
    }

    pub fn migration_overhead(&self) -> f64 {
        self.migration_overhead
    }

    /// Total capacity of working PEs.
    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.available_mips()).sum()
    }

    fn working_pes(&self) -> impl Iterator<Item = (usize, &Pe)> + '_ {
        self.pes.iter().enumerate().filter(|(_, pe)| !pe.is_failed())
    }

    fn is_pe_mapped(&self, idx: usize) -> bool {
        self.pe_map.values().any(|pes| pes.contains(&idx))
    }

    fn pe_load(&self, idx: usize) -> f64 {
        let mut load = 0.;
        for (vm_id, pes) in self.pe_map.iter() {
            for (vpe, pe) in pes.iter().enumerate() {
                if *pe == idx {
                    load += self.requests[vm_id][vpe];
                }
            }
        }
        load
    }

    /// Total MIPS requested by resident VMs.
    pub fn requested_mips(&self) -> f64 {
        self.requests.values().flatten().sum()
    }

    /// Capacity which is not requested by resident VMs.
    pub fn available_mips(&self) -> f64 {
        (self.total_mips() - self.requested_mips()).max(0.)
    }

    pub fn free_pes(&self) -> usize {
        self.working_pes().filter(|(idx, _)| !self.is_pe_mapped(*idx)).count()
    }

    /// Checks whether the VM with specified per-PE requests can be admitted.
    pub fn check_vm(&self, vm_id: u32, requested: &[f64]) -> AllocationVerdict {
        if requested.is_empty() {
            return AllocationVerdict::NotEnoughPes;
        }
        if self.requests.contains_key(&vm_id) {
            return AllocationVerdict::Success;
        }
        match self.policy {
            VmSchedulingPolicy::SpaceShared => match self.map_dedicated(requested) {
                Ok(_) => AllocationVerdict::Success,
                Err(verdict) => verdict,
            },
            VmSchedulingPolicy::TimeShared | VmSchedulingPolicy::TimeSharedOverSubscription => {
                if requested.len() > self.working_pes().count() {
                    return AllocationVerdict::NotEnoughPes;
                }
                let max_pe_mips = self.working_pes().map(|(_, pe)| pe.mips).fold(0., f64::max);
                if requested.iter().any(|r| *r > max_pe_mips + EPSILON) {
                    return AllocationVerdict::NotEnoughMips;
                }
                if self.policy == VmSchedulingPolicy::TimeShared {
                    let total: f64 = requested.iter().sum();
                    if total > self.available_mips() + EPSILON {
                        return AllocationVerdict::NotEnoughMips;
                    }
                }
                AllocationVerdict::Success
            }
        }
    }

    pub fn is_suitable_for_vm(&self, vm_id: u32, requested: &[f64]) -> bool {
        self.check_vm(vm_id, requested) == AllocationVerdict::Success
    }

    // Assigns a distinct free PE to each VM PE, larger requests first.
    fn map_dedicated(&self, requested: &[f64]) -> Result<Vec<usize>, AllocationVerdict> {
        let free: Vec<usize> = self
            .working_pes()
            .filter(|(idx, _)| !self.is_pe_mapped(*idx))
            .map(|(idx, _)| idx)
            .collect();
        if free.len() < requested.len() {
            return Err(AllocationVerdict::NotEnoughPes);
        }
        let mut order: Vec<usize> = (0..requested.len()).collect();
        order.sort_by(|a, b| requested[*b].total_cmp(&requested[*a]));
        let mut mapping = vec![0; requested.len()];
        let mut used = BTreeSet::new();
        for vpe in order {
            let pe = free
                .iter()
                .filter(|idx| !used.contains(*idx) && self.pes[**idx].mips + EPSILON >= requested[vpe])
                .min_by(|a, b| self.pes[**a].mips.total_cmp(&self.pes[**b].mips))
                .copied();
            match pe {
                Some(idx) => {
                    used.insert(idx);
                    mapping[vpe] = idx;
                }
                None => return Err(AllocationVerdict::NotEnoughMips),
            }
        }
        Ok(mapping)
    }

    // Assigns each VM PE to the least loaded distinct PE which can hold it.
    fn map_shared(&self, requested: &[f64]) -> Result<Vec<usize>, AllocationVerdict> {
        let mut mapping = Vec::with_capacity(requested.len());
        for req in requested.iter() {
            let pe = self
                .working_pes()
                .filter(|(idx, pe)| !mapping.contains(idx) && pe.mips + EPSILON >= *req)
                .map(|(idx, _)| idx)
                .min_by(|a, b| self.pe_load(*a).total_cmp(&self.pe_load(*b)));
            match pe {
                Some(idx) => mapping.push(idx),
                None => return Err(AllocationVerdict::NotEnoughPes),
            }
        }
        Ok(mapping)
    }

    /// Admits the VM and recomputes shares of all resident VMs.
    pub fn allocate_pes_for_vm(&mut self, vm_id: u32, requested: &[f64]) -> AllocationVerdict {
        let verdict = self.check_vm(vm_id, requested);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        if self.requests.contains_key(&vm_id) {
            return AllocationVerdict::Success;
        }
        let mapping = match self.policy {
            VmSchedulingPolicy::SpaceShared => self.map_dedicated(requested),
            _ => self.map_shared(requested),
        };
        match mapping {
            Ok(mapping) => {
                self.requests.insert(vm_id, requested.to_vec());
                self.pe_map.insert(vm_id, mapping);
                self.recompute();
                AllocationVerdict::Success
            }
            Err(verdict) => verdict,
        }
    }

    /// Removes the VM, returns `false` if it was not resident.
    pub fn deallocate_pes_for_vm(&mut self, vm_id: u32) -> bool {
        let existed = self.requests.remove(&vm_id).is_some();
        self.pe_map.remove(&vm_id);
        self.migrating_in.remove(&vm_id);
        self.migrating_out.remove(&vm_id);
        self.allocations.remove(&vm_id);
        if existed {
            self.recompute();
        }
        existed
    }

    /// Limits the VM share to the migration overhead fraction of its request.
    pub fn set_migrating_in(&mut self, vm_id: u32, migrating: bool) {
        if migrating {
            self.migrating_in.insert(vm_id);
        } else {
            self.migrating_in.remove(&vm_id);
        }
        self.recompute();
    }

    /// Reduces the VM share by the migration overhead fraction of its request.
    pub fn set_migrating_out(&mut self, vm_id: u32, migrating: bool) {
        if migrating {
            self.migrating_out.insert(vm_id);
        } else {
            self.migrating_out.remove(&vm_id);
        }
        self.recompute();
    }

    pub fn is_migrating_in(&self, vm_id: u32) -> bool {
        self.migrating_in.contains(&vm_id)
    }

    fn effective_request(&self, vm_id: u32) -> Vec<f64> {
        let factor = if self.migrating_in.contains(&vm_id) {
            self.migration_overhead
        } else if self.migrating_out.contains(&vm_id) {
            1. - self.migration_overhead
        } else {
            1.
        };
        self.requests[&vm_id].iter().map(|r| r * factor).collect()
    }

    fn recompute(&mut self) {
        let mut allocations: BTreeMap<u32, Vec<f64>> = self
            .requests
            .iter()
            .map(|(vm_id, req)| (*vm_id, vec![0.; req.len()]))
            .collect();
        for (idx, pe) in self.pes.iter().enumerate() {
            let mut owners = Vec::new();
            let mut demands = Vec::new();
            for (vm_id, pes) in self.pe_map.iter() {
                let effective = self.effective_request(*vm_id);
                for (vpe, pe_idx) in pes.iter().enumerate() {
                    if *pe_idx == idx {
                        owners.push((*vm_id, vpe));
                        demands.push(effective[vpe]);
                    }
                }
            }
            let shares: Vec<f64> = match self.policy {
                VmSchedulingPolicy::SpaceShared => demands.iter().map(|d| d.min(pe.available_mips())).collect(),
                _ => water_fill(pe.available_mips(), &demands),
            };
            for ((vm_id, vpe), share) in owners.into_iter().zip(shares) {
                if let Some(alloc) = allocations.get_mut(&vm_id) {
                    alloc[vpe] = share;
                }
            }
        }
        self.allocations = allocations;
        let mapped: BTreeSet<usize> = self.pe_map.values().flatten().copied().collect();
        for (idx, pe) in self.pes.iter_mut().enumerate() {
            if pe.status != PeStatus::Failed {
                pe.status = if mapped.contains(&idx) {
                    PeStatus::Busy
                } else {
                    PeStatus::Free
                };
            }
        }
    }

    /// MIPS granted to each VM PE, empty for unknown VM.
    pub fn allocated_mips_for_vm(&self, vm_id: u32) -> Vec<f64> {
        self.allocations.get(&vm_id).cloned().unwrap_or_default()
    }

    pub fn total_allocated_mips_for_vm(&self, vm_id: u32) -> f64 {
        self.allocations.get(&vm_id).map_or(0., |a| a.iter().sum())
    }

    pub fn total_allocated_mips(&self) -> f64 {
        self.allocations.values().flatten().sum()
    }

    pub fn vm_ids(&self) -> Vec<u32> {
        self.requests.keys().copied().collect()
    }

    /// Marks up to `count` working PEs as failed, returns ids of VMs which used them.
    pub fn fail_pes(&mut self, count: usize) -> Vec<u32> {
        let mut failed = BTreeSet::new();
        for (idx, pe) in self.pes.iter_mut().enumerate() {
            if failed.len() == count {
                break;
            }
            if pe.status != PeStatus::Failed {
                pe.status = PeStatus::Failed;
                failed.insert(idx);
            }
        }
        let affected: Vec<u32> = self
            .pe_map
            .iter()
            .filter(|(_, pes)| pes.iter().any(|idx| failed.contains(idx)))
            .map(|(vm_id, _)| *vm_id)
            .collect();
        self.recompute();
        affected
    }

    pub fn failed_pes(&self) -> usize {
        self.pes.iter().filter(|pe| pe.is_failed()).count()
    }
}
