//! Bookkeeping of RAM, bandwidth and storage reservations of a host.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::common::AllocationVerdict;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    Ram,
    Bw,
    Storage,
}

/// Tracks the capacity of a single resource and its per-VM reservations.
///
/// Invariant: `allocated <= capacity`.
#[derive(Clone, Debug)]
pub struct ResourceProvisioner {
    kind: ResourceKind,
    capacity: u64,
    allocated: u64,
    allocations: BTreeMap<u32, u64>,
}

impl ResourceProvisioner {
    pub fn new(kind: ResourceKind, capacity: u64) -> Self {
        Self {
            kind,
            capacity,
            allocated: 0,
            allocations: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.allocated
    }

    pub fn allocated_for(&self, vm_id: u32) -> u64 {
        self.allocations.get(&vm_id).copied().unwrap_or(0)
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.;
        }
        self.allocated as f64 / self.capacity as f64
    }

    /// Checks whether the VM can hold `amount` of the resource (including its current reservation).
    pub fn is_suitable(&self, vm_id: u32, amount: u64) -> bool {
        self.available() + self.allocated_for(vm_id) >= amount
    }

    /// Reserves `amount` for the VM replacing its previous reservation.
    ///
    /// Leaves the state unchanged and returns `false` if there is not enough capacity.
    pub fn allocate(&mut self, vm_id: u32, amount: u64) -> bool {
        if !self.is_suitable(vm_id, amount) {
            return false;
        }
        self.deallocate(vm_id);
        self.allocations.insert(vm_id, amount);
        self.allocated += amount;
        true
    }

    /// Releases the VM reservation, returns the freed amount (zero if nothing was reserved).
    pub fn deallocate(&mut self, vm_id: u32) -> u64 {
        match self.allocations.remove(&vm_id) {
            Some(amount) => {
                self.allocated -= amount;
                amount
            }
            None => 0,
        }
    }

    /// Verdict reported when this resource is insufficient.
    pub fn shortage_verdict(&self) -> AllocationVerdict {
        match self.kind {
            ResourceKind::Ram => AllocationVerdict::NotEnoughRam,
            ResourceKind::Bw => AllocationVerdict::NotEnoughBw,
            ResourceKind::Storage => AllocationVerdict::NotEnoughStorage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_within_capacity() {
        let mut ram = ResourceProvisioner::new(ResourceKind::Ram, 1024);
        assert!(ram.allocate(1, 512));
        assert!(ram.allocate(2, 512));
        assert_eq!(ram.available(), 0);
        assert!(!ram.is_suitable(3, 1));
        assert!(!ram.allocate(3, 1));
        assert_eq!(ram.allocated(), 1024);
        assert_eq!(ram.allocated_for(3), 0);
    }

    #[test]
    fn test_reallocation_replaces_previous_amount() {
        let mut bw = ResourceProvisioner::new(ResourceKind::Bw, 1000);
        assert!(bw.allocate(1, 600));
        // the current reservation counts as available for the same VM
        assert!(bw.is_suitable(1, 1000));
        assert!(bw.allocate(1, 900));
        assert_eq!(bw.allocated(), 900);
        assert!(!bw.allocate(1, 1001));
        assert_eq!(bw.allocated_for(1), 900);
    }

    #[test]
    fn test_deallocate_is_idempotent() {
        let mut storage = ResourceProvisioner::new(ResourceKind::Storage, 100);
        assert_eq!(storage.deallocate(7), 0);
        assert_eq!(storage.allocated(), 0);
        assert!(storage.allocate(7, 40));
        assert_eq!(storage.deallocate(7), 40);
        assert_eq!(storage.deallocate(7), 0);
        assert_eq!(storage.available(), 100);
    }

    #[test]
    fn test_shortage_verdict() {
        assert_eq!(
            ResourceProvisioner::new(ResourceKind::Ram, 1).shortage_verdict(),
            AllocationVerdict::NotEnoughRam
        );
        assert_eq!(
            ResourceProvisioner::new(ResourceKind::Storage, 1).shortage_verdict(),
            AllocationVerdict::NotEnoughStorage
        );
    }
}
