//! Sequential identifiers for hosts, VMs and cloudlets.

/// Hands out sequential ids per object kind.
///
/// Owned by a simulation run, so that independent runs produce identical ids.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next_host: u32,
    next_vm: u32,
    next_cloudlet: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_host_id(&mut self) -> u32 {
        let id = self.next_host;
        self.next_host += 1;
        id
    }

    pub fn next_vm_id(&mut self) -> u32 {
        let id = self.next_vm;
        self.next_vm += 1;
        id
    }

    pub fn next_cloudlet_id(&mut self) -> u32 {
        let id = self.next_cloudlet;
        self.next_cloudlet += 1;
        id
    }
}
