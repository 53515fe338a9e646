//! Standard simulation events.

use simcore::{Simulation, Tag};

/// Tags of cloud simulation events.
///
/// Ordinals are stable and start from 1, since 0 is reserved for untagged events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventTag {
    VmCreateRequest = 1,
    VmCreated = 2,
    VmCreationFailed = 3,
    VmCreationRetry = 4,
    VmDestroyRequest = 5,
    VmDestroyed = 6,
    VmFailed = 7,
    VmIdleCheck = 8,
    CloudletSubmit = 9,
    CloudletPause = 10,
    CloudletResume = 11,
    CloudletCancel = 12,
    CloudletReturned = 13,
    UpdateProcessing = 14,
    SchedulingTick = 15,
    VmMigrate = 16,
    VmMigrationFinished = 17,
    HostFailure = 18,
    VmListSubmitted = 19,
    CloudletListSubmitted = 20,
}

impl EventTag {
    pub fn id(self) -> Tag {
        self as Tag
    }
}

/// Registers tags of all events defined in this module.
pub fn register_event_tags(sim: &mut Simulation) {
    use self::broker::*;
    use self::cloudlet::*;
    use self::datacenter::*;
    use self::migration::*;
    use self::vm::*;

    sim.register_tag::<VmCreateRequest>(EventTag::VmCreateRequest.id());
    sim.register_tag::<VmCreated>(EventTag::VmCreated.id());
    sim.register_tag::<VmCreationFailed>(EventTag::VmCreationFailed.id());
    sim.register_tag::<VmCreationRetry>(EventTag::VmCreationRetry.id());
    sim.register_tag::<VmDestroyRequest>(EventTag::VmDestroyRequest.id());
    sim.register_tag::<VmDestroyed>(EventTag::VmDestroyed.id());
    sim.register_tag::<VmFailed>(EventTag::VmFailed.id());
    sim.register_tag::<VmIdleCheck>(EventTag::VmIdleCheck.id());
    sim.register_tag::<CloudletSubmit>(EventTag::CloudletSubmit.id());
    sim.register_tag::<CloudletPause>(EventTag::CloudletPause.id());
    sim.register_tag::<CloudletResume>(EventTag::CloudletResume.id());
    sim.register_tag::<CloudletCancel>(EventTag::CloudletCancel.id());
    sim.register_tag::<CloudletReturned>(EventTag::CloudletReturned.id());
    sim.register_tag::<UpdateProcessing>(EventTag::UpdateProcessing.id());
    sim.register_tag::<SchedulingTick>(EventTag::SchedulingTick.id());
    sim.register_tag::<VmMigrate>(EventTag::VmMigrate.id());
    sim.register_tag::<VmMigrationFinished>(EventTag::VmMigrationFinished.id());
    sim.register_tag::<HostFailure>(EventTag::HostFailure.id());
    sim.register_tag::<VmListSubmitted>(EventTag::VmListSubmitted.id());
    sim.register_tag::<CloudletListSubmitted>(EventTag::CloudletListSubmitted.id());
}

// VM LIFECYCLE EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use crate::core::common::AllocationVerdict;
    use crate::core::vm::Vm;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: Vm,
    }

    #[derive(Serialize, Clone)]
    pub struct VmCreated {
        pub vm_id: u32,
        pub host_id: u32,
        pub datacenter_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmCreationFailed {
        pub vm_id: u32,
        pub reason: AllocationVerdict,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyed {
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmFailed {
        pub vm_id: u32,
        pub host_id: u32,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletPause {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletResume {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletCancel {
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    /// Cloudlet in its final state (finished, failed or canceled) returned to the broker.
    #[derive(Serialize, Clone)]
    pub struct CloudletReturned {
        pub cloudlet: Cloudlet,
    }
}

// DATACENTER EVENTS ///////////////////////////////////////////////////////////////////////////////

pub mod datacenter {
    use serde::Serialize;

    /// Recomputation of cloudlet progress scheduled at the earliest cloudlet completion.
    #[derive(Serialize, Clone)]
    pub struct UpdateProcessing {}

    /// Periodic sampling of utilization and VM consolidation.
    #[derive(Serialize, Clone)]
    pub struct SchedulingTick {}

    /// Failure of `pes` host PEs (all PEs if not specified).
    #[derive(Serialize, Clone)]
    pub struct HostFailure {
        pub host_id: u32,
        pub pes: Option<u32>,
    }
}

// MIGRATION EVENTS ////////////////////////////////////////////////////////////////////////////////

pub mod migration {
    use serde::Serialize;

    /// Request to migrate VM to the specified host, or to the host selected by allocation policy.
    #[derive(Serialize, Clone)]
    pub struct VmMigrate {
        pub vm_id: u32,
        pub target_host: Option<u32>,
    }

    #[derive(Serialize, Clone)]
    pub struct VmMigrationFinished {
        pub vm_id: u32,
        pub source_host: u32,
        pub target_host: u32,
    }
}

// BROKER EVENTS ///////////////////////////////////////////////////////////////////////////////////

pub mod broker {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;
    use crate::core::vm::Vm;

    #[derive(Serialize, Clone)]
    pub struct VmListSubmitted {
        pub vms: Vec<Vm>,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletListSubmitted {
        pub cloudlets: Vec<Cloudlet>,
        pub vm_id: Option<u32>,
    }

    #[derive(Serialize, Clone)]
    pub struct VmCreationRetry {
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmIdleCheck {
        pub vm_id: u32,
    }
}
