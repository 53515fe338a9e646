//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::core::cloudlet_scheduler::{CloudletScheduler, CloudletSchedulingPolicy};
use crate::core::migration::utilization_history::UtilizationHistory;
use crate::error::{invalid, SimResult};

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Unplaced,
    MigratingIn,
    Running,
    MigratingOut,
    Failed,
    Finished,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Unplaced => write!(f, "unplaced"),
            VmStatus::MigratingIn => write!(f, "migrating_in"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::MigratingOut => write!(f, "migrating_out"),
            VmStatus::Failed => write!(f, "failed"),
            VmStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Represents virtual machine (VM).
///
// VM is characterized by its resource requirements (PEs with per-PE MIPS, RAM, bandwidth and image size).
// The actual CPU utilization is defined by cloudlets running inside the VM and is sampled into the
// utilization history once per datacenter scheduling interval.
#[derive(Clone)]
pub struct Vm {
    pub id: u32,
    pub pes: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub size: u64,
    pub broker_id: Option<u32>,
    pub host_id: Option<u32>,
    status: VmStatus,
    cloudlet_scheduler: CloudletScheduler,
    history: UtilizationHistory,
    allocated_mips: Vec<f64>,
}

impl Serialize for Vm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Vm", 8)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("pes", &self.pes)?;
        state.serialize_field("mips", &self.mips)?;
        state.serialize_field("ram", &self.ram)?;
        state.serialize_field("bw", &self.bw)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("host_id", &self.host_id)?;
        state.end()
    }
}

impl Vm {
    pub fn new(
        id: u32,
        pes: u32,
        mips: f64,
        ram: u64,
        bw: u64,
        size: u64,
        policy: CloudletSchedulingPolicy,
    ) -> SimResult<Self> {
        if pes == 0 {
            return invalid(format!("vm {} requires no pes", id));
        }
        if !(mips > 0.) {
            return invalid(format!("vm {} mips must be positive, got {}", id, mips));
        }
        Ok(Self {
            id,
            pes,
            mips,
            ram,
            bw,
            size,
            broker_id: None,
            host_id: None,
            status: VmStatus::Unplaced,
            cloudlet_scheduler: CloudletScheduler::new(policy, pes),
            history: UtilizationHistory::default(),
            allocated_mips: Vec::new(),
        })
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    /// Returns `true` for VM which is neither migrating nor failed or finished.
    pub fn is_migratable(&self) -> bool {
        self.status == VmStatus::Running
    }

    pub fn is_in_migration(&self) -> bool {
        matches!(self.status, VmStatus::MigratingIn | VmStatus::MigratingOut)
    }

    /// MIPS requested for each VM PE.
    pub fn requested_mips(&self) -> Vec<f64> {
        vec![self.mips; self.pes as usize]
    }

    pub fn total_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }

    pub fn allocated_mips(&self) -> &[f64] {
        &self.allocated_mips
    }

    pub fn total_allocated_mips(&self) -> f64 {
        self.allocated_mips.iter().sum()
    }

    pub(crate) fn set_allocated_mips(&mut self, mips: Vec<f64>) {
        self.allocated_mips = mips;
    }

    /// Fraction of requested CPU capacity demanded by cloudlets.
    pub fn cpu_utilization(&self, time: f64) -> f64 {
        self.cloudlet_scheduler.cpu_utilization(time)
    }

    /// CPU capacity in MIPS demanded by cloudlets.
    pub fn current_requested_mips(&self, time: f64) -> f64 {
        self.total_mips() * self.cpu_utilization(time)
    }

    /// CPU capacity in MIPS actually used, i.e. the demand limited by the granted share.
    pub fn current_used_mips(&self, time: f64) -> f64 {
        self.current_requested_mips(time).min(self.total_allocated_mips())
    }

    pub fn cloudlet_scheduler(&self) -> &CloudletScheduler {
        &self.cloudlet_scheduler
    }

    pub fn cloudlet_scheduler_mut(&mut self) -> &mut CloudletScheduler {
        &mut self.cloudlet_scheduler
    }

    /// Advances cloudlets of this VM, returns the delay until the next cloudlet completion.
    pub fn update_processing(&mut self, time: f64) -> Option<f64> {
        self.cloudlet_scheduler.update_processing(time, &self.allocated_mips)
    }

    pub fn utilization_history(&self) -> &UtilizationHistory {
        &self.history
    }

    pub fn set_history_length(&mut self, length: usize) {
        self.history.set_capacity(length);
    }

    pub(crate) fn record_utilization(&mut self, time: f64) {
        let utilization = self.cpu_utilization(time);
        self.history.push(utilization);
    }

    #[cfg(test)]
    pub(crate) fn history_mut(&mut self) -> &mut UtilizationHistory {
        &mut self.history
    }
}
