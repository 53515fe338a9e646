//! Cloudlet, a unit of computational work executed inside a VM.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::core::utilization_model::{ConstantUtilization, UtilizationModel};
use crate::error::{invalid, SimResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    Created,
    Queued,
    Executing,
    Paused,
    Finished,
    Failed,
    Canceled,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::Executing => write!(f, "executing"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Finished => write!(f, "finished"),
            CloudletStatus::Failed => write!(f, "failed"),
            CloudletStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Represents cloudlet.
///
/// Length is the number of instructions (in MI) executed by each of the cloudlet PEs,
/// so the total amount of work is `length * pes`.
#[derive(Clone)]
pub struct Cloudlet {
    pub id: u32,
    pub length: f64,
    pub pes: u32,
    pub vm_id: Option<u32>,
    pub broker_id: Option<u32>,
    status: CloudletStatus,
    remaining: f64,
    submission_time: Option<f64>,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
    cpu_model: Box<dyn UtilizationModel>,
    ram_model: Box<dyn UtilizationModel>,
    bw_model: Box<dyn UtilizationModel>,
}

impl Serialize for Cloudlet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Cloudlet", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("length", &self.length)?;
        state.serialize_field("pes", &self.pes)?;
        state.serialize_field("vm_id", &self.vm_id)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("remaining", &self.remaining)?;
        state.end()
    }
}

impl Cloudlet {
    pub fn new(id: u32, length: f64, pes: u32) -> SimResult<Self> {
        if !(length > 0.) {
            return invalid(format!("cloudlet {} length must be positive, got {}", id, length));
        }
        if pes == 0 {
            return invalid(format!("cloudlet {} requires no pes", id));
        }
        Ok(Self {
            id,
            length,
            pes,
            vm_id: None,
            broker_id: None,
            status: CloudletStatus::Created,
            remaining: length * pes as f64,
            submission_time: None,
            exec_start_time: None,
            finish_time: None,
            cpu_model: Box::new(ConstantUtilization::full()),
            ram_model: Box::new(ConstantUtilization::full()),
            bw_model: Box::new(ConstantUtilization::full()),
        })
    }

    pub fn with_cpu_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.cpu_model = model;
        self
    }

    pub fn with_ram_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.ram_model = model;
        self
    }

    pub fn with_bw_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.bw_model = model;
        self
    }

    pub fn with_vm(mut self, vm_id: u32) -> Self {
        self.vm_id = Some(vm_id);
        self
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        self.status = status;
    }

    /// Returns `true` if the cloudlet reached a terminal state.
    pub fn is_done(&self) -> bool {
        matches!(
            self.status,
            CloudletStatus::Finished | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }

    pub fn total_length(&self) -> f64 {
        self.length * self.pes as f64
    }

    /// Remaining work in MI.
    pub fn remaining_length(&self) -> f64 {
        self.remaining
    }

    pub fn finished_length(&self) -> f64 {
        self.total_length() - self.remaining
    }

    /// Decreases the remaining length, never below zero.
    pub(crate) fn process(&mut self, instructions: f64) {
        self.remaining = (self.remaining - instructions.max(0.)).max(0.);
    }

    pub(crate) fn complete(&mut self) {
        self.remaining = 0.;
    }

    pub fn cpu_utilization(&self, time: f64) -> f64 {
        self.cpu_model.utilization(time)
    }

    pub fn ram_utilization(&self, time: f64) -> f64 {
        self.ram_model.utilization(time)
    }

    pub fn bw_utilization(&self, time: f64) -> f64 {
        self.bw_model.utilization(time)
    }

    pub fn submission_time(&self) -> Option<f64> {
        self.submission_time
    }

    pub fn exec_start_time(&self) -> Option<f64> {
        self.exec_start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    pub(crate) fn set_submission_time(&mut self, time: f64) {
        self.submission_time = Some(time);
    }

    pub(crate) fn set_exec_start_time(&mut self, time: f64) {
        if self.exec_start_time.is_none() {
            self.exec_start_time = Some(time);
        }
    }

    pub(crate) fn set_finish_time(&mut self, time: f64) {
        self.finish_time = Some(time);
    }
}
