//! Distribution of VM CPU capacity among its cloudlets.

use std::collections::VecDeque;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};

/// Remaining length (MI) at which cloudlet is considered finished.
pub const FINISH_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudletSchedulingPolicy {
    /// Cloudlets get dedicated VM PEs, the ones which do not fit wait in FIFO queue.
    SpaceShared,
    /// All cloudlets are executed at once sharing the VM capacity.
    TimeShared,
}

#[derive(Clone)]
struct RunningCloudlet {
    cloudlet: Cloudlet,
    mips: f64,
}

/// Cloudlet scheduler of a single VM.
///
/// Processing is event-driven: each call of [`update_processing`](Self::update_processing) accounts
/// the progress made at the rates assigned by the previous call, then assigns new rates from the current
/// VM MIPS share and returns the time until the earliest cloudlet completion.
#[derive(Clone)]
pub struct CloudletScheduler {
    policy: CloudletSchedulingPolicy,
    vm_pes: u32,
    executing: Vec<RunningCloudlet>,
    waiting: VecDeque<Cloudlet>,
    paused: Vec<Cloudlet>,
    finished: Vec<Cloudlet>,
    last_update: f64,
}

impl CloudletScheduler {
    pub fn new(policy: CloudletSchedulingPolicy, vm_pes: u32) -> Self {
        Self {
            policy,
            vm_pes,
            executing: Vec::new(),
            waiting: VecDeque::new(),
            paused: Vec::new(),
            finished: Vec::new(),
            last_update: 0.,
        }
    }

    pub fn policy(&self) -> CloudletSchedulingPolicy {
        self.policy
    }

    /// Accepts cloudlet for execution.
    ///
    /// Returns `false` if the cloudlet can never run on this VM. Such cloudlet is marked as failed
    /// and can be retrieved via [`take_finished`](Self::take_finished).
    pub fn submit(&mut self, mut cloudlet: Cloudlet, time: f64) -> bool {
        cloudlet.set_submission_time(time);
        if self.policy == CloudletSchedulingPolicy::SpaceShared && cloudlet.pes > self.vm_pes {
            cloudlet.set_status(CloudletStatus::Failed);
            cloudlet.set_finish_time(time);
            self.finished.push(cloudlet);
            return false;
        }
        match self.policy {
            CloudletSchedulingPolicy::TimeShared => self.start(cloudlet, time),
            CloudletSchedulingPolicy::SpaceShared => {
                cloudlet.set_status(CloudletStatus::Queued);
                self.waiting.push_back(cloudlet);
            }
        }
        true
    }

    fn start(&mut self, mut cloudlet: Cloudlet, time: f64) {
        cloudlet.set_status(CloudletStatus::Executing);
        cloudlet.set_exec_start_time(time);
        self.executing.push(RunningCloudlet { cloudlet, mips: 0. });
    }

    fn used_pes(&self) -> u32 {
        self.executing.iter().map(|rc| rc.cloudlet.pes).sum()
    }

    /// Updates cloudlets progress up to `time` and assigns new execution rates from `mips_share`
    /// (MIPS granted to each VM PE).
    ///
    /// Returns the delay until the next cloudlet completion, if some cloudlet makes progress.
    pub fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        let elapsed = (time - self.last_update).max(0.);
        for rc in self.executing.iter_mut() {
            rc.cloudlet.process(rc.mips * elapsed);
        }
        self.last_update = time;
        self.collect_finished(time);
        if self.policy == CloudletSchedulingPolicy::SpaceShared {
            self.admit_waiting(time);
        }
        self.assign_rates(time, mips_share);
        self.next_completion_delay()
    }

    fn collect_finished(&mut self, time: f64) {
        let mut i = 0;
        while i < self.executing.len() {
            if self.executing[i].cloudlet.remaining_length() <= FINISH_TOLERANCE {
                let mut cloudlet = self.executing.remove(i).cloudlet;
                cloudlet.complete();
                cloudlet.set_status(CloudletStatus::Finished);
                cloudlet.set_finish_time(time);
                self.finished.push(cloudlet);
            } else {
                i += 1;
            }
        }
    }

    fn admit_waiting(&mut self, time: f64) {
        while let Some(next) = self.waiting.front() {
            if self.used_pes() + next.pes > self.vm_pes {
                break;
            }
            if let Some(cloudlet) = self.waiting.pop_front() {
                self.start(cloudlet, time);
            }
        }
    }

    fn assign_rates(&mut self, time: f64, mips_share: &[f64]) {
        let capacity: f64 = mips_share.iter().sum();
        if self.vm_pes == 0 {
            return;
        }
        let pe_mips = capacity / self.vm_pes as f64;
        let demanded_pes = self.used_pes();
        let mips_per_pe = match self.policy {
            CloudletSchedulingPolicy::SpaceShared => pe_mips,
            CloudletSchedulingPolicy::TimeShared => {
                if demanded_pes <= self.vm_pes {
                    pe_mips
                } else {
                    capacity / demanded_pes as f64
                }
            }
        };
        for rc in self.executing.iter_mut() {
            rc.mips = mips_per_pe * rc.cloudlet.pes as f64 * rc.cloudlet.cpu_utilization(time);
        }
    }

    fn next_completion_delay(&self) -> Option<f64> {
        self.executing
            .iter()
            .filter(|rc| rc.mips > 0.)
            .map(|rc| rc.cloudlet.remaining_length() / rc.mips)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Suspends executing or waiting cloudlet.
    pub fn pause(&mut self, cloudlet_id: u32) -> bool {
        let cloudlet = if let Some(pos) = self.executing.iter().position(|rc| rc.cloudlet.id == cloudlet_id) {
            self.executing.remove(pos).cloudlet
        } else if let Some(pos) = self.waiting.iter().position(|c| c.id == cloudlet_id) {
            match self.waiting.remove(pos) {
                Some(c) => c,
                None => return false,
            }
        } else {
            return false;
        };
        let mut cloudlet = cloudlet;
        cloudlet.set_status(CloudletStatus::Paused);
        self.paused.push(cloudlet);
        true
    }

    /// Returns paused cloudlet to execution (or to the waiting queue for space-shared policy).
    pub fn resume(&mut self, cloudlet_id: u32, time: f64) -> bool {
        let pos = match self.paused.iter().position(|c| c.id == cloudlet_id) {
            Some(pos) => pos,
            None => return false,
        };
        let mut cloudlet = self.paused.remove(pos);
        match self.policy {
            CloudletSchedulingPolicy::TimeShared => self.start(cloudlet, time),
            CloudletSchedulingPolicy::SpaceShared => {
                cloudlet.set_status(CloudletStatus::Queued);
                self.waiting.push_back(cloudlet);
            }
        }
        true
    }

    /// Cancels unfinished cloudlet, which is then retrievable via [`take_finished`](Self::take_finished).
    pub fn cancel(&mut self, cloudlet_id: u32, time: f64) -> bool {
        let cloudlet = if let Some(pos) = self.executing.iter().position(|rc| rc.cloudlet.id == cloudlet_id) {
            Some(self.executing.remove(pos).cloudlet)
        } else if let Some(pos) = self.waiting.iter().position(|c| c.id == cloudlet_id) {
            self.waiting.remove(pos)
        } else if let Some(pos) = self.paused.iter().position(|c| c.id == cloudlet_id) {
            Some(self.paused.remove(pos))
        } else {
            None
        };
        match cloudlet {
            Some(mut cloudlet) => {
                cloudlet.set_status(CloudletStatus::Canceled);
                cloudlet.set_finish_time(time);
                self.finished.push(cloudlet);
                true
            }
            None => false,
        }
    }

    /// Marks all unfinished cloudlets as failed.
    pub fn fail_all(&mut self, time: f64) {
        self.terminate_all(CloudletStatus::Failed, time);
    }

    /// Cancels all unfinished cloudlets.
    pub fn cancel_all(&mut self, time: f64) {
        self.terminate_all(CloudletStatus::Canceled, time);
    }

    fn terminate_all(&mut self, status: CloudletStatus, time: f64) {
        let mut unfinished: Vec<Cloudlet> = self.executing.drain(..).map(|rc| rc.cloudlet).collect();
        unfinished.extend(self.waiting.drain(..));
        unfinished.append(&mut self.paused);
        for mut cloudlet in unfinished {
            cloudlet.set_status(status);
            cloudlet.set_finish_time(time);
            self.finished.push(cloudlet);
        }
    }

    /// Removes and returns cloudlets in terminal state.
    pub fn take_finished(&mut self) -> Vec<Cloudlet> {
        mem::take(&mut self.finished)
    }

    pub fn has_finished(&self) -> bool {
        !self.finished.is_empty()
    }

    /// Returns `true` if some cloudlet is executing, waiting or paused.
    pub fn has_unfinished(&self) -> bool {
        !self.executing.is_empty() || !self.waiting.is_empty() || !self.paused.is_empty()
    }

    pub fn executing_count(&self) -> usize {
        self.executing.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn paused_count(&self) -> usize {
        self.paused.len()
    }

    pub fn status_of(&self, cloudlet_id: u32) -> Option<CloudletStatus> {
        self.executing
            .iter()
            .map(|rc| &rc.cloudlet)
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.status())
    }

    pub fn remaining_length_of(&self, cloudlet_id: u32) -> Option<f64> {
        self.executing
            .iter()
            .map(|rc| &rc.cloudlet)
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .find(|c| c.id == cloudlet_id)
            .map(|c| c.remaining_length())
    }

    /// MIPS currently assigned to the executing cloudlet.
    pub fn allocated_mips_for(&self, cloudlet_id: u32) -> Option<f64> {
        self.executing
            .iter()
            .find(|rc| rc.cloudlet.id == cloudlet_id)
            .map(|rc| rc.mips)
    }

    pub fn total_allocated_mips(&self) -> f64 {
        self.executing.iter().map(|rc| rc.mips).sum()
    }

    /// Fraction of VM CPU capacity requested by executing cloudlets.
    pub fn cpu_utilization(&self, time: f64) -> f64 {
        if self.vm_pes == 0 {
            return 0.;
        }
        let demanded: f64 = self
            .executing
            .iter()
            .map(|rc| rc.cloudlet.pes as f64 * rc.cloudlet.cpu_utilization(time))
            .sum();
        (demanded / self.vm_pes as f64).min(1.)
    }
}
