//! Broker entity which acts on behalf of a user: creates VMs and submits cloudlets to them.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::{Event, EventId};
use simcore::handler::EventHandler;
use simcore::predicate::EventPredicate;
use simcore::{log_debug, log_info, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::sim_config::SimulationConfig;
use crate::core::events::broker::{CloudletListSubmitted, VmCreationRetry, VmIdleCheck, VmListSubmitted};
use crate::core::events::cloudlet::{CloudletReturned, CloudletSubmit};
use crate::core::events::vm::{VmCreateRequest, VmCreated, VmCreationFailed, VmDestroyRequest, VmDestroyed, VmFailed};
use crate::core::events::EventTag;
use crate::core::vm::{Vm, VmStatus};

/// Location of created VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VmLocation {
    pub datacenter_id: u32,
    pub host_id: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct CreationAttempt {
    round: u32,
    datacenter: usize,
}

/// Broker submits VMs to datacenters and binds cloudlets to created VMs.
///
/// VM creation is tried in each datacenter in turn. If no datacenter can host the VM, the whole round is repeated
/// after the retry delay (growing according to backoff policy) until the retry limit is reached,
/// then the VM goes to the failed list. Unbound cloudlets are distributed round-robin among created VMs once
/// no VM creation is outstanding. When all cloudlets are returned the broker destroys its VMs and finishes.
pub struct Broker {
    pub id: u32,
    datacenters: Vec<u32>,
    vms: BTreeMap<u32, Vm>,
    attempts: BTreeMap<u32, CreationAttempt>,
    created: BTreeMap<u32, VmLocation>,
    failed_vms: Vec<u32>,
    destroyed_vms: Vec<u32>,
    destroying: BTreeSet<u32>,
    pending_cloudlets: Vec<Cloudlet>,
    in_flight: BTreeMap<u32, u32>,
    returned: Vec<Cloudlet>,
    awaiting_replies: usize,
    retries_pending: usize,
    next_vm: usize,
    idle_checks: BTreeMap<u32, EventId>,
    started: bool,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Broker {
    pub fn new(datacenters: Vec<u32>, ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            datacenters,
            vms: BTreeMap::new(),
            attempts: BTreeMap::new(),
            created: BTreeMap::new(),
            failed_vms: Vec::new(),
            destroyed_vms: Vec::new(),
            destroying: BTreeSet::new(),
            pending_cloudlets: Vec::new(),
            in_flight: BTreeMap::new(),
            returned: Vec::new(),
            awaiting_replies: 0,
            retries_pending: 0,
            next_vm: 0,
            idle_checks: BTreeMap::new(),
            started: false,
            ctx,
            sim_config,
        }
    }

    pub fn add_datacenter(&mut self, datacenter_id: u32) {
        self.datacenters.push(datacenter_id);
    }

    /// Submits VMs for creation, which starts immediately if the simulation is running.
    pub fn submit_vm_list(&mut self, vms: Vec<Vm>) {
        for mut vm in vms {
            let vm_id = vm.id;
            vm.broker_id = Some(self.id);
            self.vms.insert(vm_id, vm);
            if self.started {
                self.request_creation(vm_id);
            }
        }
    }

    /// Submits cloudlets, optionally binding all of them to the VM.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>, vm_id: Option<u32>) {
        for mut cloudlet in cloudlets {
            if vm_id.is_some() {
                cloudlet.vm_id = vm_id;
            }
            cloudlet.broker_id = Some(self.id);
            self.pending_cloudlets.push(cloudlet);
        }
        self.submit_cloudlets();
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&vm_id)
    }

    pub fn created_vms(&self) -> Vec<u32> {
        self.created.keys().copied().collect()
    }

    pub fn vm_location(&self, vm_id: u32) -> Option<VmLocation> {
        self.created.get(&vm_id).copied()
    }

    pub fn failed_vms(&self) -> &[u32] {
        &self.failed_vms
    }

    pub fn destroyed_vms(&self) -> &[u32] {
        &self.destroyed_vms
    }

    /// Cloudlets in final state in order of their return.
    pub fn returned_cloudlets(&self) -> &[Cloudlet] {
        &self.returned
    }

    pub fn returned_cloudlet(&self, cloudlet_id: u32) -> Option<&Cloudlet> {
        self.returned.iter().find(|c| c.id == cloudlet_id)
    }

    pub fn pending_cloudlets(&self) -> usize {
        self.pending_cloudlets.len()
    }

    pub fn cloudlets_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // VM creation /////////////////////////////////////////////////////////////////////////////////////////////////////

    fn creation_in_progress(&self) -> bool {
        self.awaiting_replies > 0 || self.retries_pending > 0
    }

    fn request_creation(&mut self, vm_id: u32) {
        let attempt = *self.attempts.entry(vm_id).or_default();
        let datacenter = self.datacenters.get(attempt.datacenter).copied();
        let vm = self.vms.get(&vm_id).cloned();
        match (datacenter, vm) {
            (Some(datacenter), Some(vm)) => {
                log_debug!(
                    self.ctx,
                    "requesting creation of vm {} in datacenter {} (round {})",
                    vm_id,
                    datacenter,
                    attempt.round
                );
                self.ctx
                    .emit(VmCreateRequest { vm }, datacenter, self.sim_config.message_delay);
                self.awaiting_replies += 1;
                self.wait_for_replies();
            }
            _ => {
                log_warn!(self.ctx, "no datacenter to create vm {}", vm_id);
                self.mark_failed(vm_id);
            }
        }
    }

    // Defers all events except replies to VM creation requests.
    fn wait_for_replies(&mut self) {
        if self.awaiting_replies > 0 {
            self.ctx.wait_for(EventPredicate::OfTag(vec![
                EventTag::VmCreated.id(),
                EventTag::VmCreationFailed.id(),
            ]));
        }
    }

    fn mark_failed(&mut self, vm_id: u32) {
        self.attempts.remove(&vm_id);
        self.created.remove(&vm_id);
        self.destroying.remove(&vm_id);
        self.failed_vms.push(vm_id);
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.set_status(VmStatus::Failed);
        }
    }

    fn on_vm_created(&mut self, vm_id: u32, host_id: u32, datacenter_id: u32) {
        self.awaiting_replies = self.awaiting_replies.saturating_sub(1);
        self.attempts.remove(&vm_id);
        self.created.insert(vm_id, VmLocation { datacenter_id, host_id });
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.host_id = Some(host_id);
            vm.set_status(VmStatus::Running);
        }
        log_info!(
            self.ctx,
            "vm {} created in datacenter {} on host {}",
            vm_id,
            datacenter_id,
            host_id
        );
        self.wait_for_replies();
        self.submit_cloudlets();
    }

    fn on_vm_creation_failed(&mut self, vm_id: u32) {
        self.awaiting_replies = self.awaiting_replies.saturating_sub(1);
        let mut attempt = self.attempts.get(&vm_id).copied().unwrap_or_default();
        attempt.datacenter += 1;
        if attempt.datacenter < self.datacenters.len() {
            self.attempts.insert(vm_id, attempt);
            self.request_creation(vm_id);
        } else {
            attempt.round += 1;
            attempt.datacenter = 0;
            if attempt.round > self.sim_config.vm_creation_max_retries {
                log_warn!(
                    self.ctx,
                    "vm {} is not created after {} retries",
                    vm_id,
                    self.sim_config.vm_creation_max_retries
                );
                self.mark_failed(vm_id);
            } else {
                let delay = self.sim_config.retry_delay(attempt.round);
                log_debug!(self.ctx, "retrying creation of vm {} in {:.3}", vm_id, delay);
                self.attempts.insert(vm_id, attempt);
                self.retries_pending += 1;
                self.ctx.emit_self(VmCreationRetry { vm_id }, delay);
            }
        }
        self.wait_for_replies();
        self.submit_cloudlets();
    }

    // Cloudlets ///////////////////////////////////////////////////////////////////////////////////////////////////////

    fn submit_cloudlets(&mut self) {
        if !self.started || self.creation_in_progress() {
            return;
        }
        let available: Vec<u32> = self
            .created
            .keys()
            .filter(|vm_id| !self.destroying.contains(*vm_id))
            .copied()
            .collect();
        let pending: Vec<Cloudlet> = self.pending_cloudlets.drain(..).collect();
        for mut cloudlet in pending {
            let target = match cloudlet.vm_id {
                Some(vm_id) if available.contains(&vm_id) => Some(vm_id),
                Some(_) => None,
                None if !available.is_empty() => {
                    let vm_id = available[self.next_vm % available.len()];
                    self.next_vm += 1;
                    Some(vm_id)
                }
                None => None,
            };
            match target.and_then(|vm_id| self.created.get(&vm_id).map(|loc| (vm_id, loc.datacenter_id))) {
                Some((vm_id, datacenter)) => {
                    cloudlet.vm_id = Some(vm_id);
                    if let Some(event_id) = self.idle_checks.remove(&vm_id) {
                        self.ctx.cancel_event(event_id);
                    }
                    self.in_flight.insert(cloudlet.id, vm_id);
                    log_debug!(self.ctx, "submitting cloudlet {} to vm {}", cloudlet.id, vm_id);
                    self.ctx
                        .emit(CloudletSubmit { cloudlet }, datacenter, self.sim_config.message_delay);
                }
                None => {
                    log_warn!(self.ctx, "no vm available for cloudlet {}", cloudlet.id);
                    cloudlet.set_status(CloudletStatus::Failed);
                    cloudlet.set_finish_time(self.ctx.time());
                    self.returned.push(cloudlet);
                }
            }
        }
        self.check_completion();
    }

    fn on_cloudlet_returned(&mut self, cloudlet: Cloudlet) {
        let vm_id = self.in_flight.remove(&cloudlet.id);
        log_info!(
            self.ctx,
            "cloudlet {} is {} on vm {:?}",
            cloudlet.id,
            cloudlet.status(),
            cloudlet.vm_id
        );
        self.returned.push(cloudlet);
        if let (Some(vm_id), Some(delay)) = (vm_id, self.sim_config.vm_destruction_delay) {
            if self.created.contains_key(&vm_id) && !self.in_flight.values().any(|id| *id == vm_id) {
                if let Some(event_id) = self.idle_checks.remove(&vm_id) {
                    self.ctx.cancel_event(event_id);
                }
                let event_id = self.ctx.emit_self(VmIdleCheck { vm_id }, delay);
                self.idle_checks.insert(vm_id, event_id);
            }
        }
        self.check_completion();
    }

    // VM destruction //////////////////////////////////////////////////////////////////////////////////////////////////

    fn destroy_vm(&mut self, vm_id: u32) {
        if self.destroying.contains(&vm_id) {
            return;
        }
        if let Some(event_id) = self.idle_checks.remove(&vm_id) {
            self.ctx.cancel_event(event_id);
        }
        if let Some(location) = self.created.get(&vm_id) {
            log_debug!(self.ctx, "destroying vm {}", vm_id);
            self.ctx.emit(
                VmDestroyRequest { vm_id },
                location.datacenter_id,
                self.sim_config.message_delay,
            );
            self.destroying.insert(vm_id);
        }
    }

    fn on_vm_idle_check(&mut self, vm_id: u32) {
        self.idle_checks.remove(&vm_id);
        let busy = self.in_flight.values().any(|id| *id == vm_id)
            || self.pending_cloudlets.iter().any(|c| c.vm_id == Some(vm_id));
        if !busy {
            log_info!(self.ctx, "vm {} is idle", vm_id);
            self.destroy_vm(vm_id);
        }
        self.check_completion();
    }

    fn on_vm_destroyed(&mut self, vm_id: u32) {
        self.created.remove(&vm_id);
        self.destroying.remove(&vm_id);
        self.destroyed_vms.push(vm_id);
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.set_status(VmStatus::Finished);
        }
        self.check_completion();
    }

    fn on_vm_failed(&mut self, vm_id: u32, host_id: u32) {
        log_warn!(self.ctx, "vm {} failed on host {}", vm_id, host_id);
        self.mark_failed(vm_id);
        self.check_completion();
    }

    // Destroys the remaining VMs and finishes once all work is done.
    fn check_completion(&mut self) {
        if !self.started || self.creation_in_progress() {
            return;
        }
        // nothing submitted yet, keep waiting for delayed submissions
        if self.vms.is_empty() && self.returned.is_empty() {
            return;
        }
        if !self.pending_cloudlets.is_empty() || !self.in_flight.is_empty() {
            return;
        }
        // submissions received while waiting for VM creation are not processed yet
        if self.ctx.count_deferred(&EventPredicate::Any) > 0 {
            return;
        }
        let remaining: Vec<u32> = self.created.keys().copied().collect();
        for vm_id in remaining {
            self.destroy_vm(vm_id);
        }
        if self.created.is_empty() {
            log_info!(
                self.ctx,
                "all work is done: {} cloudlets returned, {} vms failed",
                self.returned.len(),
                self.failed_vms.len()
            );
            self.ctx.finish();
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreated {
                vm_id,
                host_id,
                datacenter_id,
            } => {
                self.on_vm_created(vm_id, host_id, datacenter_id);
            }
            VmCreationFailed { vm_id, reason } => {
                log_debug!(self.ctx, "vm {} creation failed: {}", vm_id, reason);
                self.on_vm_creation_failed(vm_id);
            }
            VmCreationRetry { vm_id } => {
                self.retries_pending = self.retries_pending.saturating_sub(1);
                self.request_creation(vm_id);
            }
            CloudletReturned { cloudlet } => {
                self.on_cloudlet_returned(cloudlet);
            }
            VmIdleCheck { vm_id } => {
                self.on_vm_idle_check(vm_id);
            }
            VmDestroyed { vm_id } => {
                self.on_vm_destroyed(vm_id);
            }
            VmFailed { vm_id, host_id } => {
                self.on_vm_failed(vm_id, host_id);
            }
            VmListSubmitted { vms } => {
                self.submit_vm_list(vms);
            }
            CloudletListSubmitted { cloudlets, vm_id } => {
                self.submit_cloudlet_list(cloudlets, vm_id);
            }
        })
    }

    fn on_start(&mut self) {
        self.started = true;
        let vm_ids: Vec<u32> = self.vms.keys().copied().collect();
        for vm_id in vm_ids {
            self.request_creation(vm_id);
        }
        self.submit_cloudlets();
    }
}
