//! Datacenter entity which owns hosts and executes VMs and cloudlets.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::{Event, EventId};
use simcore::handler::EventHandler;
use simcore::{log_debug, log_info, log_trace, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::common::AllocationVerdict;
use crate::core::config::sim_config::SimulationConfig;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturned, CloudletSubmit};
use crate::core::events::datacenter::{HostFailure, SchedulingTick, UpdateProcessing};
use crate::core::events::migration::{VmMigrate, VmMigrationFinished};
use crate::core::events::vm::{VmCreateRequest, VmCreated, VmCreationFailed, VmDestroyRequest, VmDestroyed, VmFailed};
use crate::core::host::Host;
use crate::core::migration::overload_detector::OverloadDetector;
use crate::core::migration::policy::MigrationPolicy;
use crate::core::vm::{Vm, VmStatus};
use crate::core::vm_allocation_policy::VmAllocationPolicy;
use crate::error::SimError;

/// VM migration which is in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InFlightMigration {
    pub source_host: u32,
    pub target_host: u32,
    pub start_time: f64,
    event_id: EventId,
}

/// Datacenter exclusively owns its hosts and mutates their state in response to events.
///
/// Cloudlet processing is event-driven: after each state change the datacenter advances all cloudlets to the
/// current time and schedules the next [`UpdateProcessing`] at the earliest cloudlet completion, retracting the
/// previously scheduled one. While there is work, [`SchedulingTick`] is emitted every scheduling interval to sample
/// VM utilization and, if migration policy is set, to consolidate VMs.
pub struct Datacenter {
    pub id: u32,
    hosts: BTreeMap<u32, Host>,
    allocation_policy: VmAllocationPolicy,
    migration_policy: Option<MigrationPolicy>,
    migrations: BTreeMap<u32, InFlightMigration>,
    failed_vms: Vec<u32>,
    migration_count: u64,
    update_event: Option<EventId>,
    tick_event: Option<EventId>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        hosts: Vec<Host>,
        allocation_policy: VmAllocationPolicy,
        migration_policy: Option<MigrationPolicy>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            hosts: hosts.into_iter().map(|host| (host.id, host)).collect(),
            allocation_policy,
            migration_policy,
            migrations: BTreeMap::new(),
            failed_vms: Vec::new(),
            migration_count: 0,
            update_event: None,
            tick_event: None,
            ctx,
            sim_config,
        }
    }

    pub fn hosts(&self) -> &BTreeMap<u32, Host> {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    /// Returns ID of the host where the VM resides (the source host for migrating VM).
    pub fn vm_host(&self, vm_id: u32) -> Option<u32> {
        self.hosts.values().find(|host| host.vm(vm_id).is_some()).map(|host| host.id)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.hosts.values().find_map(|host| host.vm(vm_id))
    }

    pub fn failed_vms(&self) -> &[u32] {
        &self.failed_vms
    }

    /// Number of completed migrations.
    pub fn migration_count(&self) -> u64 {
        self.migration_count
    }

    pub fn migration(&self, vm_id: u32) -> Option<&InFlightMigration> {
        self.migrations.get(&vm_id)
    }

    pub fn migrations_in_progress(&self) -> usize {
        self.migrations.len()
    }

    // Processing //////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Advances cloudlets on all hosts to the current time and reschedules the next update.
    fn update_processing(&mut self) {
        let time = self.ctx.time();
        let mut next: Option<f64> = None;
        for host in self.hosts.values_mut() {
            if let Some(delay) = host.update_processing(time) {
                next = Some(next.map_or(delay, |n| n.min(delay)));
            }
        }
        let finished: Vec<Cloudlet> = self
            .hosts
            .values_mut()
            .flat_map(|host| host.take_finished_cloudlets())
            .collect();
        self.return_cloudlets(finished);

        if let Some(event_id) = self.update_event.take() {
            self.ctx.cancel_event(event_id);
        }
        if let Some(delay) = next {
            let delay = delay.max(self.sim_config.min_time_between_events);
            self.update_event = Some(self.ctx.emit_self(UpdateProcessing {}, delay));
        }
        self.update_tick();
    }

    fn has_work(&self) -> bool {
        !self.migrations.is_empty() || self.hosts.values().any(|host| host.has_unfinished_cloudlets())
    }

    // Keeps the periodic tick scheduled only while there is work.
    fn update_tick(&mut self) {
        let has_work = self.has_work();
        if has_work && self.tick_event.is_none() {
            self.tick_event = Some(self.ctx.emit_self(SchedulingTick {}, self.sim_config.scheduling_interval));
        } else if !has_work {
            if let Some(event_id) = self.tick_event.take() {
                self.ctx.cancel_event(event_id);
            }
        }
    }

    fn return_cloudlets(&mut self, cloudlets: Vec<Cloudlet>) {
        for cloudlet in cloudlets {
            log_debug!(
                self.ctx,
                "cloudlet {} on vm {:?} is {}",
                cloudlet.id,
                cloudlet.vm_id,
                cloudlet.status()
            );
            match cloudlet.broker_id {
                Some(broker) => {
                    self.ctx
                        .emit(CloudletReturned { cloudlet }, broker, self.sim_config.message_delay);
                }
                None => log_warn!(self.ctx, "cloudlet {} has no broker to return to", cloudlet.id),
            }
        }
    }

    fn on_scheduling_tick(&mut self) {
        self.tick_event = None;
        self.update_processing();
        let time = self.ctx.time();
        for host in self.hosts.values_mut() {
            host.record_utilization(time);
        }
        if self.migration_policy.is_some() {
            self.consolidate();
            self.update_processing();
        }
    }

    // VMs /////////////////////////////////////////////////////////////////////////////////////////////////////////////

    fn on_vm_create_request(&mut self, mut vm: Vm, src: u32) {
        let vm_id = vm.id;
        let broker = *vm.broker_id.get_or_insert(src);
        if self.vm_host(vm_id).is_some() {
            log_warn!(self.ctx, "vm {} already exists", vm_id);
            return;
        }
        vm.set_history_length(self.sim_config.utilization_history_length);
        self.update_processing();
        match self.allocation_policy.place_vm(vm, &mut self.hosts) {
            Ok(host_id) => {
                log_info!(self.ctx, "vm {} created on host {}", vm_id, host_id);
                self.ctx.emit(
                    VmCreated {
                        vm_id,
                        host_id,
                        datacenter_id: self.id,
                    },
                    broker,
                    self.sim_config.message_delay,
                );
            }
            Err(e) => {
                log_debug!(self.ctx, "vm {} is not created: {}", vm_id, e);
                let reason = match e {
                    SimError::PlacementFailure { reason, .. } => reason,
                    _ => AllocationVerdict::NoSuitableHost,
                };
                self.ctx
                    .emit(VmCreationFailed { vm_id, reason }, broker, self.sim_config.message_delay);
            }
        }
        self.update_processing();
    }

    fn on_vm_destroy_request(&mut self, vm_id: u32, src: u32) {
        self.update_processing();
        self.abort_migration(vm_id);
        let vm = self
            .vm_host(vm_id)
            .and_then(|host_id| self.hosts.get_mut(&host_id))
            .and_then(|host| host.remove_vm(vm_id));
        match vm {
            Some(mut vm) => {
                vm.set_status(VmStatus::Finished);
                vm.cloudlet_scheduler_mut().cancel_all(self.ctx.time());
                let canceled = vm.cloudlet_scheduler_mut().take_finished();
                self.return_cloudlets(canceled);
                log_info!(self.ctx, "vm {} destroyed", vm_id);
                self.ctx.emit(
                    VmDestroyed { vm_id },
                    vm.broker_id.unwrap_or(src),
                    self.sim_config.message_delay,
                );
            }
            None => log_warn!(self.ctx, "can't destroy unknown vm {}", vm_id),
        }
        self.update_processing();
    }

    fn fail_vms(&mut self, host_id: u32, vm_ids: Vec<u32>) {
        let time = self.ctx.time();
        for vm_id in vm_ids {
            if let Some(migration) = self.abort_migration(vm_id) {
                // the VM keeps running on the source, only the reservation is lost
                if migration.target_host == host_id {
                    continue;
                }
            }
            let vm = self.hosts.get_mut(&host_id).and_then(|host| host.remove_vm(vm_id));
            if let Some(mut vm) = vm {
                vm.set_status(VmStatus::Failed);
                self.failed_vms.push(vm_id);
                log_warn!(self.ctx, "vm {} failed on host {}", vm_id, host_id);
                if let Some(broker) = vm.broker_id {
                    self.ctx
                        .emit(VmFailed { vm_id, host_id }, broker, self.sim_config.message_delay);
                }
                vm.cloudlet_scheduler_mut().fail_all(time);
                let failed = vm.cloudlet_scheduler_mut().take_finished();
                self.return_cloudlets(failed);
            }
        }
    }

    fn on_host_failure(&mut self, host_id: u32, pes: Option<u32>) {
        self.update_processing();
        let affected = match self.hosts.get_mut(&host_id) {
            Some(host) => host.fail_pes(pes.map(|count| count as usize)),
            None => {
                log_warn!(self.ctx, "can't fail unknown host {}", host_id);
                return;
            }
        };
        log_warn!(
            self.ctx,
            "host {} failure, {} vms affected",
            host_id,
            affected.len()
        );
        self.fail_vms(host_id, affected);
        self.update_processing();
    }

    // Cloudlets ///////////////////////////////////////////////////////////////////////////////////////////////////////

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet, src: u32) {
        cloudlet.broker_id.get_or_insert(src);
        self.update_processing();
        let time = self.ctx.time();
        let cloudlet_id = cloudlet.id;
        let location = cloudlet
            .vm_id
            .and_then(|vm_id| self.vm_host(vm_id).map(|host_id| (host_id, vm_id)));
        match location {
            Some((host_id, vm_id)) => {
                if let Some(vm) = self.hosts.get_mut(&host_id).and_then(|host| host.vm_mut(vm_id)) {
                    if vm.cloudlet_scheduler_mut().submit(cloudlet, time) {
                        log_trace!(self.ctx, "cloudlet {} submitted to vm {}", cloudlet_id, vm_id);
                    } else {
                        log_warn!(self.ctx, "cloudlet {} can't run on vm {}", cloudlet_id, vm_id);
                    }
                }
            }
            None => {
                log_warn!(self.ctx, "cloudlet {} is bound to unknown vm {:?}", cloudlet_id, cloudlet.vm_id);
                cloudlet.set_status(CloudletStatus::Failed);
                cloudlet.set_finish_time(time);
                self.return_cloudlets(vec![cloudlet]);
            }
        }
        self.update_processing();
    }

    fn with_cloudlet_vm<F>(&mut self, vm_id: u32, cloudlet_id: u32, op: &str, f: F)
    where
        F: FnOnce(&mut Vm, f64) -> bool,
    {
        self.update_processing();
        let time = self.ctx.time();
        let done = self
            .vm_host(vm_id)
            .and_then(|host_id| self.hosts.get_mut(&host_id))
            .and_then(|host| host.vm_mut(vm_id))
            .map_or(false, |vm| f(vm, time));
        if done {
            log_debug!(self.ctx, "{} cloudlet {} on vm {}", op, cloudlet_id, vm_id);
        } else {
            log_warn!(self.ctx, "can't {} cloudlet {} on vm {}", op, cloudlet_id, vm_id);
        }
        self.update_processing();
    }

    // Migration ///////////////////////////////////////////////////////////////////////////////////////////////////////

    // Reserves resources on the target host for the resident migratable VM.
    fn reserve_migration(&mut self, vm_id: u32, source_host: u32, target_host: u32) -> AllocationVerdict {
        if source_host == target_host || self.migrations.contains_key(&vm_id) {
            return AllocationVerdict::NoSuitableHost;
        }
        let vm = match self.hosts.get(&source_host).and_then(|host| host.vm(vm_id)) {
            Some(vm) if vm.is_migratable() => vm.clone(),
            _ => return AllocationVerdict::NoSuitableHost,
        };
        match self.hosts.get_mut(&target_host) {
            Some(host) => host.reserve_for_migration(&vm),
            None => AllocationVerdict::HostNotFound,
        }
    }

    // Starts the reserved migration, the VM is transferred after its RAM is copied to the target host.
    fn commit_migration(&mut self, vm_id: u32, source_host: u32, target_host: u32) {
        let ram = self.vm(vm_id).map_or(0, |vm| vm.ram);
        let bw = self.hosts.get(&target_host).map_or(0, |host| host.bw().capacity());
        let throughput = bw as f64 * self.sim_config.migration_bandwidth_share;
        let delay = if throughput > 0. {
            ram as f64 * 8. / throughput
        } else {
            log_warn!(self.ctx, "host {} has no bandwidth, vm {} is moved instantly", target_host, vm_id);
            0.
        };
        if let Some(host) = self.hosts.get_mut(&source_host) {
            host.start_migration_out(vm_id);
        }
        let event_id = self.ctx.emit_self(
            VmMigrationFinished {
                vm_id,
                source_host,
                target_host,
            },
            delay,
        );
        self.migrations.insert(
            vm_id,
            InFlightMigration {
                source_host,
                target_host,
                start_time: self.ctx.time(),
                event_id,
            },
        );
        log_info!(
            self.ctx,
            "migration of vm {} from host {} to host {} started, duration {:.3}",
            vm_id,
            source_host,
            target_host,
            delay
        );
    }

    fn abort_migration(&mut self, vm_id: u32) -> Option<InFlightMigration> {
        let migration = self.migrations.remove(&vm_id)?;
        self.ctx.cancel_event(migration.event_id);
        if let Some(host) = self.hosts.get_mut(&migration.target_host) {
            host.cancel_migration_reservation(vm_id);
        }
        if let Some(host) = self.hosts.get_mut(&migration.source_host) {
            host.abort_migration_out(vm_id);
        }
        log_info!(self.ctx, "migration of vm {} aborted", vm_id);
        Some(migration)
    }

    fn on_vm_migrate(&mut self, vm_id: u32, target_host: Option<u32>) {
        let source_host = match self.vm_host(vm_id) {
            Some(host_id) => host_id,
            None => {
                log_warn!(self.ctx, "can't migrate unknown vm {}", vm_id);
                return;
            }
        };
        let target_host = match target_host {
            Some(host_id) => host_id,
            None => {
                let excluded: BTreeSet<u32> = [source_host].into_iter().collect();
                let selected = match self.hosts.get(&source_host).and_then(|host| host.vm(vm_id)) {
                    Some(vm) => self.allocation_policy.allocate_host_for_vm(vm, &self.hosts, &excluded),
                    None => return,
                };
                match selected {
                    Ok(host_id) => host_id,
                    Err(e) => {
                        log_warn!(self.ctx, "can't migrate vm {}: {}", vm_id, e);
                        return;
                    }
                }
            }
        };
        self.update_processing();
        match self.reserve_migration(vm_id, source_host, target_host) {
            AllocationVerdict::Success => self.commit_migration(vm_id, source_host, target_host),
            verdict => log_warn!(
                self.ctx,
                "can't migrate vm {} from host {} to host {}: {}",
                vm_id,
                source_host,
                target_host,
                verdict
            ),
        }
        self.update_processing();
    }

    fn on_vm_migration_finished(&mut self, vm_id: u32, source_host: u32, target_host: u32) {
        self.update_processing();
        self.migrations.remove(&vm_id);
        let reserved = self
            .hosts
            .get(&target_host)
            .map_or(false, |host| host.is_migrating_in(vm_id));
        let vm = if reserved {
            self.hosts.get_mut(&source_host).and_then(|host| host.remove_vm(vm_id))
        } else {
            None
        };
        match vm {
            Some(vm) => {
                if let Some(host) = self.hosts.get_mut(&target_host) {
                    host.complete_migration_in(vm);
                }
                self.migration_count += 1;
                log_info!(
                    self.ctx,
                    "vm {} migrated from host {} to host {}",
                    vm_id,
                    source_host,
                    target_host
                );
            }
            None => {
                log_warn!(self.ctx, "migration of vm {} can't be completed", vm_id);
                if let Some(host) = self.hosts.get_mut(&target_host) {
                    host.cancel_migration_reservation(vm_id);
                }
                if let Some(host) = self.hosts.get_mut(&source_host) {
                    host.abort_migration_out(vm_id);
                }
            }
        }
        self.update_processing();
    }

    // Consolidation ///////////////////////////////////////////////////////////////////////////////////////////////////

    fn vm_demand(&self, host_id: u32, vm_id: u32, time: f64) -> f64 {
        self.hosts
            .get(&host_id)
            .and_then(|host| host.vm(vm_id))
            .map_or(0., |vm| vm.current_requested_mips(time))
    }

    // Demand of VMs migrating to the host which is not yet granted there.
    fn incoming_mips(&self, host_id: u32, time: f64) -> f64 {
        let host = match self.hosts.get(&host_id) {
            Some(host) => host,
            None => return 0.,
        };
        self.migrations
            .iter()
            .filter(|(_, m)| m.target_host == host_id)
            .map(|(vm_id, m)| {
                let granted = host.vm_scheduler().total_allocated_mips_for_vm(*vm_id);
                (self.vm_demand(m.source_host, *vm_id, time) - granted).max(0.)
            })
            .sum()
    }

    // Selects host for migrating VM which is not excluded and does not become overloaded after the migration.
    fn find_migration_target(
        &mut self,
        detector: &OverloadDetector,
        vm_id: u32,
        source_host: u32,
        excluded: &BTreeSet<u32>,
        planned_mips: &BTreeMap<u32, f64>,
        time: f64,
    ) -> Option<u32> {
        let vm = self.hosts.get(&source_host)?.vm(vm_id)?;
        let mut excluded = excluded.clone();
        excluded.insert(source_host);
        loop {
            let target = self
                .allocation_policy
                .allocate_host_for_vm(vm, &self.hosts, &excluded)
                .ok()?;
            let host = self.hosts.get(&target)?;
            let planned = planned_mips.get(&target).copied().unwrap_or(0.) + self.incoming_mips(target, time);
            let projected = (host.used_mips(time) + planned + vm.current_requested_mips(time)) / host.total_mips();
            if !detector.is_overloaded(projected, &host.utilization_history()) {
                return Some(target);
            }
            excluded.insert(target);
        }
    }

    /// Migrates VMs away from overloaded hosts and drains underloaded hosts.
    fn consolidate(&mut self) {
        let mut policy = match self.migration_policy.take() {
            Some(policy) => policy,
            None => return,
        };
        let time = self.ctx.time();

        let busy: BTreeSet<u32> = self
            .migrations
            .values()
            .flat_map(|m| [m.source_host, m.target_host])
            .collect();
        let utilization: BTreeMap<u32, f64> = self
            .hosts
            .values()
            .filter(|host| !host.is_failed())
            .map(|host| (host.id, host.cpu_utilization(time)))
            .collect();
        let overloaded: BTreeSet<u32> = self
            .hosts
            .values()
            .filter(|host| {
                utilization
                    .get(&host.id)
                    .map_or(false, |u| policy.detector.is_overloaded(*u, &host.utilization_history()))
            })
            .map(|host| host.id)
            .collect();

        // select VMs to migrate from overloaded hosts

        let mut to_migrate: Vec<(u32, u32)> = Vec::new();
        for host_id in overloaded.iter() {
            // already relieved by in-flight migration
            if busy.contains(host_id) {
                continue;
            }
            let host = match self.hosts.get(host_id) {
                Some(host) => host,
                None => continue,
            };
            let history = host.utilization_history();
            let mut selected: Vec<u32> = Vec::new();
            loop {
                let candidates: Vec<&Vm> = host.vms().filter(|vm| !selected.contains(&vm.id)).collect();
                match policy.selection.select_vm(&candidates, time) {
                    Some(vm_id) => selected.push(vm_id),
                    None => break,
                }
                if !policy
                    .detector
                    .is_overloaded(host.projected_utilization(time, &selected, &[]), &history)
                {
                    break;
                }
            }
            log_debug!(
                self.ctx,
                "host {} is overloaded ({:.3}), selected vms {:?}",
                host_id,
                utilization.get(host_id).copied().unwrap_or(0.),
                selected
            );
            to_migrate.extend(selected.into_iter().map(|vm_id| (vm_id, *host_id)));
        }
        to_migrate.sort_by(|a, b| {
            self.vm_demand(b.1, b.0, time)
                .total_cmp(&self.vm_demand(a.1, a.0, time))
        });

        // place them avoiding overloaded hosts

        let mut planned_mips: BTreeMap<u32, f64> = BTreeMap::new();
        let mut sources: BTreeSet<u32> = BTreeSet::new();
        let mut targets: BTreeSet<u32> = BTreeSet::new();
        for (vm_id, source_host) in to_migrate {
            let target = self.find_migration_target(
                &policy.detector,
                vm_id,
                source_host,
                &overloaded,
                &planned_mips,
                time,
            );
            match target {
                Some(target_host) => {
                    if self.reserve_migration(vm_id, source_host, target_host) == AllocationVerdict::Success {
                        self.commit_migration(vm_id, source_host, target_host);
                        sources.insert(source_host);
                        targets.insert(target_host);
                    }
                }
                None => log_debug!(
                    self.ctx,
                    "no suitable target to migrate vm {} from host {}",
                    vm_id,
                    source_host
                ),
            }
        }

        // drain underloaded hosts, all or nothing

        let mut underloaded: Vec<(u32, f64)> = utilization
            .iter()
            .filter(|(id, u)| {
                policy.is_underloaded(**u)
                    && !overloaded.contains(*id)
                    && !busy.contains(*id)
                    && !sources.contains(*id)
                    && !targets.contains(*id)
                    && self.hosts.get(*id).map_or(false, |host| host.vm_count() > 0)
            })
            .map(|(id, u)| (*id, *u))
            .collect();
        underloaded.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut drained: BTreeSet<u32> = BTreeSet::new();
        for (host_id, load) in underloaded {
            if targets.contains(&host_id) {
                continue;
            }
            let mut vm_ids = match self.hosts.get(&host_id) {
                Some(host) if host.vms().all(|vm| vm.is_migratable()) => host.vm_ids(),
                _ => continue,
            };
            vm_ids.sort_by(|a, b| {
                self.vm_demand(host_id, *b, time)
                    .total_cmp(&self.vm_demand(host_id, *a, time))
            });
            let excluded: BTreeSet<u32> = overloaded.union(&drained).copied().collect();
            let mut plan: Vec<(u32, u32, f64)> = Vec::new();
            let mut complete = true;
            for vm_id in vm_ids {
                let demand = self.vm_demand(host_id, vm_id, time);
                let target =
                    self.find_migration_target(&policy.detector, vm_id, host_id, &excluded, &planned_mips, time);
                let target_host = match target {
                    Some(target_host) => target_host,
                    None => {
                        complete = false;
                        break;
                    }
                };
                if self.reserve_migration(vm_id, host_id, target_host) != AllocationVerdict::Success {
                    complete = false;
                    break;
                }
                *planned_mips.entry(target_host).or_default() += demand;
                plan.push((vm_id, target_host, demand));
            }
            if complete {
                log_debug!(self.ctx, "host {} is underloaded ({:.3}), draining", host_id, load);
                for (vm_id, target_host, _) in plan {
                    self.commit_migration(vm_id, host_id, target_host);
                    targets.insert(target_host);
                }
                drained.insert(host_id);
            } else {
                for (vm_id, target_host, demand) in plan {
                    if let Some(host) = self.hosts.get_mut(&target_host) {
                        host.cancel_migration_reservation(vm_id);
                    }
                    if let Some(planned) = planned_mips.get_mut(&target_host) {
                        *planned -= demand;
                    }
                }
            }
        }

        self.migration_policy = Some(policy);
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm } => {
                self.on_vm_create_request(vm, src);
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(vm_id, src);
            }
            CloudletSubmit { cloudlet } => {
                self.on_cloudlet_submit(cloudlet, src);
            }
            CloudletPause { cloudlet_id, vm_id } => {
                self.with_cloudlet_vm(vm_id, cloudlet_id, "pause", |vm, _| {
                    vm.cloudlet_scheduler_mut().pause(cloudlet_id)
                });
            }
            CloudletResume { cloudlet_id, vm_id } => {
                self.with_cloudlet_vm(vm_id, cloudlet_id, "resume", |vm, time| {
                    vm.cloudlet_scheduler_mut().resume(cloudlet_id, time)
                });
            }
            CloudletCancel { cloudlet_id, vm_id } => {
                self.with_cloudlet_vm(vm_id, cloudlet_id, "cancel", |vm, time| {
                    vm.cloudlet_scheduler_mut().cancel(cloudlet_id, time)
                });
            }
            UpdateProcessing {} => {
                self.update_event = None;
                self.update_processing();
            }
            SchedulingTick {} => {
                self.on_scheduling_tick();
            }
            VmMigrate { vm_id, target_host } => {
                self.on_vm_migrate(vm_id, target_host);
            }
            VmMigrationFinished {
                vm_id,
                source_host,
                target_host,
            } => {
                self.on_vm_migration_finished(vm_id, source_host, target_host);
            }
            HostFailure { host_id, pes } => {
                self.on_host_failure(host_id, pes);
            }
        })
    }
}
