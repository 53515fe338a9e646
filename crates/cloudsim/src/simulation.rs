//! Simulation facade: builds datacenters and brokers, submits work and drives the simulation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use simcore::context::SimulationContext;
use simcore::simulation::Simulation;
use simcore::EntityState;

use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_scheduler::CloudletSchedulingPolicy;
use crate::core::config::sim_config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::events::broker::{CloudletListSubmitted, VmListSubmitted};
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume};
use crate::core::events::datacenter::HostFailure;
use crate::core::events::migration::VmMigrate;
use crate::core::events::register_event_tags;
use crate::core::host::Host;
use crate::core::id_allocator::IdAllocator;
use crate::core::migration::policy::MigrationPolicy;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;
use crate::core::vm_scheduler::VmSchedulingPolicy;
use crate::error::{SimError, SimResult};

pub struct CloudSimulation {
    datacenters: BTreeMap<u32, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<u32, Rc<RefCell<Broker>>>,
    ids: IdAllocator,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Self {
        register_event_tags(&mut sim);
        if let Some(time) = sim_config.terminate_at {
            sim.terminate_at(time);
        }
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            ids: IdAllocator::new(),
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    // Building blocks /////////////////////////////////////////////////////////////////////////////////////////////////

    /// Creates host with identical PEs and the next free host id.
    pub fn create_host(
        &mut self,
        pes: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        policy: VmSchedulingPolicy,
    ) -> SimResult<Host> {
        Host::with_uniform_pes(
            self.ids.next_host_id(),
            pes,
            pe_mips,
            ram,
            bw,
            storage,
            policy,
            self.sim_config.vm_migration_overhead,
        )
    }

    /// Creates VM with the next free VM id.
    pub fn create_vm(
        &mut self,
        pes: u32,
        mips: f64,
        ram: u64,
        bw: u64,
        size: u64,
        policy: CloudletSchedulingPolicy,
    ) -> SimResult<Vm> {
        let mut vm = Vm::new(self.ids.next_vm_id(), pes, mips, ram, bw, size, policy)?;
        vm.set_history_length(self.sim_config.utilization_history_length);
        Ok(vm)
    }

    /// Creates cloudlet with the next free cloudlet id.
    pub fn create_cloudlet(&mut self, length: f64, pes: u32) -> SimResult<Cloudlet> {
        Cloudlet::new(self.ids.next_cloudlet_id(), length, pes)
    }

    pub fn add_datacenter(
        &mut self,
        name: &str,
        hosts: Vec<Host>,
        allocation_policy: VmAllocationPolicy,
        migration_policy: Option<MigrationPolicy>,
    ) -> u32 {
        let datacenter = rc!(refcell!(Datacenter::new(
            hosts,
            allocation_policy,
            migration_policy,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        id
    }

    /// Creates datacenter with hosts, placement algorithm and migration policy from the simulation config.
    pub fn add_datacenter_from_config(&mut self, name: &str) -> SimResult<u32> {
        let configs = self.sim_config.hosts.clone();
        let mut hosts = Vec::new();
        for config in configs.iter() {
            for host_name in config.host_names() {
                let host = self.create_host(
                    config.pes,
                    config.pe_mips,
                    config.ram,
                    config.bw,
                    config.storage,
                    config.vm_scheduler.unwrap_or(VmSchedulingPolicy::TimeShared),
                )?;
                hosts.push(match host_name {
                    Some(host_name) => host.with_name(&host_name),
                    None => host,
                });
            }
        }
        let allocation_policy = VmAllocationPolicy::from_str(&self.sim_config.vm_allocation)?;
        let migration_policy = match &self.sim_config.migration {
            Some(config) => Some(MigrationPolicy::from_config(config)?),
            None => None,
        };
        Ok(self.add_datacenter(name, hosts, allocation_policy, migration_policy))
    }

    /// Creates broker which tries the datacenters in the given order.
    pub fn add_broker(&mut self, name: &str, datacenters: Vec<u32>) -> u32 {
        let broker = rc!(refcell!(Broker::new(
            datacenters,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    // Control /////////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn submit_vms(&mut self, broker_id: u32, vms: Vec<Vm>) -> SimResult<()> {
        self.broker_rc(broker_id)?.borrow_mut().submit_vm_list(vms);
        Ok(())
    }

    pub fn submit_cloudlets(&mut self, broker_id: u32, cloudlets: Vec<Cloudlet>, vm_id: Option<u32>) -> SimResult<()> {
        self.broker_rc(broker_id)?
            .borrow_mut()
            .submit_cloudlet_list(cloudlets, vm_id);
        Ok(())
    }

    /// Submits VMs to the broker at the given simulation time.
    pub fn submit_vms_with_delay(&mut self, broker_id: u32, vms: Vec<Vm>, delay: f64) {
        self.ctx.emit(VmListSubmitted { vms }, broker_id, delay);
    }

    /// Submits cloudlets to the broker at the given simulation time.
    pub fn submit_cloudlets_with_delay(
        &mut self,
        broker_id: u32,
        cloudlets: Vec<Cloudlet>,
        vm_id: Option<u32>,
        delay: f64,
    ) {
        self.ctx
            .emit(CloudletListSubmitted { cloudlets, vm_id }, broker_id, delay);
    }

    /// Fails `pes` PEs of the host (all of them if `None`) after the delay.
    pub fn fail_host(&mut self, datacenter_id: u32, host_id: u32, pes: Option<u32>, delay: f64) {
        self.ctx.emit(HostFailure { host_id, pes }, datacenter_id, delay);
    }

    /// Requests migration of the VM after the delay, target host is chosen by allocation policy if not set.
    pub fn migrate_vm(&mut self, datacenter_id: u32, vm_id: u32, target_host: Option<u32>, delay: f64) {
        self.ctx.emit(VmMigrate { vm_id, target_host }, datacenter_id, delay);
    }

    pub fn pause_cloudlet(&mut self, datacenter_id: u32, vm_id: u32, cloudlet_id: u32, delay: f64) {
        self.ctx
            .emit(CloudletPause { cloudlet_id, vm_id }, datacenter_id, delay);
    }

    pub fn resume_cloudlet(&mut self, datacenter_id: u32, vm_id: u32, cloudlet_id: u32, delay: f64) {
        self.ctx
            .emit(CloudletResume { cloudlet_id, vm_id }, datacenter_id, delay);
    }

    pub fn cancel_cloudlet(&mut self, datacenter_id: u32, vm_id: u32, cloudlet_id: u32, delay: f64) {
        self.ctx
            .emit(CloudletCancel { cloudlet_id, vm_id }, datacenter_id, delay);
    }

    // Stepping ////////////////////////////////////////////////////////////////////////////////////////////////////////

    /// Runs the simulation until there is no work left or the time limit is reached.
    pub fn run(&mut self) {
        self.sim.run()
    }

    /// Performs a single step through the simulation.
    pub fn step(&mut self) -> bool {
        self.sim.step()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events()
    }

    // Accessors ///////////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn datacenter(&self, datacenter_id: u32) -> Option<Rc<RefCell<Datacenter>>> {
        self.datacenters.get(&datacenter_id).cloned()
    }

    pub fn broker(&self, broker_id: u32) -> Option<Rc<RefCell<Broker>>> {
        self.brokers.get(&broker_id).cloned()
    }

    pub fn is_broker_finished(&self, broker_id: u32) -> bool {
        self.sim.entity_state(broker_id) == Some(EntityState::Finished)
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    fn broker_rc(&self, broker_id: u32) -> SimResult<Rc<RefCell<Broker>>> {
        self.broker(broker_id).ok_or(SimError::NotFound {
            kind: "broker",
            id: broker_id,
        })
    }
}
