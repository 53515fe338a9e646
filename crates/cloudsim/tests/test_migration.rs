use approx::assert_abs_diff_eq;

use simcore::simulation::Simulation;

use cloudsim::core::cloudlet::CloudletStatus;
use cloudsim::core::cloudlet_scheduler::CloudletSchedulingPolicy;
use cloudsim::core::config::sim_config::SimulationConfig;
use cloudsim::core::migration::utilization_history::UtilizationHistory;
use cloudsim::core::utilization_model::{ConstantUtilization, TraceUtilization};
use cloudsim::core::vm::VmStatus;
use cloudsim::core::vm_allocation_policy::VmAllocationPolicy;
use cloudsim::core::vm_scheduler::VmSchedulingPolicy;
use cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SAMPLES: [f64; 11] = [105., 109., 107., 112., 102., 118., 115., 104., 110., 116., 108.];

#[test]
// Scenario C: MAD of the samples equals the textbook value regardless of the storage order.
fn test_mad_of_history() {
    let history = UtilizationHistory::from_chronological(30, &SAMPLES);
    assert_eq!(history.len(), 11);
    assert_eq!(history.latest(), Some(108.));
    assert_eq!(history.median(), Some(109.));
    assert_eq!(history.mad(), Some(4.));
}

#[test]
// VM utilization is sampled once per scheduling interval.
fn test_history_is_sampled_every_interval() {
    init_logger();
    let config = SimulationConfig::from_yaml_str("scheduling_interval: 1.0").unwrap();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), config);
    let host = cloud_sim
        .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let host_id = host.id;
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let mut trace = vec![0.5];
    trace.extend(SAMPLES.iter().map(|s| s / 200.));
    let cloudlet = cloud_sim
        .create_cloudlet(1_000_000., 1)
        .unwrap()
        .with_cpu_model(Box::new(TraceUtilization::new(1., trace).unwrap()));
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.step_for_duration(11.5);

    let datacenter = cloud_sim.datacenter(dc).unwrap();
    let datacenter = datacenter.borrow();
    let history = datacenter.vm(vm_id).unwrap().utilization_history().clone();
    assert_eq!(history.len(), 11);
    assert_abs_diff_eq!(history.latest().unwrap(), 108. / 200., epsilon = 1e-12);
    assert_abs_diff_eq!(history.mad().unwrap(), 4. / 200., epsilon = 1e-12);

    let host_history = datacenter.host(host_id).unwrap().utilization_history();
    assert_eq!(host_history.len(), 11);
    assert_abs_diff_eq!(host_history.mad().unwrap(), 4. / 200., epsilon = 1e-12);
}

#[test]
// Scenario D: during migration the VM gets 90% on the source and its reservation gets 10% on the target,
// after the migration the VM gets its full request on the target.
fn test_manual_migration() {
    init_logger();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), SimulationConfig::default());
    let mut hosts = Vec::new();
    for _ in 0..2 {
        hosts.push(
            cloud_sim
                .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
                .unwrap(),
        );
    }
    let (source, target) = (hosts[0].id, hosts[1].id);
    let dc = cloud_sim.add_datacenter("dc", hosts, VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1000, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(100000., 1).unwrap();
    let cloudlet_id = cloudlet.id;
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    // transfer of 1000 MB over half of 1000 Mbit/s takes 16 seconds
    cloud_sim.migrate_vm(dc, vm_id, Some(target), 1.);

    cloud_sim.step_for_duration(5.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        let migration = datacenter.migration(vm_id).unwrap();
        assert_eq!(migration.source_host, source);
        assert_eq!(migration.target_host, target);
        assert_eq!(migration.start_time, 1.);
        assert_eq!(datacenter.vm_host(vm_id), Some(source));
        assert_eq!(datacenter.vm(vm_id).unwrap().status(), VmStatus::MigratingOut);

        let source_host = datacenter.host(source).unwrap();
        let target_host = datacenter.host(target).unwrap();
        assert!(target_host.is_migrating_in(vm_id));
        assert_abs_diff_eq!(target_host.vm_scheduler().total_allocated_mips_for_vm(vm_id), 100., epsilon = 1e-9);
        assert_abs_diff_eq!(source_host.vm_scheduler().total_allocated_mips_for_vm(vm_id), 900., epsilon = 1e-9);
        assert_eq!(target_host.ram().allocated_for(vm_id), 1000);
    }

    cloud_sim.step_for_duration(20.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.migration_count(), 1);
        assert!(datacenter.migration(vm_id).is_none());
        assert_eq!(datacenter.vm_host(vm_id), Some(target));
        assert_eq!(datacenter.vm(vm_id).unwrap().status(), VmStatus::Running);

        let source_host = datacenter.host(source).unwrap();
        let target_host = datacenter.host(target).unwrap();
        assert!(!target_host.is_migrating_in(vm_id));
        assert_eq!(target_host.vm_scheduler().total_allocated_mips_for_vm(vm_id), 1000.);
        assert_eq!(source_host.vm_count(), 0);
        assert_eq!(source_host.ram().allocated(), 0);
    }

    cloud_sim.run();
    // 1000 MI before the migration, 16 * 900 MI during it and the rest at full speed
    let broker = cloud_sim.broker(broker).unwrap();
    let cloudlet = broker.borrow().returned_cloudlet(cloudlet_id).unwrap().clone();
    assert_eq!(cloudlet.status(), CloudletStatus::Finished);
    assert_abs_diff_eq!(cloudlet.finish_time().unwrap(), 101.6, epsilon = 1e-6);
}

#[test]
// Failure of the target host aborts the migration, the VM continues at full speed on the source.
fn test_target_failure_aborts_migration() {
    init_logger();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), SimulationConfig::default());
    let mut hosts = Vec::new();
    for _ in 0..2 {
        hosts.push(
            cloud_sim
                .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
                .unwrap(),
        );
    }
    let (source, target) = (hosts[0].id, hosts[1].id);
    let dc = cloud_sim.add_datacenter("dc", hosts, VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1000, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(10000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.migrate_vm(dc, vm_id, Some(target), 1.);
    cloud_sim.fail_host(dc, target, None, 5.);

    cloud_sim.step_for_duration(6.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.migrations_in_progress(), 0);
        assert_eq!(datacenter.vm_host(vm_id), Some(source));
        assert_eq!(datacenter.vm(vm_id).unwrap().status(), VmStatus::Running);
        assert_eq!(
            datacenter.host(source).unwrap().vm_scheduler().total_allocated_mips_for_vm(vm_id),
            1000.
        );
        assert!(datacenter.failed_vms().is_empty());
    }

    cloud_sim.run();
    let datacenter = cloud_sim.datacenter(dc).unwrap();
    assert_eq!(datacenter.borrow().migration_count(), 0);
    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    assert!(broker.failed_vms().is_empty());
    let cloudlet = &broker.returned_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Finished);
    assert_abs_diff_eq!(cloudlet.finish_time().unwrap(), 10.4, epsilon = 1e-6);
}

#[test]
// Migration to the host without enough resources is refused.
fn test_migration_to_unsuitable_host() {
    init_logger();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), SimulationConfig::default());
    let large = cloud_sim
        .create_host(2, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let small = cloud_sim
        .create_host(2, 1000., 512, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let (large_id, small_id) = (large.id, small.id);
    let dc = cloud_sim.add_datacenter(
        "dc",
        vec![large, small],
        VmAllocationPolicy::from_str("FirstFit").unwrap(),
        None,
    );
    let broker = cloud_sim.add_broker("broker", vec![dc]);
    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(10000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.migrate_vm(dc, vm_id, Some(small_id), 1.);
    // no other host can accommodate the VM
    cloud_sim.migrate_vm(dc, vm_id, None, 2.);

    cloud_sim.step_for_duration(3.);
    let datacenter = cloud_sim.datacenter(dc).unwrap();
    let datacenter = datacenter.borrow();
    assert_eq!(datacenter.migrations_in_progress(), 0);
    assert_eq!(datacenter.vm_host(vm_id), Some(large_id));
    assert!(!datacenter.host(small_id).unwrap().is_migrating_in(vm_id));
}

#[test]
// Overloaded host gets rid of the VM with the least RAM, which goes to the first host that stays not overloaded.
fn test_overloaded_host_consolidation() {
    init_logger();
    let config = SimulationConfig::from_file(&name_wrapper("config_with_migration.yaml")).unwrap();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), config);
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let big = cloud_sim
        .create_vm(1, 1000., 2048, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let small = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let (big_id, small_id) = (big.id, small.id);
    let cloudlets = (0..2).map(|_| cloud_sim.create_cloudlet(200000., 1).unwrap()).collect();
    cloud_sim.submit_vms(broker, vec![big, small]).unwrap();
    cloud_sim.submit_cloudlets(broker, cloudlets, None).unwrap();

    cloud_sim.step_for_duration(5.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.vm_host(big_id), Some(0));
        assert_eq!(datacenter.vm_host(small_id), Some(0));
        assert_abs_diff_eq!(datacenter.host(0).unwrap().cpu_utilization(cloud_sim.current_time()), 1.);
    }

    cloud_sim.step_for_duration(12.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        let migration = datacenter.migration(small_id).unwrap();
        assert_eq!(migration.source_host, 0);
        assert_eq!(migration.target_host, 1);
        assert!(datacenter.migration(big_id).is_none());
    }

    cloud_sim.step_for_duration(20.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.migration_count(), 1);
        assert_eq!(datacenter.vm_host(big_id), Some(0));
        assert_eq!(datacenter.vm_host(small_id), Some(1));
        assert_eq!(datacenter.host(2).unwrap().vm_count(), 0);
    }

    cloud_sim.run();
    assert_eq!(cloud_sim.datacenter(dc).unwrap().borrow().migration_count(), 1);
    let broker = cloud_sim.broker(broker).unwrap();
    assert!(broker
        .borrow()
        .returned_cloudlets()
        .iter()
        .all(|c| c.status() == CloudletStatus::Finished));
}

#[test]
// Underloaded host is drained when all of its VMs fit elsewhere.
fn test_underloaded_host_is_drained() {
    init_logger();
    let config = SimulationConfig::from_yaml_str(
        "
scheduling_interval: 10.0
vm_allocation: WorstFit
migration:
  overload_detector: StaticThreshold[threshold=0.8]
  vm_selection: MinimumMigrationTime
  underload_threshold: 0.3
hosts:
  - name_prefix: h
    pes: 2
    pe_mips: 1000.0
    ram: 8192
    bw: 1000
    storage: 100000
    count: 2
",
    )
    .unwrap();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(123), config);
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let busy = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let light = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let (busy_id, light_id) = (busy.id, light.id);
    let busy_cloudlet = cloud_sim.create_cloudlet(200000., 1).unwrap();
    let light_cloudlet = cloud_sim
        .create_cloudlet(200000., 1)
        .unwrap()
        .with_cpu_model(Box::new(ConstantUtilization::new(0.4)));
    cloud_sim.submit_vms(broker, vec![busy, light]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![busy_cloudlet], Some(busy_id)).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![light_cloudlet], Some(light_id)).unwrap();

    cloud_sim.step_for_duration(5.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        assert_eq!(datacenter.vm_host(busy_id), Some(0));
        assert_eq!(datacenter.vm_host(light_id), Some(1));
        let time = cloud_sim.current_time();
        assert_abs_diff_eq!(datacenter.host(1).unwrap().cpu_utilization(time), 0.2, epsilon = 1e-12);
    }

    cloud_sim.step_for_duration(30.);
    let datacenter = cloud_sim.datacenter(dc).unwrap();
    let datacenter = datacenter.borrow();
    assert_eq!(datacenter.migration_count(), 1);
    assert_eq!(datacenter.vm_host(light_id), Some(0));
    assert_eq!(datacenter.host(1).unwrap().vm_count(), 0);
    assert_abs_diff_eq!(
        datacenter.host(0).unwrap().cpu_utilization(cloud_sim.current_time()),
        0.7,
        epsilon = 1e-12
    );
}
