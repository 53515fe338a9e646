use approx::assert_abs_diff_eq;

use simcore::simulation::Simulation;

use cloudsim::core::cloudlet::CloudletStatus;
use cloudsim::core::cloudlet_scheduler::CloudletSchedulingPolicy;
use cloudsim::core::config::sim_config::{BackoffPolicy, SimulationConfig};
use cloudsim::core::vm::VmStatus;
use cloudsim::core::vm_allocation_policy::VmAllocationPolicy;
use cloudsim::core::vm_scheduler::VmSchedulingPolicy;
use cloudsim::error::SimError;
use cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cloud_sim_with(config: SimulationConfig) -> CloudSimulation {
    init_logger();
    CloudSimulation::new(Simulation::new(123), config)
}

#[test]
fn test_config_from_file() {
    let config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    assert_eq!(config.scheduling_interval, 10.);
    assert_eq!(config.vm_creation_max_retries, 2);
    assert_eq!(config.retry_backoff, BackoffPolicy::Fixed);
    assert_eq!(config.utilization_history_length, 30);

    let mut cloud_sim = cloud_sim_with(config);
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let datacenter = cloud_sim.datacenter(dc).unwrap();
    let names: Vec<String> = datacenter.borrow().hosts().values().map(|h| h.name.clone()).collect();
    assert_eq!(names, vec!["h0".to_string(), "h1".to_string()]);
    assert_eq!(datacenter.borrow().host(0).unwrap().total_mips(), 4000.);
}

#[test]
fn test_missing_config_file() {
    let result = SimulationConfig::from_file(&name_wrapper("missing.yaml"));
    assert!(matches!(result, Err(SimError::InvalidConfiguration(_))));
}

#[test]
// Cloudlet of 10000 MI on a 1000 MIPS PE takes 10 seconds,
// after that the broker destroys the VM and finishes.
fn test_cloudlet_execution() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(2, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(10000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.run();

    assert!(cloud_sim.is_broker_finished(broker));
    assert_eq!(cloud_sim.current_time(), 10.);
    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    let returned = broker.returned_cloudlets();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].status(), CloudletStatus::Finished);
    assert_eq!(returned[0].vm_id, Some(vm_id));
    assert_abs_diff_eq!(returned[0].finish_time().unwrap(), 10., epsilon = 1e-9);
    assert_eq!(broker.destroyed_vms(), &[vm_id]);
    assert_eq!(broker.vm(vm_id).unwrap().status(), VmStatus::Finished);
    assert!(cloud_sim.datacenter(dc).unwrap().borrow().vm(vm_id).is_none());
}

#[test]
// Unbound cloudlets are distributed round-robin among created VMs.
fn test_round_robin_binding() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let mut vms = Vec::new();
    for _ in 0..2 {
        vms.push(
            cloud_sim
                .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::SpaceShared)
                .unwrap(),
        );
    }
    let vm_ids: Vec<u32> = vms.iter().map(|vm| vm.id).collect();
    let cloudlets = (0..4).map(|_| cloud_sim.create_cloudlet(5000., 1).unwrap()).collect();
    cloud_sim.submit_vms(broker, vms).unwrap();
    cloud_sim.submit_cloudlets(broker, cloudlets, None).unwrap();
    cloud_sim.run();

    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    let mut finish: Vec<(u32, Option<u32>, f64)> = broker
        .returned_cloudlets()
        .iter()
        .map(|c| (c.id, c.vm_id, c.finish_time().unwrap()))
        .collect();
    finish.sort_by_key(|(id, _, _)| *id);
    assert_eq!(finish[0].1, Some(vm_ids[0]));
    assert_eq!(finish[1].1, Some(vm_ids[1]));
    assert_eq!(finish[2].1, Some(vm_ids[0]));
    assert_eq!(finish[3].1, Some(vm_ids[1]));
    // each space-shared VM runs its two cloudlets one after another
    assert_abs_diff_eq!(finish[0].2, 5., epsilon = 1e-9);
    assert_abs_diff_eq!(finish[2].2, 10., epsilon = 1e-9);
}

#[test]
// Scenario A: space-shared host with a single PE can not host a VM with two PEs.
// The broker retries twice with fixed delay and then gives up, cloudlets fail.
fn test_vm_creation_failure_and_retries() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let host = cloud_sim
        .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::SpaceShared)
        .unwrap();
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(2, 500., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(1000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.run();

    assert!(cloud_sim.is_broker_finished(broker));
    assert_eq!(cloud_sim.current_time(), 10.);
    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    assert_eq!(broker.failed_vms(), &[vm_id]);
    assert!(broker.created_vms().is_empty());
    assert_eq!(broker.vm(vm_id).unwrap().status(), VmStatus::Failed);
    assert_eq!(broker.returned_cloudlets().len(), 1);
    assert_eq!(broker.returned_cloudlets()[0].status(), CloudletStatus::Failed);
}

#[test]
fn test_exponential_backoff() {
    let config = SimulationConfig::from_yaml_str(
        "
vm_creation_retry_delay: 5.0
vm_creation_max_retries: 2
retry_backoff:
  Exponential:
    factor: 2.0
",
    )
    .unwrap();
    assert_eq!(config.retry_delay(1), 5.);
    assert_eq!(config.retry_delay(2), 10.);

    let mut cloud_sim = cloud_sim_with(config);
    let host = cloud_sim
        .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);
    let vm = cloud_sim
        .create_vm(1, 1000., 8192, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.run();

    assert_eq!(cloud_sim.current_time(), 15.);
    assert_eq!(cloud_sim.broker(broker).unwrap().borrow().failed_vms().len(), 1);
}

#[test]
// VM which does not fit into the first datacenter is created in the second one without waiting for retry.
fn test_datacenters_are_tried_in_turn() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let small = cloud_sim
        .create_host(1, 1000., 1024, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let large = cloud_sim
        .create_host(4, 1000., 8192, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let large_id = large.id;
    let dc1 = cloud_sim.add_datacenter("dc1", vec![small], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let dc2 = cloud_sim.add_datacenter("dc2", vec![large], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc1, dc2]);

    let vm = cloud_sim
        .create_vm(2, 1000., 4096, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(2000., 2).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();

    cloud_sim.step_for_duration(1.);
    let location = cloud_sim.broker(broker).unwrap().borrow().vm_location(vm_id).unwrap();
    assert_eq!(location.datacenter_id, dc2);
    assert_eq!(location.host_id, large_id);

    cloud_sim.run();
    assert_eq!(cloud_sim.current_time(), 2.);
    let broker = cloud_sim.broker(broker).unwrap();
    assert!(broker.borrow().failed_vms().is_empty());
    assert_eq!(broker.borrow().returned_cloudlets()[0].status(), CloudletStatus::Finished);
}

#[test]
// Scenario B: two VMs with one 1000 MIPS PE each on time-shared host with two such PEs get 1000 MIPS each.
fn test_time_shared_host_shares() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::default());
    let host = cloud_sim
        .create_host(2, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let host_id = host.id;
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vms: Vec<_> = (0..2)
        .map(|_| {
            cloud_sim
                .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
                .unwrap()
        })
        .collect();
    let vm_ids: Vec<u32> = vms.iter().map(|vm| vm.id).collect();
    let cloudlets = (0..2).map(|_| cloud_sim.create_cloudlet(20000., 1).unwrap()).collect();
    cloud_sim.submit_vms(broker, vms).unwrap();
    cloud_sim.submit_cloudlets(broker, cloudlets, None).unwrap();
    cloud_sim.step_for_duration(5.);

    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        let host = datacenter.host(host_id).unwrap();
        for vm_id in vm_ids.iter() {
            assert_eq!(host.vm_scheduler().total_allocated_mips_for_vm(*vm_id), 1000.);
            assert_eq!(host.vm(*vm_id).unwrap().total_allocated_mips(), 1000.);
        }
        assert_abs_diff_eq!(host.cpu_utilization(cloud_sim.current_time()), 1.);
    }

    cloud_sim.run();
    assert_eq!(cloud_sim.current_time(), 20.);
}

#[test]
fn test_cloudlet_bound_to_unknown_vm_fails() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let good = cloud_sim.create_cloudlet(1000., 1).unwrap();
    let bad = cloud_sim.create_cloudlet(1000., 1).unwrap().with_vm(42);
    let bad_id = bad.id;
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![good, bad], None).unwrap();
    cloud_sim.run();

    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    assert_eq!(broker.returned_cloudlets().len(), 2);
    assert_eq!(broker.returned_cloudlet(bad_id).unwrap().status(), CloudletStatus::Failed);
}

#[test]
// Cloudlets submitted to broker without VMs are returned as failed and the broker finishes.
fn test_cloudlets_without_vms_fail() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker_id = cloud_sim.add_broker("broker", vec![dc]);

    let cloudlet = cloud_sim.create_cloudlet(1000., 1).unwrap();
    cloud_sim.submit_cloudlets(broker_id, vec![cloudlet], None).unwrap();
    cloud_sim.run();

    assert!(cloud_sim.is_broker_finished(broker_id));
    assert_eq!(cloud_sim.current_time(), 0.);
    let broker = cloud_sim.broker(broker_id).unwrap();
    let broker = broker.borrow();
    assert_eq!(broker.pending_cloudlets(), 0);
    assert_eq!(broker.returned_cloudlets().len(), 1);
    assert_eq!(broker.returned_cloudlets()[0].status(), CloudletStatus::Failed);
    assert_eq!(broker.returned_cloudlets()[0].finish_time(), Some(0.));
}

#[test]
// Space-shared cloudlet scheduler fails cloudlet which needs more PEs than the VM has.
fn test_too_wide_cloudlet_fails() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::SpaceShared)
        .unwrap();
    let cloudlet = cloud_sim.create_cloudlet(1000., 2).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.run();

    let broker = cloud_sim.broker(broker).unwrap();
    assert_eq!(broker.borrow().returned_cloudlets()[0].status(), CloudletStatus::Failed);
    assert_eq!(cloud_sim.current_time(), 0.);
}

#[test]
// Failure of all host PEs fails its VMs and returns their cloudlets as failed.
fn test_host_failure() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(100000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.fail_host(dc, 0, None, 5.);
    cloud_sim.run();

    assert!(cloud_sim.is_broker_finished(broker));
    assert_eq!(cloud_sim.current_time(), 5.);
    let datacenter = cloud_sim.datacenter(dc).unwrap();
    assert_eq!(datacenter.borrow().failed_vms(), &[vm_id]);
    assert!(datacenter.borrow().host(0).unwrap().is_failed());
    assert!(!datacenter.borrow().host(1).unwrap().is_failed());

    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    assert_eq!(broker.failed_vms(), &[vm_id]);
    let cloudlet = &broker.returned_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Failed);
    assert_eq!(cloudlet.finish_time(), Some(5.));
    assert_abs_diff_eq!(cloudlet.finished_length(), 5000., epsilon = 1e-6);
}

#[test]
// Idle VMs are destroyed after the destruction delay, not at the end of all work.
fn test_vm_destruction_delay() {
    let config = SimulationConfig::from_yaml_str("vm_destruction_delay: 1.0").unwrap();
    let mut cloud_sim = cloud_sim_with(config);
    let host = cloud_sim
        .create_host(2, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let short_vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let long_vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let (short_id, long_id) = (short_vm.id, long_vm.id);
    let short = cloud_sim.create_cloudlet(2000., 1).unwrap();
    let long = cloud_sim.create_cloudlet(10000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![short_vm, long_vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![short], Some(short_id)).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![long], Some(long_id)).unwrap();

    cloud_sim.step_for_duration(4.);
    {
        let broker = cloud_sim.broker(broker).unwrap();
        assert_eq!(broker.borrow().destroyed_vms(), &[short_id]);
        assert_eq!(broker.borrow().created_vms(), vec![long_id]);
    }

    cloud_sim.run();
    assert!(cloud_sim.is_broker_finished(broker));
    assert_eq!(cloud_sim.current_time(), 10.);
}

#[test]
// Work can be submitted to the broker while the simulation is running.
fn test_delayed_submission() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(3000., 1).unwrap();
    cloud_sim.submit_vms_with_delay(broker, vec![vm], 2.);
    cloud_sim.submit_cloudlets_with_delay(broker, vec![cloudlet], Some(vm_id), 2.);
    cloud_sim.run();

    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    let cloudlet = &broker.returned_cloudlets()[0];
    assert_eq!(cloudlet.status(), CloudletStatus::Finished);
    assert_eq!(cloudlet.finish_time(), Some(5.));
}

#[test]
fn test_time_limit() {
    let config = SimulationConfig::from_yaml_str("terminate_at: 50.0").unwrap();
    let mut cloud_sim = cloud_sim_with(config);
    let host = cloud_sim
        .create_host(1, 1000., 4096, 1000, 100000, VmSchedulingPolicy::TimeShared)
        .unwrap();
    let dc = cloud_sim.add_datacenter("dc", vec![host], VmAllocationPolicy::from_str("FirstFit").unwrap(), None);
    let broker = cloud_sim.add_broker("broker", vec![dc]);
    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let cloudlet = cloud_sim.create_cloudlet(1_000_000., 1).unwrap();
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.run();

    assert_eq!(cloud_sim.current_time(), 50.);
    assert!(cloud_sim.broker(broker).unwrap().borrow().returned_cloudlets().is_empty());
}

#[test]
// Paused cloudlet makes no progress until it is resumed.
fn test_cloudlet_pause_and_resume() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(10000., 1).unwrap();
    let cloudlet_id = cloudlet.id;
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.pause_cloudlet(dc, vm_id, cloudlet_id, 2.);
    cloud_sim.resume_cloudlet(dc, vm_id, cloudlet_id, 5.);

    cloud_sim.step_for_duration(4.);
    {
        let datacenter = cloud_sim.datacenter(dc).unwrap();
        let datacenter = datacenter.borrow();
        let scheduler = datacenter.vm(vm_id).unwrap().cloudlet_scheduler();
        assert_eq!(scheduler.status_of(cloudlet_id), Some(CloudletStatus::Paused));
        assert_abs_diff_eq!(scheduler.remaining_length_of(cloudlet_id).unwrap(), 8000., epsilon = 1e-9);
    }

    cloud_sim.run();
    let broker = cloud_sim.broker(broker).unwrap();
    let cloudlet = broker.borrow().returned_cloudlet(cloudlet_id).unwrap().clone();
    assert_eq!(cloudlet.status(), CloudletStatus::Finished);
    assert_abs_diff_eq!(cloudlet.finish_time().unwrap(), 13., epsilon = 1e-9);
}

#[test]
fn test_cloudlet_cancel() {
    let mut cloud_sim = cloud_sim_with(SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap());
    let dc = cloud_sim.add_datacenter_from_config("dc").unwrap();
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let vm = cloud_sim
        .create_vm(1, 1000., 1024, 100, 1000, CloudletSchedulingPolicy::TimeShared)
        .unwrap();
    let vm_id = vm.id;
    let cloudlet = cloud_sim.create_cloudlet(10000., 1).unwrap();
    let cloudlet_id = cloudlet.id;
    cloud_sim.submit_vms(broker, vec![vm]).unwrap();
    cloud_sim.submit_cloudlets(broker, vec![cloudlet], None).unwrap();
    cloud_sim.cancel_cloudlet(dc, vm_id, cloudlet_id, 2.);
    cloud_sim.run();

    assert_eq!(cloud_sim.current_time(), 2.);
    let broker = cloud_sim.broker(broker).unwrap();
    let broker = broker.borrow();
    let cloudlet = broker.returned_cloudlet(cloudlet_id).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Canceled);
    assert_abs_diff_eq!(cloudlet.finished_length(), 2000., epsilon = 1e-9);
}
