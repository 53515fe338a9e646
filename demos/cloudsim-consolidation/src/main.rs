use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use simcore::log_info;
use simcore::simulation::Simulation;

use cloudsim::core::cloudlet::CloudletStatus;
use cloudsim::core::cloudlet_scheduler::CloudletSchedulingPolicy;
use cloudsim::core::config::sim_config::SimulationConfig;
use cloudsim::core::utilization_model::StochasticUtilization;
use cloudsim::simulation::CloudSimulation;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Simulation config
    #[clap(long, default_value = "config.yaml")]
    config: String,

    #[clap(long, default_value_t = 50)]
    num_vms: u32,

    #[clap(long, default_value_t = 123)]
    seed: u64,
}

fn main() {
    init_logger();
    let args = Args::parse();
    let sim_config = match SimulationConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let simulation_start = Instant::now();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(args.seed), sim_config);
    let dc = cloud_sim
        .add_datacenter_from_config("datacenter")
        .expect("datacenter config is validated on load");
    let broker = cloud_sim.add_broker("broker", vec![dc]);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let vm_mips = [500., 1000., 2000., 2500.];
    let vm_ram = [613, 870, 1740];
    let mut vms = Vec::new();
    let mut cloudlets = Vec::new();
    for _ in 0..args.num_vms {
        let vm = cloud_sim
            .create_vm(
                1,
                vm_mips[rng.gen_range(0..4)],
                vm_ram[rng.gen_range(0..3)],
                100,
                2500,
                CloudletSchedulingPolicy::TimeShared,
            )
            .expect("vm parameters are positive");
        let cloudlet = cloud_sim
            .create_cloudlet(rng.gen_range(1e6..5e6), 1)
            .expect("cloudlet parameters are positive")
            .with_cpu_model(Box::new(StochasticUtilization::new(rng.gen())))
            .with_vm(vm.id);
        vms.push(vm);
        cloudlets.push(cloudlet);
    }
    cloud_sim.submit_vms(broker, vms).expect("broker exists");
    cloud_sim.submit_cloudlets(broker, cloudlets, None).expect("broker exists");
    cloud_sim.run();

    let datacenter = cloud_sim.datacenter(dc).expect("datacenter exists");
    let broker = cloud_sim.broker(broker).expect("broker exists");
    let broker = broker.borrow();
    let finished = broker
        .returned_cloudlets()
        .iter()
        .filter(|c| c.status() == CloudletStatus::Finished)
        .count();
    log_info!(
        cloud_sim.context(),
        "Finished cloudlets {} of {}, failed vms {}",
        finished,
        broker.returned_cloudlets().len(),
        broker.failed_vms().len()
    );
    log_info!(
        cloud_sim.context(),
        "Completed migrations {}",
        datacenter.borrow().migration_count()
    );
    log_info!(
        cloud_sim.context(),
        "Simulation process time {:.2?}",
        simulation_start.elapsed()
    );
    log_info!(
        cloud_sim.context(),
        "Total events processed {}",
        cloud_sim.event_count()
    );
}
