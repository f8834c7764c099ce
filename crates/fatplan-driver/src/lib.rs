use std::path::PathBuf;

use anyhow::Context;
use fatplan::core::{units::Mbps, NumberParsing, Outputs, PlanConfig, PlanSpec, TrafficFormat};
use fatplan::ns3::Ns3Simulation;
use rand::{rngs::StdRng, SeedableRng};

/// Plan a fat-tree simulation and hand it to ns-3.
#[derive(Debug, clap::Parser)]
#[command(name = "fatplan", version)]
pub struct Args {
    /// Edge list of switch links (`A B`) and host attachments (`H->S`)
    pub topology_file: PathBuf,
    /// Flow list or traffic matrix
    pub traffic_file: PathBuf,
    /// Where ns-3 writes its results; the ASCII trace gets a `.tr` suffix
    pub result_file: PathBuf,
    /// Drop-tail queue limit, in packets
    pub drop_queue_limit: usize,
    /// Data rate of on/off applications, in Mbps
    pub data_rate: Mbps,
    /// Traffic file format; defaults to the format in `--config`, or `flow-list`
    #[arg(long)]
    pub format: Option<TrafficFormat>,
    /// Planner configuration in JSON or Dhall
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for randomized start times
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Directory for ns-3 inputs and output
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,
    /// ns-3 source tree; without it, inputs are written but ns-3 is not run
    #[arg(long)]
    pub ns3_dir: Option<PathBuf>,
    /// Result files to write (`flow-monitor`, `trace` or `both`); defaults to the configured ones
    #[arg(long)]
    pub outputs: Option<Outputs>,
    /// Read malformed numbers in the traffic file as zero instead of failing
    #[arg(long)]
    pub lenient: bool,
    /// Also write the plan and its schedule to a JSON or MsgPack file
    #[arg(long)]
    pub plan_out: Option<PathBuf>,
}

/// Resolves the planner configuration from the command line.
pub fn resolve_config(args: &Args) -> anyhow::Result<PlanConfig> {
    let mut config = match &args.config {
        Some(path) => fatplan::utils::read_config(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => PlanConfig::for_format(args.format.unwrap_or(TrafficFormat::FlowList)),
    };
    if let Some(format) = args.format {
        anyhow::ensure!(
            format == config.format,
            "--format {format} conflicts with the configured format {}",
            config.format
        );
    }
    if args.lenient {
        config.parsing = NumberParsing::Lenient;
    }
    if let Some(outputs) = args.outputs {
        config.outputs = outputs;
    }
    Ok(config)
}

/// Plans the simulation described by `args`, writes the ns-3 inputs, and runs ns-3 if a
/// directory for it was given.
pub fn run(args: &Args) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let topology = fatplan::utils::read_topology(&args.topology_file)
        .with_context(|| format!("failed to read topology {}", args.topology_file.display()))?;
    let traffic = fatplan::utils::read_traffic(&args.traffic_file, config.format, config.parsing)
        .with_context(|| format!("failed to read traffic {}", args.traffic_file.display()))?;
    log::info!("Total number of hosts = {}", topology.nr_hosts());
    log::info!("Background flow data rate = {}", args.data_rate);

    let spec = PlanSpec::builder()
        .topology(topology)
        .traffic(traffic)
        .config(config)
        .build();
    let plan = fatplan::core::plan(spec).context("failed to plan")?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let flows = plan.schedule(&plan.config().start, &mut rng);

    if let Some(path) = &args.plan_out {
        fatplan::utils::write_plan(path, &plan, &flows)
            .with_context(|| format!("failed to write plan {}", path.display()))?;
    }

    let mut sim = Ns3Simulation::builder()
        .data_dir(args.data_dir.as_path())
        .queue_limit(args.drop_queue_limit)
        .app_data_rate(args.data_rate)
        .result_file(args.result_file.as_path())
        .plan(plan)
        .flows(flows)
        .build();
    sim.ns3_dir = args.ns3_dir.clone();
    sim.run().context("failed to run ns-3")?;
    Ok(())
}
