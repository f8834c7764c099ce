//! An interface to the backend ns-3 simulation.
//!
//! This crate is tightly coupled to the input files read by the ns-3 fat-tree program.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use fatplan_core::{
    constants::{LINK_RATE, SINK_PORT, STOP_GRACE},
    units::Mbps,
    Application, Plan, ScheduledFlow,
};

/// An ns-3 simulation of a plan.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Ns3Simulation {
    /// The directory in the ns-3 source tree containing `waf`. Without it, the simulation inputs
    /// are written but ns-3 is not run.
    #[builder(default, setter(strip_option, into))]
    pub ns3_dir: Option<PathBuf>,
    /// The directory in which to write simulation inputs and output.
    #[builder(setter(into))]
    pub data_dir: PathBuf,
    /// The ns-3 program to run.
    #[builder(default = String::from("fat-tree"), setter(into))]
    pub program: String,
    /// The drop-tail queue limit, in packets.
    pub queue_limit: usize,
    /// The data rate of on/off applications.
    pub app_data_rate: Mbps,
    /// Where ns-3 writes its results.
    #[builder(setter(into))]
    pub result_file: PathBuf,
    /// The plan to simulate.
    pub plan: Plan,
    /// The flows to simulate.
    /// PRECONDITION: `flows` must be sorted by start time
    pub flows: Vec<ScheduledFlow>,
}

impl Ns3Simulation {
    /// Write the simulation inputs and, if an ns-3 directory is set, run the simulation.
    ///
    /// This routine can fail due to IO errors, including a failed ns-3 run.
    pub fn run(&self) -> Result<(), Error> {
        self.write_inputs()?;
        match &self.ns3_dir {
            Some(ns3_dir) => {
                log::info!("running ns-3 in {}", ns3_dir.display());
                self.invoke_ns3(ns3_dir)?;
                log::info!("ns-3 finished; results in {}", self.result_file.display());
            }
            None => log::info!(
                "no ns-3 directory given; inputs are in {}",
                self.data_dir.display()
            ),
        }
        Ok(())
    }

    /// Write `topology.txt`, `flows.txt` and `config.txt` to the data directory.
    pub fn write_inputs(&self) -> Result<(), Error> {
        // CORRECTNESS: Flows are sorted by start time.
        if let Some(i) = self.flows.windows(2).position(|w| w[0].start > w[1].start) {
            return Err(Error::UnsortedFlows(self.flows[i + 1].id.inner()));
        }
        // Set up directory
        let mk_path = |file: &str| self.data_dir.join(file);
        fs::create_dir_all(&self.data_dir)?;

        fs::write(mk_path("topology.txt"), translate_topology(&self.plan))?;
        fs::write(mk_path("flows.txt"), translate_flows(&self.flows))?;
        fs::write(mk_path("config.txt"), self.translate_config())?;
        Ok(())
    }

    fn translate_config(&self) -> String {
        let config = self.plan.config();
        let mut lines = vec![
            format!("QUEUE_LIMIT {}", self.queue_limit),
            format!("LINK_RATE {LINK_RATE}"),
            format!("LINK_DELAY_MS {}", config.link_delay.into_u64() as f64 / 1e6),
        ];
        match config.application {
            Application::BulkSend => {
                lines.push("APPLICATION bulk-send".into());
                lines.push(format!(
                    "SOCKET_FACTORY {}",
                    config.application.protocol().socket_factory()
                ));
            }
            Application::OnOff {
                protocol,
                on_time,
                off_time,
                packet_size,
            } => {
                lines.push("APPLICATION on-off".into());
                lines.push(format!("SOCKET_FACTORY {}", protocol.socket_factory()));
                lines.push(format!("ON_TIME {}", on_time.into_secs_f64()));
                lines.push(format!("OFF_TIME {}", off_time.into_secs_f64()));
                lines.push(format!("PACKET_SIZE {}", packet_size.into_u64()));
                lines.push(format!("APP_DATA_RATE {}", self.app_data_rate));
            }
        }
        let horizon = config.horizon;
        // CORRECTNESS: Validated plans leave room for the grace period after the horizon.
        let stop = horizon + STOP_GRACE;
        lines.push(format!("SINK_PORT {SINK_PORT}"));
        lines.push(format!("HORIZON {}", horizon.into_secs_f64()));
        lines.push(format!("STOP_TIME {}", stop.into_secs_f64()));
        let result = self.result_file.display();
        if config.outputs.flow_monitor() {
            lines.push(format!("FLOW_MONITOR {result}"));
        }
        if config.outputs.trace() {
            lines.push(format!("TRACE {result}.tr"));
        }
        lines.join("\n")
    }

    fn invoke_ns3(&self, ns3_dir: &Path) -> cmd_lib::CmdResult {
        // We need to canonicalize the directories because we run `cd` below.
        let data_dir = fs::canonicalize(&self.data_dir)?;
        let ns3_dir = fs::canonicalize(ns3_dir)?;
        let run_arg = format!("{} --root={}", self.program, data_dir.display());
        cmd_lib::run_cmd! {
            cd ${ns3_dir};
            ./waf --run ${run_arg} > ${data_dir}/output.txt 2>&1
        }
    }
}

/// The error type for [Ns3Simulation::run].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The flows are not sorted by start time.
    #[error("flow {0} starts before the flow listed ahead of it")]
    UnsortedFlows(usize),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn translate_topology(plan: &Plan) -> String {
    let topology = plan.topology();
    let addresses = plan.addresses();
    // First line: switch #, host #, host link #, switch link #
    let header = format!(
        "{} {} {} {}",
        topology.nr_switches(),
        topology.nr_hosts(),
        addresses.host_links().len(),
        addresses.switch_links().len()
    );
    // h switch index host switch_addr host_addr mask
    let host_links = addresses.host_links().iter().map(|h| {
        format!(
            "h {} {} {} {} {} {}",
            h.switch,
            h.index,
            h.host,
            h.switch_addr,
            h.host_addr,
            h.subnet.mask()
        )
    });
    // s a b index a_addr b_addr mask
    let switch_links = addresses.switch_links().iter().map(|l| {
        format!(
            "s {} {} {} {} {} {}",
            l.a,
            l.b,
            l.index,
            l.a_addr,
            l.b_addr,
            l.subnet.mask()
        )
    });
    std::iter::once(header)
        .chain(host_links)
        .chain(switch_links)
        .collect::<Vec<_>>()
        .join("\n")
}

fn translate_flows(flows: &[ScheduledFlow]) -> String {
    let nr_flows = flows.len();
    // First line: # of flows
    // id src dst src_addr dst_addr port size start_time stop_time
    let lines = std::iter::once(nr_flows.to_string())
        .chain(flows.iter().map(|f| {
            format!(
                "{} {} {} {} {} {} {} {} {}",
                f.id,
                f.src,
                f.dst,
                f.src_addr,
                f.dst_addr,
                SINK_PORT,
                f.size.into_u64(),
                f.start.into_secs_f64(),
                f.stop.into_secs_f64()
            )
        }))
        .collect::<Vec<_>>();
    lines.join("\n")
}
