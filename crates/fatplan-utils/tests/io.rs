use std::fs;

use fatplan_core::{
    units::Nanosecs, Application, NumberParsing, Outputs, PlanConfig, PlanSpec, StartPolicy,
    Traffic, TrafficFormat,
};
use fatplan_utils::Error;
use rand::{rngs::StdRng, SeedableRng};

const TOPOLOGY: &str = "0 1\n1 0\n0->0\n1->0\n2->1\n3->1\n";

#[test]
fn read_inputs_and_plan() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let topo_path = dir.path().join("graph.txt");
    let traffic_path = dir.path().join("flows.txt");
    fs::write(&topo_path, TOPOLOGY)?;
    fs::write(&traffic_path, "0,3,8000,0.5\n2,1,800,0.1\n")?;

    let topology = fatplan_utils::read_topology(&topo_path)?;
    assert_eq!(topology.nr_hosts(), 4);
    let traffic =
        fatplan_utils::read_traffic(&traffic_path, TrafficFormat::FlowList, NumberParsing::Strict)?;
    let spec = PlanSpec::builder().topology(topology).traffic(traffic).build();
    let plan = fatplan_core::plan(spec)?;
    assert_eq!(plan.flows().len(), 2);
    Ok(())
}

#[test]
fn malformed_traffic_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tm.txt");
    fs::write(&path, "0 1\n1 x\n")?;
    let res = fatplan_utils::read_traffic(&path, TrafficFormat::Matrix, NumberParsing::Strict);
    assert!(matches!(res, Err(Error::Traffic(..))));
    let traffic = fatplan_utils::read_traffic(&path, TrafficFormat::Matrix, NumberParsing::Lenient)?;
    assert!(matches!(traffic, Traffic::Matrix(..)));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let res = fatplan_utils::read_topology("/nonexistent/graph.txt");
    assert!(matches!(res, Err(Error::Io(..))));
}

#[test]
fn config_reads_from_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    let mut expected = PlanConfig::matrix();
    expected.traffic_weight = 0.5;
    expected.start = StartPolicy::Fixed {
        at: Nanosecs::new(1_000),
    };
    fs::write(&path, serde_json::to_string(&expected)?)?;
    let config = fatplan_utils::read_config(&path)?;
    assert_eq!(config, expected);
    assert_eq!(config.application, Application::BulkSend);
    Ok(())
}

#[test]
fn config_json_may_omit_parsing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    let json = r#"{
        "format": "flow-list",
        "traffic_weight": 1.0,
        "horizon": 5000000000,
        "link_delay": 100,
        "application": { "kind": "on-off", "protocol": "udp", "on_time": 1000, "off_time": 10, "packet_size": 1024 },
        "start": { "kind": "uniform", "window": 100 }
    }"#;
    fs::write(&path, json)?;
    let config = fatplan_utils::read_config(&path)?;
    assert_eq!(config.parsing, NumberParsing::Strict);
    assert_eq!(config.outputs, Outputs::FlowMonitor);
    assert_eq!(config.format, TrafficFormat::FlowList);
    assert!(matches!(config.application, Application::OnOff { .. }));
    Ok(())
}

#[test]
fn config_reads_from_dhall() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.dhall");
    let dhall = r#"
        let Format = < `flow-list` | matrix >
        let Outputs = < `flow-monitor` | trace | both >
        in  { format = Format.matrix
            , traffic_weight = 0.5
            , horizon = 5000000000
            , link_delay = 1000
            , application = { kind = "bulk-send" }
            , start = { kind = "uniform", window = 100000000000 }
            , outputs = Outputs.both
            }
    "#;
    fs::write(&path, dhall)?;
    let config = fatplan_utils::read_config(&path)?;
    let expected = PlanConfig {
        traffic_weight: 0.5,
        horizon: Nanosecs::new(5_000_000_000),
        outputs: Outputs::Both,
        ..PlanConfig::matrix()
    };
    assert_eq!(config, expected);
    Ok(())
}

#[test]
fn unknown_config_extension_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(&path, "format: matrix")?;
    assert!(matches!(
        fatplan_utils::read_config(&path),
        Err(Error::UnknownFileType(..))
    ));
    Ok(())
}

#[test]
fn written_schedule_reads_back() -> anyhow::Result<()> {
    let tm = "0 0 0 500\n0 0 900 0\n0 0 0 0\n300 0 0 0\n";
    let plan = fatplan_core::plan_str(TOPOLOGY, tm, PlanConfig::matrix())?;
    let schedule = plan.schedule(&plan.config().start, &mut StdRng::seed_from_u64(1));
    let dir = tempfile::tempdir()?;
    for name in ["plan.json", "plan.msgpack"] {
        let path = dir.path().join(name);
        fatplan_utils::write_plan(&path, &plan, &schedule)?;
        assert_eq!(fatplan_utils::read_schedule(&path)?, schedule);
    }
    Ok(())
}
