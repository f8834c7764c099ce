use std::collections::HashSet;

use fatplan_core::{
    addressing, plan_str, units::Bytes, units::Nanosecs, Error, HostId, PlanConfig, SwitchId,
    Topology, TopologyError,
};

const TWO_SWITCH: &str = "0 1\n0->0\n1->0\n2->1\n";

#[test]
fn two_switch_fabric_gets_disjoint_subnets() -> anyhow::Result<()> {
    let plan = plan_str(TWO_SWITCH, "", PlanConfig::flow_list())?;
    let host_side = addressing::host_subnet(SwitchId::new(0))?;
    let link_side = addressing::switch_link_subnet(SwitchId::new(0))?;
    assert_eq!(host_side.to_string(), "10.0.0.0/24");
    assert_eq!(link_side.to_string(), "10.128.0.0/24");
    let addrs = plan.addresses().addrs().collect::<Vec<_>>();
    assert_eq!(addrs.len(), 8);
    assert_eq!(addrs.iter().collect::<HashSet<_>>().len(), 8);
    Ok(())
}

#[test]
fn flow_at_noise_floor_survives() -> anyhow::Result<()> {
    let plan = plan_str(TWO_SWITCH, "0,2,80,1.5\n", PlanConfig::flow_list())?;
    let [flow] = plan.flows() else {
        panic!("expected one flow, got {:?}", plan.flows());
    };
    assert_eq!((flow.src, flow.dst), (HostId::new(0), HostId::new(2)));
    assert_eq!(flow.size, Bytes::new(10));
    assert_eq!(flow.start, Some(Nanosecs::from_secs_f64(1.5)));
    Ok(())
}

#[test]
fn flow_under_noise_floor_is_dropped() -> anyhow::Result<()> {
    let plan = plan_str(TWO_SWITCH, "0,2,70,1.5\n", PlanConfig::flow_list())?;
    assert!(plan.flows().is_empty());
    Ok(())
}

#[test]
fn gap_in_switch_hosts_is_fatal() {
    let res = plan_str(
        "0 1\n0->0\n1->0\n2->1\n4->1\n3->0\n",
        "",
        PlanConfig::flow_list(),
    );
    assert!(matches!(
        res,
        Err(Error::InvalidTopology(TopologyError::NonContiguousHosts { .. }))
    ));
}

#[test]
fn host_ranges_cover_every_host_once() -> anyhow::Result<()> {
    let topo = Topology::parse("0 1\n1 2\n2 0\n0->0\n1->0\n2->1\n3->2\n4->2\n5->2\n")?;
    let mut seen = vec![0; topo.nr_hosts()];
    for s in topo.switches() {
        for h in topo.host_range(s) {
            seen[h] += 1;
        }
    }
    assert!(seen.iter().all(|&n| n == 1));
    Ok(())
}
