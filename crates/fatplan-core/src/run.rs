use crate::addressing::{AddressError, AddressPlan};
use crate::config::PlanConfig;
use crate::ident::{FlowId, HostId};
use crate::plan::{effective_bytes, Plan, PlanStats, PlannedFlow};
use crate::spec::{PlanError, PlanSpec};
use crate::topology::{Topology, TopologyError};
use crate::traffic::{Traffic, TrafficError};
use crate::units::Nanosecs;

/// The core planning routine. This turns a specification into a plan with an address for every
/// link end and one flow per traffic entry above the noise floor.
///
/// This function returns an error if the specification is invalid or the topology cannot be
/// addressed.
pub fn plan(spec: PlanSpec) -> Result<Plan, Error> {
    let spec = spec.validate()?;
    if !spec.topology.hosts_connected() {
        log::warn!("switch fabric is disconnected; some flows will have no route");
    }
    let addresses = AddressPlan::new(&spec.topology)?;
    let config = spec.config;
    let divisor = config.format.size_divisor();

    let candidates: Vec<(HostId, HostId, f64, Option<Nanosecs>)> = match &spec.traffic {
        Traffic::FlowList(records) => records
            .iter()
            .map(|r| (r.src, r.dst, r.size as f64, Some(r.start)))
            .collect(),
        Traffic::Matrix(matrix) => matrix.cells().map(|(i, j, v)| (i, j, v, None)).collect(),
    };
    let max_demand = candidates
        .iter()
        .map(|&(_, _, volume, _)| volume)
        .fold(0.0, f64::max);
    let mut stats = PlanStats {
        nr_candidates: candidates.len(),
        max_demand,
        max_weighted: max_demand * config.traffic_weight,
        ..Default::default()
    };

    let addr = |h: HostId| addresses.host_addr(h).ok_or(Error::Unaddressed(h));
    let mut flows = Vec::new();
    for (src, dst, volume, start) in candidates {
        let Some(size) = effective_bytes(volume, config.traffic_weight, divisor) else {
            log::debug!("dropping {src}->{dst} ({volume}): below the noise floor");
            stats.nr_dropped += 1;
            continue;
        };
        flows.push(PlannedFlow {
            id: FlowId::new(flows.len()),
            src,
            dst,
            src_addr: addr(src)?,
            dst_addr: addr(dst)?,
            size,
            start,
            stop: config.horizon,
        });
        stats.total_bytes += size;
    }
    stats.nr_flows = flows.len();
    stats.log();

    Ok(Plan {
        topology: spec.topology,
        addresses,
        flows,
        config,
        stats,
    })
}

/// Parses a topology and a traffic file and plans them with `config`.
pub fn plan_str(topology: &str, traffic: &str, config: PlanConfig) -> Result<Plan, Error> {
    let topology = Topology::parse(topology)?;
    let traffic = Traffic::parse(traffic, config.format, config.parsing)?;
    let spec = PlanSpec::builder()
        .topology(topology)
        .traffic(traffic)
        .config(config)
        .build();
    plan(spec)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidTopology(#[from] TopologyError),

    #[error(transparent)]
    InvalidTraffic(#[from] TrafficError),

    #[error(transparent)]
    InvalidSpec(#[from] PlanError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("host {0} has no address")]
    Unaddressed(HostId),
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::schedule::StartPolicy;
    use crate::testing;
    use crate::units::Bytes;

    #[test]
    fn flow_list_plan_succeeds() -> anyhow::Result<()> {
        let plan = plan_str(testing::TWO_SWITCH, testing::FLOW_LIST, PlanConfig::flow_list())?;
        // The third record carries 70 bits, under the noise floor
        assert_eq!(plan.flows().len(), 2);
        let flow = plan.flows()[0];
        assert_eq!((flow.src, flow.dst), (HostId::new(0), HostId::new(2)));
        assert_eq!(flow.size, Bytes::new(10));
        assert_eq!(flow.start, Some(Nanosecs::new(1_500_000_000)));
        assert_eq!(flow.stop, Nanosecs::from_secs_f64(100.0));
        assert_eq!(flow.src_addr.to_string(), "10.0.0.2");
        assert_eq!(flow.dst_addr.to_string(), "10.0.1.2");
        assert_eq!(plan.flows()[1].id, FlowId::new(1));
        assert_eq!(plan.flows()[1].size, Bytes::new(200));

        let stats = plan.stats();
        assert_eq!((stats.nr_candidates, stats.nr_flows, stats.nr_dropped), (3, 2, 1));
        assert_eq!(stats.total_bytes, Bytes::new(210));
        assert_eq!(stats.max_demand, 1600.0);
        Ok(())
    }

    #[test]
    fn flow_below_noise_floor_is_dropped() -> anyhow::Result<()> {
        let plan = plan_str(testing::TWO_SWITCH, "0,2,70,1.5\n", PlanConfig::flow_list())?;
        assert!(plan.flows().is_empty());
        assert_eq!(plan.stats().nr_dropped, 1);
        Ok(())
    }

    #[test]
    fn matrix_plan_leaves_starts_open() -> anyhow::Result<()> {
        let plan = plan_str(testing::TWO_SWITCH, testing::MATRIX, PlanConfig::matrix())?;
        // Weight 0.1 keeps (0, 1) at 10 B, (1, 2) at 20 B and (2, 0) at 100 B
        let flows = plan
            .flows()
            .iter()
            .map(|f| (f.src.inner(), f.dst.inner(), f.size.into_u64()))
            .collect::<Vec<_>>();
        assert_eq!(flows, vec![(0, 1, 10), (1, 2, 20), (2, 0, 100)]);
        assert!(plan.flows().iter().all(|f| f.start.is_none()));
        assert_eq!(plan.stats().max_weighted, 100.0);
        Ok(())
    }

    #[test]
    fn matrix_of_wrong_size_fails() {
        let res = plan_str(testing::TWO_SWITCH, "0 1\n1 0\n", PlanConfig::matrix());
        assert!(matches!(
            res,
            Err(Error::InvalidSpec(PlanError::InvalidTraffic(..)))
        ));
    }

    #[test]
    fn non_contiguous_hosts_abort_planning() {
        let res = plan_str(
            "0 1\n0->0\n1->0\n2->1\n4->1\n3->0\n",
            "0,2,80,1.5\n",
            PlanConfig::flow_list(),
        );
        assert!(matches!(
            res,
            Err(Error::InvalidTopology(TopologyError::NonContiguousHosts { .. }))
        ));
    }

    #[test]
    fn schedule_keeps_explicit_starts() -> anyhow::Result<()> {
        let plan = plan_str(testing::TWO_SWITCH, testing::FLOW_LIST, PlanConfig::flow_list())?;
        let mut rng = StdRng::seed_from_u64(0);
        let policy = StartPolicy::Fixed {
            at: Nanosecs::new(1),
        };
        let flows = plan.schedule(&policy, &mut rng);
        // Sorted by start: the 0.25 s flow comes first
        let starts = flows.iter().map(|f| (f.id.inner(), f.start)).collect::<Vec<_>>();
        assert_eq!(
            starts,
            vec![
                (1, Nanosecs::new(250_000_000)),
                (0, Nanosecs::new(1_500_000_000))
            ]
        );
        Ok(())
    }

    #[test]
    fn schedule_is_deterministic_per_seed() -> anyhow::Result<()> {
        let plan = plan_str(testing::LEAF_SPINE, &leaf_spine_matrix(), PlanConfig::matrix())?;
        let policy = plan.config().start;
        let a = plan.schedule(&policy, &mut StdRng::seed_from_u64(42));
        let b = plan.schedule(&policy, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), plan.flows().len());
        assert!(a.windows(2).all(|w| (w[0].start, w[0].id) <= (w[1].start, w[1].id)));
        assert!(a
            .iter()
            .all(|f| f.start < Nanosecs::from_secs_f64(100.0)));
        Ok(())
    }

    fn leaf_spine_matrix() -> String {
        (0..6)
            .map(|i| {
                (0..6)
                    .map(|j| if i == j { "0" } else { "500" })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
