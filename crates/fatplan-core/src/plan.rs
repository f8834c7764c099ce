//! Simulation plans. A [`Plan`] is everything the simulation engine needs: the topology, an
//! address for every link end, and the flows to install.

use std::net::Ipv4Addr;

use crate::addressing::AddressPlan;
use crate::config::PlanConfig;
use crate::constants::NOISE_FLOOR;
use crate::ident::{FlowId, HostId};
use crate::topology::Topology;
use crate::units::{Bytes, Nanosecs};

/// A flow ready to be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlannedFlow {
    pub id: FlowId,
    pub src: HostId,
    pub dst: HostId,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub size: Bytes,
    /// `None` if the traffic file does not say when the flow starts.
    pub start: Option<Nanosecs>,
    pub stop: Nanosecs,
}

/// Converts a traffic volume into the number of bytes to send. The result is `None` if the flow
/// falls below the noise floor and should not be installed.
pub fn effective_bytes(volume: f64, weight: f64, divisor: f64) -> Option<Bytes> {
    let bytes = (volume * weight / divisor).trunc();
    // NaN fails the comparison as well
    if bytes >= NOISE_FLOOR.into_f64() {
        Some(Bytes::new(bytes as u64))
    } else {
        None
    }
}

/// Aggregate numbers about a plan, for operators.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PlanStats {
    /// Flows read from the traffic file, including dropped ones.
    pub nr_candidates: usize,
    pub nr_flows: usize,
    /// Flows below the noise floor.
    pub nr_dropped: usize,
    pub total_bytes: Bytes,
    /// Largest volume in the traffic file, in its own units.
    pub max_demand: f64,
    /// `max_demand` after weighting.
    pub max_weighted: f64,
}

impl PlanStats {
    pub(crate) fn log(&self) {
        log::info!(
            "Max Traffic: {}, Weighted: {}",
            self.max_demand,
            self.max_weighted
        );
        log::info!(
            "Total Flows in the system: {} carrying {} bytes ({} dropped below the noise floor)",
            self.nr_flows,
            self.total_bytes.into_u64(),
            self.nr_dropped
        );
    }
}

/// A complete simulation plan.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Plan {
    pub(crate) topology: Topology,
    pub(crate) addresses: AddressPlan,
    pub(crate) flows: Vec<PlannedFlow>,
    pub(crate) config: PlanConfig,
    pub(crate) stats: PlanStats,
}

impl Plan {
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn addresses(&self) -> &AddressPlan {
        &self.addresses
    }

    /// Returns the flows in ID order.
    pub fn flows(&self) -> &[PlannedFlow] {
        &self.flows
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    /// Returns the time at which flows and sinks stop.
    pub fn horizon(&self) -> Nanosecs {
        self.config.horizon
    }
}
