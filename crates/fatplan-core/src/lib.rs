#![warn(unreachable_pub, missing_debug_implementations)]

//! The core fatplan library. This crate defines [the routine](run::plan) that turns a fat-tree
//! topology and a traffic file into a [simulation plan](Plan): an address for every link end and
//! a schedule of flows.

pub mod addressing;
pub mod constants;
pub mod ident;
pub mod units;

mod config;
mod plan;
mod run;
mod schedule;
mod spec;
mod topology;
mod traffic;

#[cfg(test)]
pub(crate) mod testing;

pub use addressing::{AddressError, AddressPlan, HostAddrs, Subnet, SwitchLinkAddrs};
pub use config::{Application, Outputs, PlanConfig, Protocol, UnknownOutputs};
pub use ident::{FlowId, HostId, SwitchId};
pub use plan::{effective_bytes, Plan, PlanStats, PlannedFlow};
pub use run::{plan, plan_str, Error};
pub use schedule::{ScheduledFlow, StartPolicy};
pub use spec::{PlanError, PlanSpec};
pub use topology::{HostLink, SwitchLink, Topology, TopologyError};
pub use traffic::{
    FlowRecord, NumberParsing, Traffic, TrafficError, TrafficFormat, TrafficMatrix, UnknownFormat,
};
