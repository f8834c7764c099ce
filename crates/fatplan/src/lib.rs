//! `fatplan` turns a fat-tree topology and a traffic file into a simulation plan for ns-3: a
//! subnet and address for every link end, and a schedule of flows between hosts. The plan can be
//! written to disk or handed to ns-3 directly.

#![warn(unreachable_pub, missing_docs)]

pub mod core;
pub mod ns3;
pub mod utils;
