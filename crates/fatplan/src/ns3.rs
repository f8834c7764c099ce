//! Running plans in ns-3.

pub use ns3_frontend::*;
