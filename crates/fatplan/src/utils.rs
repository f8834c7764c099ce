//! Reading inputs and writing plans.

pub use fatplan_utils::*;
