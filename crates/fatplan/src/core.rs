//! Core fatplan data structures and routines. The most common entry point is [plan()], which
//! turns a [specification](PlanSpec) into a [simulation plan](Plan).

pub use fatplan_core::*;
