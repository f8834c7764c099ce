//! This module defines planning specifications ([`PlanSpec`]): a topology, the traffic to place
//! on it, and the configuration that says how.

use crate::config::PlanConfig;
use crate::constants::STOP_GRACE;
use crate::ident::HostId;
use crate::topology::Topology;
use crate::traffic::{Traffic, TrafficError, TrafficFormat};
use crate::units::Nanosecs;

/// A planning specification.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct PlanSpec {
    /// The validated topology.
    pub topology: Topology,
    /// The parsed traffic file.
    pub traffic: Traffic,
    /// Planner configuration.
    #[builder(default = PlanConfig::for_format(traffic.format()))]
    pub config: PlanConfig,
}

impl PlanSpec {
    /// Validate a specification, producing a `ValidSpec`.
    ///
    /// Correctness properties:
    ///
    /// - The traffic has the format the configuration expects
    /// - The traffic weight is finite and non-negative
    /// - The simulation stop time, one grace period past the horizon, is representable
    /// - Every flow record has a valid source and destination
    /// - A traffic matrix has one row and one column per host
    pub(crate) fn validate(self) -> Result<ValidSpec, PlanError> {
        // CORRECTNESS: The traffic has the format the configuration expects.
        if self.traffic.format() != self.config.format {
            return Err(PlanError::FormatMismatch {
                expected: self.config.format,
                got: self.traffic.format(),
            });
        }
        // CORRECTNESS: The traffic weight is finite and non-negative.
        let weight = self.config.traffic_weight;
        if !weight.is_finite() || weight < 0.0 {
            return Err(PlanError::InvalidWeight(weight));
        }
        // CORRECTNESS: The simulation stop time is representable.
        let horizon = self.config.horizon;
        if horizon.into_u64().checked_add(STOP_GRACE.into_u64()).is_none() {
            return Err(PlanError::HorizonTooLarge(horizon));
        }
        let nr_hosts = self.topology.nr_hosts();
        match &self.traffic {
            Traffic::FlowList(records) => {
                // CORRECTNESS: Every flow record has a valid source and destination.
                for (record, r) in records.iter().enumerate() {
                    if r.src.inner() >= nr_hosts {
                        return Err(PlanError::InvalidFlowSrc { record, src: r.src });
                    }
                    if r.dst.inner() >= nr_hosts {
                        return Err(PlanError::InvalidFlowDst { record, dst: r.dst });
                    }
                }
            }
            // CORRECTNESS: A traffic matrix has one row and one column per host.
            Traffic::Matrix(matrix) => matrix.validate_for(nr_hosts)?,
        }
        Ok(ValidSpec {
            topology: self.topology,
            traffic: self.traffic,
            config: self.config,
        })
    }
}

/// A `ValidSpec` is a `PlanSpec` that has been validated. The traffic is guaranteed to satisfy
/// the properties listed in `PlanSpec::validate()`.
#[derive(Debug)]
pub(crate) struct ValidSpec {
    pub(crate) topology: Topology,
    pub(crate) traffic: Traffic,
    pub(crate) config: PlanConfig,
}

/// Planning specification error.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The traffic does not have the configured format.
    #[error("expected {expected} traffic, got {got}")]
    FormatMismatch {
        expected: TrafficFormat,
        got: TrafficFormat,
    },

    /// The traffic weight is negative or not a number.
    #[error("invalid traffic weight {0}")]
    InvalidWeight(f64),

    /// The horizon leaves no room to stop the simulation after it.
    #[error("horizon {0} is too large")]
    HorizonTooLarge(Nanosecs),

    /// A flow record has an invalid source.
    #[error("flow record {record} has an invalid source ({src})")]
    InvalidFlowSrc { record: usize, src: HostId },

    /// A flow record has an invalid destination.
    #[error("flow record {record} has an invalid destination ({dst})")]
    InvalidFlowDst { record: usize, dst: HostId },

    /// The traffic does not fit the topology.
    #[error("invalid traffic")]
    InvalidTraffic(#[from] TrafficError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::traffic::{FlowRecord, NumberParsing, TrafficMatrix};

    #[test]
    fn valid_spec_succeeds() -> anyhow::Result<()> {
        let spec = spec(vec![record(0, 2)])?;
        assert!(spec.validate().is_ok());
        Ok(())
    }

    #[test]
    fn invalid_flow_src_fails() -> anyhow::Result<()> {
        let spec = spec(vec![record(0, 2), record(100, 2)])?;
        assert!(matches!(
            spec.validate(),
            Err(PlanError::InvalidFlowSrc { record: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn invalid_flow_dst_fails() -> anyhow::Result<()> {
        let spec = spec(vec![record(0, 3)])?;
        assert!(matches!(
            spec.validate(),
            Err(PlanError::InvalidFlowDst { .. })
        ));
        Ok(())
    }

    #[test]
    fn format_mismatch_fails() -> anyhow::Result<()> {
        let spec = PlanSpec::builder()
            .topology(Topology::parse(testing::TWO_SWITCH)?)
            .traffic(Traffic::FlowList(vec![record(0, 1)]))
            .config(PlanConfig::matrix())
            .build();
        assert!(matches!(
            spec.validate(),
            Err(PlanError::FormatMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn negative_weight_fails() -> anyhow::Result<()> {
        let mut spec = spec(vec![])?;
        spec.config.traffic_weight = -1.0;
        assert!(matches!(spec.validate(), Err(PlanError::InvalidWeight(..))));
        Ok(())
    }

    #[test]
    fn horizon_near_the_end_of_time_fails() -> anyhow::Result<()> {
        let mut too_late = spec(vec![record(0, 2)])?;
        too_late.config.horizon = Nanosecs::MAX;
        assert!(matches!(too_late.validate(), Err(PlanError::HorizonTooLarge(..))));

        let mut last = spec(vec![record(0, 2)])?;
        last.config.horizon = Nanosecs::new(u64::MAX - STOP_GRACE.into_u64());
        assert!(last.validate().is_ok());
        Ok(())
    }

    #[test]
    fn matrix_dimensions_are_checked() -> anyhow::Result<()> {
        let matrix = TrafficMatrix::parse("0 1\n1 0\n", NumberParsing::Strict)?;
        let spec = PlanSpec::builder()
            .topology(Topology::parse(testing::TWO_SWITCH)?)
            .traffic(Traffic::Matrix(matrix))
            .build();
        assert!(matches!(
            spec.validate(),
            Err(PlanError::InvalidTraffic(TrafficError::Dimensions { nr_hosts: 3, .. }))
        ));
        Ok(())
    }

    fn spec(records: Vec<FlowRecord>) -> anyhow::Result<PlanSpec> {
        Ok(PlanSpec::builder()
            .topology(Topology::parse(testing::TWO_SWITCH)?)
            .traffic(Traffic::FlowList(records))
            .build())
    }

    fn record(src: usize, dst: usize) -> FlowRecord {
        FlowRecord {
            src: HostId::new(src),
            dst: HostId::new(dst),
            size: 800,
            start: Nanosecs::ZERO,
        }
    }
}
