//! Planner configuration. The two presets correspond to the two kinds of traffic file.

use derivative::Derivative;

use crate::schedule::StartPolicy;
use crate::traffic::{NumberParsing, TrafficFormat};
use crate::units::{Bytes, Nanosecs};

/// Everything the planner needs besides the topology and the traffic itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanConfig {
    /// The shape of the traffic file.
    pub format: TrafficFormat,
    /// Multiplier applied to every volume before conversion to bytes.
    pub traffic_weight: f64,
    /// When flows and sinks stop.
    pub horizon: Nanosecs,
    /// Propagation delay of every point-to-point link.
    pub link_delay: Nanosecs,
    /// The application that sends each flow.
    pub application: Application,
    /// How flows without an explicit start time are scheduled.
    pub start: StartPolicy,
    #[serde(default)]
    pub parsing: NumberParsing,
    /// Which result files ns-3 writes.
    #[serde(default)]
    pub outputs: Outputs,
}

impl PlanConfig {
    /// Configuration for flow lists: full weight, a 100 s horizon, UDP on/off senders and an
    /// ASCII trace.
    pub fn flow_list() -> Self {
        Self {
            format: TrafficFormat::FlowList,
            traffic_weight: 1.0,
            horizon: Nanosecs::from_secs_f64(100.0),
            link_delay: Nanosecs::new(100),
            application: Application::OnOff {
                protocol: Protocol::Udp,
                on_time: Nanosecs::from_secs_f64(1000.0),
                off_time: Nanosecs::from_secs_f64(0.0001),
                packet_size: Bytes::new(2048),
            },
            start: StartPolicy::Fixed { at: Nanosecs::ZERO },
            parsing: NumberParsing::Strict,
            outputs: Outputs::Trace,
        }
    }

    /// Configuration for traffic matrices: a tenth of the demand, a 10000 s horizon, TCP bulk
    /// senders, start times drawn from the first 100 s and a flow-monitor file.
    pub fn matrix() -> Self {
        Self {
            format: TrafficFormat::Matrix,
            traffic_weight: 0.1,
            horizon: Nanosecs::from_secs_f64(10_000.0),
            link_delay: Nanosecs::new(1_000),
            application: Application::BulkSend,
            start: StartPolicy::Uniform {
                window: Nanosecs::from_secs_f64(100.0),
            },
            parsing: NumberParsing::Strict,
            outputs: Outputs::FlowMonitor,
        }
    }

    /// Returns the preset for `format`.
    pub fn for_format(format: TrafficFormat) -> Self {
        match format {
            TrafficFormat::FlowList => Self::flow_list(),
            TrafficFormat::Matrix => Self::matrix(),
        }
    }
}

/// The transport used by an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    /// The ns-3 socket factory for this protocol.
    pub fn socket_factory(&self) -> &'static str {
        match self {
            Protocol::Udp => "ns3::UdpSocketFactory",
            Protocol::Tcp => "ns3::TcpSocketFactory",
        }
    }
}

/// The application installed for every flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Application {
    /// Send the flow's bytes over TCP as fast as possible.
    BulkSend,
    /// Alternate between exponentially distributed on and off periods with the given means.
    OnOff {
        protocol: Protocol,
        on_time: Nanosecs,
        off_time: Nanosecs,
        packet_size: Bytes,
    },
}

impl Application {
    /// The transport used by the application and by the sinks that receive it.
    pub fn protocol(&self) -> Protocol {
        match self {
            Application::BulkSend => Protocol::Tcp,
            Application::OnOff { protocol, .. } => *protocol,
        }
    }
}

/// Result files written by ns-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case")]
pub enum Outputs {
    /// An XML flow-monitor file at the result path.
    #[derivative(Default)]
    FlowMonitor,
    /// An ASCII trace next to the result path, with a `.tr` suffix.
    Trace,
    /// Both of the above.
    Both,
}

impl Outputs {
    pub fn flow_monitor(&self) -> bool {
        matches!(self, Outputs::FlowMonitor | Outputs::Both)
    }

    pub fn trace(&self) -> bool {
        matches!(self, Outputs::Trace | Outputs::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outputs::FlowMonitor => "flow-monitor",
            Outputs::Trace => "trace",
            Outputs::Both => "both",
        }
    }
}

impl std::str::FromStr for Outputs {
    type Err = UnknownOutputs;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow-monitor" => Ok(Outputs::FlowMonitor),
            "trace" => Ok(Outputs::Trace),
            "both" => Ok(Outputs::Both),
            _ => Err(UnknownOutputs(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Outputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized choice of result files.
#[derive(Debug, thiserror::Error)]
#[error("unknown outputs `{0}` (expected `flow-monitor`, `trace` or `both`)")]
pub struct UnknownOutputs(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_traffic_format() {
        assert_eq!(PlanConfig::for_format(TrafficFormat::FlowList).format, TrafficFormat::FlowList);
        assert_eq!(PlanConfig::for_format(TrafficFormat::Matrix).format, TrafficFormat::Matrix);
        assert_eq!(PlanConfig::flow_list().application.protocol(), Protocol::Udp);
        assert_eq!(PlanConfig::matrix().application.protocol(), Protocol::Tcp);
        assert_eq!(PlanConfig::matrix().horizon, Nanosecs::new(10_000_000_000_000));
    }

    #[test]
    fn presets_pick_result_files() {
        assert_eq!(PlanConfig::flow_list().outputs, Outputs::Trace);
        assert_eq!(PlanConfig::matrix().outputs, Outputs::FlowMonitor);
        assert!(Outputs::Both.trace() && Outputs::Both.flow_monitor());
        assert_eq!("trace".parse::<Outputs>().ok(), Some(Outputs::Trace));
        assert!("xml".parse::<Outputs>().is_err());
    }
}
