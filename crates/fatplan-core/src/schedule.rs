//! Start-time scheduling for flows whose traffic file does not say when they start.

use std::net::Ipv4Addr;

use rand::Rng;

use crate::ident::{FlowId, HostId};
use crate::plan::Plan;
use crate::units::{Bytes, Nanosecs};

/// How unscheduled flows get their start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StartPolicy {
    /// Every flow starts at `at`.
    Fixed { at: Nanosecs },
    /// Start times are drawn uniformly from `[0, window)`.
    Uniform { window: Nanosecs },
}

impl StartPolicy {
    /// Draws a start time.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Nanosecs {
        match *self {
            StartPolicy::Fixed { at } => at,
            StartPolicy::Uniform { window } if window == Nanosecs::ZERO => Nanosecs::ZERO,
            StartPolicy::Uniform { window } => Nanosecs::new(rng.gen_range(0..window.into_u64())),
        }
    }
}

/// A planned flow with a resolved start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScheduledFlow {
    pub id: FlowId,
    pub src: HostId,
    pub dst: HostId,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub size: Bytes,
    pub start: Nanosecs,
    pub stop: Nanosecs,
}

impl Plan {
    /// Resolves the start time of every flow. Flows with an explicit start keep it; the others
    /// draw one from `policy`, in ID order. The result is sorted by start time, with ties broken
    /// by flow ID.
    pub fn schedule<R: Rng>(&self, policy: &StartPolicy, rng: &mut R) -> Vec<ScheduledFlow> {
        let mut flows = self
            .flows
            .iter()
            .map(|f| ScheduledFlow {
                id: f.id,
                src: f.src,
                dst: f.dst,
                src_addr: f.src_addr,
                dst_addr: f.dst_addr,
                size: f.size,
                start: f.start.unwrap_or_else(|| policy.sample(rng)),
                stop: f.stop,
            })
            .collect::<Vec<_>>();
        flows.sort_by_key(|f| (f.start, f.id));
        let nr_late = flows.iter().filter(|f| f.start >= f.stop).count();
        if nr_late > 0 {
            log::warn!("{nr_late} flow(s) start at or after the horizon and will never run");
        }
        flows
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn fixed_policy_ignores_rng() {
        let mut rng = StdRng::seed_from_u64(0);
        let policy = StartPolicy::Fixed {
            at: Nanosecs::new(42),
        };
        assert!((0..10).all(|_| policy.sample(&mut rng) == Nanosecs::new(42)));
    }

    #[test]
    fn uniform_policy_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let window = Nanosecs::new(1_000);
        let policy = StartPolicy::Uniform { window };
        assert!((0..1000).all(|_| policy.sample(&mut rng) < window));
    }

    #[test]
    fn empty_window_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = StartPolicy::Uniform {
            window: Nanosecs::ZERO,
        };
        assert_eq!(policy.sample(&mut rng), Nanosecs::ZERO);
    }
}
