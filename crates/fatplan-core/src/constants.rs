//! Planning constants. These match the defaults of the ns-3 fat-tree drivers.

use crate::units::{Bytes, Mbps, Nanosecs};

/// Flows whose effective byte count falls below this threshold are dropped.
pub const NOISE_FLOOR: Bytes = Bytes::new(10);

/// First octet of every derived address.
pub const ADDR_FIRST_OCTET: u8 = 10;

/// Bit set in the second octet of switch-link subnets.
pub const SWITCH_LINK_BIT: u8 = 0x80;

/// Number of switches whose subnets can be derived without collisions.
pub const MAX_SWITCHES: usize = (SWITCH_LINK_BIT as usize) * 256;

/// Largest usable last octet inside a /24.
pub const MAX_HOST_OCTET: u32 = 254;

/// Prefix length of every derived subnet.
pub const SUBNET_PREFIX_LEN: u8 = 24;

/// Port of the sink application on every host.
pub const SINK_PORT: u16 = 9;

/// Point-to-point link rate.
pub const LINK_RATE: Mbps = Mbps::new(1000);

/// How long ns-3 keeps running after the horizon.
pub const STOP_GRACE: Nanosecs = Nanosecs::new(1_000_000_000);
