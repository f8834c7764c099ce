//! Address derivation. Every address is a pure function of a switch ID, the number of hosts on
//! that switch, and a host or neighbor index.
//!
//! Switch `s` owns two /24 subnets. Its host links live in `10.hi.lo.0/24` and its outgoing
//! switch links in `10.(hi | 0x80).lo.0/24`, where `hi = s / 256` and `lo = s % 256`. The `h`-th
//! host link takes offsets `2h + 1` (switch side) and `2h + 2` (host side). The `k`-th switch link
//! takes offsets `2 + n + 2k` (owning switch) and `3 + n + 2k` (neighbor), where `n` is the
//! number of hosts on `s`. The two subnets of one switch never overlap as long as `hi < 0x80`, and
//! subnets of different switches differ in their second or third octet, so no two links share an
//! address.

use std::net::Ipv4Addr;

use crate::constants::{ADDR_FIRST_OCTET, MAX_HOST_OCTET, MAX_SWITCHES, SUBNET_PREFIX_LEN, SWITCH_LINK_BIT};
use crate::ident::{HostId, SwitchId};
use crate::topology::Topology;

/// An IPv4 subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Subnet {
    base: Ipv4Addr,
    prefix_len: u8,
}

impl Subnet {
    /// Creates a subnet. Host bits of `base` are cleared.
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(32);
        let base = Ipv4Addr::from(u32::from(base) & Self::mask_bits(prefix_len));
        Self { base, prefix_len }
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the subnet mask, e.g. `255.255.255.0` for a /24.
    pub fn mask(&self) -> Ipv4Addr {
        Ipv4Addr::from(Self::mask_bits(self.prefix_len))
    }

    /// Returns the address `offset` positions past the base.
    pub fn nth(&self, offset: u32) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.base) + offset)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask_bits(self.prefix_len) == u32::from(self.base)
    }

    fn mask_bits(prefix_len: u8) -> u32 {
        u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0)
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

/// The two ends of a point-to-point link inside a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LinkAddrs {
    pub subnet: Subnet,
    /// The address of the switch that owns the subnet.
    pub local: Ipv4Addr,
    /// The address of the other end.
    pub remote: Ipv4Addr,
}

/// Splits a switch ID into the octets used in its subnets.
pub fn switch_octets(switch: SwitchId) -> Result<(u8, u8), AddressError> {
    let id = switch.inner();
    if id >= MAX_SWITCHES {
        return Err(AddressError::TooManySwitches { switch });
    }
    Ok(((id / 256) as u8, (id % 256) as u8))
}

/// The subnet holding the host links of `switch`.
pub fn host_subnet(switch: SwitchId) -> Result<Subnet, AddressError> {
    let (hi, lo) = switch_octets(switch)?;
    Ok(Subnet::new(
        Ipv4Addr::new(ADDR_FIRST_OCTET, hi, lo, 0),
        SUBNET_PREFIX_LEN,
    ))
}

/// The subnet holding the outgoing switch links of `switch`.
pub fn switch_link_subnet(switch: SwitchId) -> Result<Subnet, AddressError> {
    let (hi, lo) = switch_octets(switch)?;
    Ok(Subnet::new(
        Ipv4Addr::new(ADDR_FIRST_OCTET, hi | SWITCH_LINK_BIT, lo, 0),
        SUBNET_PREFIX_LEN,
    ))
}

/// Addresses of the link between `switch` and its `index`-th host.
pub fn host_link_addrs(switch: SwitchId, index: usize) -> Result<LinkAddrs, AddressError> {
    let subnet = host_subnet(switch)?;
    let local = index.saturating_mul(2).saturating_add(1);
    let (local, remote) = checked_pair(switch, local)?;
    Ok(LinkAddrs {
        subnet,
        local: subnet.nth(local),
        remote: subnet.nth(remote),
    })
}

/// Addresses of the `index`-th outgoing link of `switch`, which has `nr_hosts` hosts.
pub fn switch_link_addrs(
    switch: SwitchId,
    nr_hosts: usize,
    index: usize,
) -> Result<LinkAddrs, AddressError> {
    let subnet = switch_link_subnet(switch)?;
    let local = index
        .saturating_mul(2)
        .saturating_add(nr_hosts)
        .saturating_add(2);
    let (local, remote) = checked_pair(switch, local)?;
    Ok(LinkAddrs {
        subnet,
        local: subnet.nth(local),
        remote: subnet.nth(remote),
    })
}

// Both ends of a link must fit below the broadcast address.
fn checked_pair(switch: SwitchId, local: usize) -> Result<(u32, u32), AddressError> {
    match u32::try_from(local) {
        Ok(local) if local < MAX_HOST_OCTET => Ok((local, local + 1)),
        _ => Err(AddressError::SubnetExhausted {
            switch,
            offset: local,
        }),
    }
}

/// The addresses of one host link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HostAddrs {
    pub host: HostId,
    pub switch: SwitchId,
    /// Position of the host within its switch.
    pub index: usize,
    pub subnet: Subnet,
    pub switch_addr: Ipv4Addr,
    pub host_addr: Ipv4Addr,
}

/// The addresses of one switch link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SwitchLinkAddrs {
    pub a: SwitchId,
    pub b: SwitchId,
    /// Position of the link among the outgoing links of `a`.
    pub index: usize,
    pub subnet: Subnet,
    pub a_addr: Ipv4Addr,
    pub b_addr: Ipv4Addr,
}

/// Addresses for every link in a topology.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AddressPlan {
    // Indexed by host ID
    hosts: Vec<HostAddrs>,
    // Ordered by owning switch, then by position among its links
    links: Vec<SwitchLinkAddrs>,
}

impl AddressPlan {
    /// Derives addresses for all host links and switch links of `topology`.
    pub fn new(topology: &Topology) -> Result<Self, AddressError> {
        let mut hosts = Vec::with_capacity(topology.nr_hosts());
        let mut links = Vec::with_capacity(topology.nr_links());
        for switch in topology.switches() {
            for (index, &host) in topology.hosts_in(switch).iter().enumerate() {
                let addrs = host_link_addrs(switch, index)?;
                hosts.push(HostAddrs {
                    host,
                    switch,
                    index,
                    subnet: addrs.subnet,
                    switch_addr: addrs.local,
                    host_addr: addrs.remote,
                });
            }
            let nr_hosts = topology.nr_hosts_in(switch);
            for (index, &neighbor) in topology.neighbors(switch).iter().enumerate() {
                let addrs = switch_link_addrs(switch, nr_hosts, index)?;
                links.push(SwitchLinkAddrs {
                    a: switch,
                    b: neighbor,
                    index,
                    subnet: addrs.subnet,
                    a_addr: addrs.local,
                    b_addr: addrs.remote,
                });
            }
        }
        hosts.sort_by_key(|h| h.host);
        Ok(Self { hosts, links })
    }

    /// Returns the address of `host`.
    pub fn host_addr(&self, host: HostId) -> Option<Ipv4Addr> {
        self.hosts.get(host.inner()).map(|h| h.host_addr)
    }

    /// Returns host links ordered by host ID.
    pub fn host_links(&self) -> &[HostAddrs] {
        &self.hosts
    }

    /// Returns switch links ordered by owning switch.
    pub fn switch_links(&self) -> &[SwitchLinkAddrs] {
        &self.links
    }

    /// Returns every assigned address.
    pub fn addrs(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        let hosts = self.hosts.iter().flat_map(|h| [h.switch_addr, h.host_addr]);
        let links = self.links.iter().flat_map(|l| [l.a_addr, l.b_addr]);
        hosts.chain(links)
    }
}

/// Address derivation error.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("switch {switch} is beyond the addressable range")]
    TooManySwitches { switch: SwitchId },

    #[error("subnet of switch {switch} has no room for offset {offset}")]
    SubnetExhausted { switch: SwitchId, offset: usize },
}
