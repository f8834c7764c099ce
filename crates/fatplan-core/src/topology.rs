//! This module defines the [`Topology`] of a fat-tree: switches, the links between them, and the
//! hosts attached to each switch. Topologies are read from a line-oriented edge list.

use std::ops::Range;

use itertools::Itertools;
use petgraph::unionfind::UnionFind;
use rustc_hash::FxHashMap;

use crate::constants::MAX_SWITCHES;
use crate::ident::{HostId, SwitchId};

/// A link between two switches. The link belongs to switch `a`, which is the switch that
/// listed it; `b` is the neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct SwitchLink {
    pub a: SwitchId,
    pub b: SwitchId,
}

/// A host attached to a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct HostLink {
    pub host: HostId,
    pub switch: SwitchId,
}

/// An immutable, validated topology.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Topology {
    links: Vec<SwitchLink>,
    // Outgoing neighbors per switch, in file order
    adjacency: Vec<Vec<SwitchId>>,
    // Sorted, contiguous host IDs per switch
    hosts: Vec<Vec<HostId>>,
    // Indexed by host ID
    host2switch: Vec<SwitchId>,
}

impl Topology {
    /// Creates a topology from switch links and host links. The number of switches is the largest
    /// switch index referenced by `links`, plus one, and never less than one.
    ///
    /// Correctness properties:
    ///
    /// - No switch is linked to itself.
    /// - Every host is attached to a declared switch.
    /// - Every host is attached exactly once.
    /// - The hosts of every switch are contiguous.
    /// - Host IDs cover `[0, nr_hosts)`.
    pub fn new(links: &[SwitchLink], host_links: &[HostLink]) -> Result<Self, TopologyError> {
        let nr_switches = links
            .iter()
            .map(|l| std::cmp::max(l.a, l.b).inner() + 1)
            .max()
            .unwrap_or(1)
            .max(1);
        if nr_switches > MAX_SWITCHES {
            return Err(TopologyError::TooManySwitches {
                got: nr_switches,
                max: MAX_SWITCHES,
            });
        }
        let mut adjacency = vec![Vec::new(); nr_switches];
        for &SwitchLink { a, b } in links {
            // CORRECTNESS: No switch is linked to itself.
            if a == b {
                return Err(TopologyError::SwitchAdjacentSelf(a));
            }
            adjacency[a.inner()].push(b);
        }
        let mut hosts = vec![Vec::new(); nr_switches];
        let mut owners = FxHashMap::default();
        for &HostLink { host, switch } in host_links {
            // CORRECTNESS: Every host is attached to a declared switch.
            if switch.inner() >= nr_switches {
                return Err(TopologyError::UndeclaredSwitch { host, switch });
            }
            // CORRECTNESS: Every host is attached exactly once.
            if owners.insert(host, switch).is_some() {
                return Err(TopologyError::DuplicateHost(host));
            }
            hosts[switch.inner()].push(host);
        }
        // CORRECTNESS: The hosts of every switch are contiguous.
        for (i, owned) in hosts.iter_mut().enumerate() {
            owned.sort();
            let contiguous = owned
                .iter()
                .tuple_windows()
                .all(|(x, y)| y.inner() == x.inner() + 1);
            if !contiguous {
                return Err(TopologyError::NonContiguousHosts {
                    switch: SwitchId::new(i),
                    hosts: owned.clone(),
                });
            }
        }
        // CORRECTNESS: Host IDs cover `[0, nr_hosts)`. IDs are unique, so it is enough that none
        // of them is out of range.
        let nr_hosts = owners.len();
        if owners.keys().any(|h| h.inner() >= nr_hosts) {
            let missing = (0..nr_hosts)
                .map(HostId::new)
                .find(|h| !owners.contains_key(h))
                .unwrap_or(HostId::new(nr_hosts));
            return Err(TopologyError::SparseHostIds { missing });
        }
        let mut host2switch = vec![SwitchId::ZERO; nr_hosts];
        for (host, switch) in owners {
            host2switch[host.inner()] = switch;
        }
        Ok(Self {
            links: links.to_vec(),
            adjacency,
            hosts,
            host2switch,
        })
    }

    /// Parses a topology from its edge-list form. Each line is either `A B`, a link between
    /// switches `A` and `B`, or `H->S`, host `H` attached to switch `S`. Blank lines are skipped.
    /// The first line of any other shape ends the edge list, and the rest of the input is
    /// ignored.
    ///
    /// A host may only reference a switch that an earlier link line has already declared.
    pub fn parse(s: &str) -> Result<Self, TopologyError> {
        let lines = s.lines().collect::<Vec<_>>();
        let mut nr_switches = 1;
        let mut links = Vec::new();
        let mut host_links = Vec::new();
        for (i, &line) in lines.iter().enumerate() {
            let lineno = i + 1;
            match EdgeLine::classify(line) {
                EdgeLine::Blank => continue,
                EdgeLine::Switches(a, b) => {
                    let max = std::cmp::max(a, b);
                    if max >= MAX_SWITCHES {
                        return Err(TopologyError::SwitchIndexTooLarge {
                            switch: SwitchId::new(max),
                            line: lineno,
                        });
                    }
                    nr_switches = std::cmp::max(nr_switches, max + 1);
                    links.push(SwitchLink::new(SwitchId::new(a), SwitchId::new(b)));
                }
                EdgeLine::Host(host, switch) => {
                    if switch >= nr_switches {
                        return Err(TopologyError::OutOfRangeSwitch {
                            host: HostId::new(host),
                            switch: SwitchId::new(switch),
                            nr_switches,
                            line: lineno,
                        });
                    }
                    host_links.push(HostLink::new(HostId::new(host), SwitchId::new(switch)));
                }
                EdgeLine::Other => {
                    let nr_ignored = lines[i + 1..]
                        .iter()
                        .filter(|l| !l.trim().is_empty())
                        .count();
                    log::warn!(
                        "edge list ends at line {lineno} ({line:?}); ignoring {nr_ignored} remaining line(s)"
                    );
                    break;
                }
            }
        }
        let topology = Self::new(&links, &host_links)?;
        log::info!("num_switches: {}", topology.nr_switches());
        log::info!("total_hosts: {}", topology.nr_hosts());
        log::info!("num_network_edges: {}", topology.nr_links());
        log::info!("num_host_edges: {}", host_links.len());
        Ok(topology)
    }

    /// Returns the number of switches.
    pub fn nr_switches(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns the number of hosts.
    pub fn nr_hosts(&self) -> usize {
        self.host2switch.len()
    }

    /// Returns an iterator over all switch IDs.
    pub fn switches(&self) -> impl Iterator<Item = SwitchId> {
        (0..self.nr_switches()).map(SwitchId::new)
    }

    /// Returns an iterator over all host IDs.
    pub fn hosts(&self) -> impl Iterator<Item = HostId> {
        (0..self.nr_hosts()).map(HostId::new)
    }

    /// Returns the outgoing neighbors of `switch` in the order their links were listed.
    pub fn neighbors(&self, switch: SwitchId) -> &[SwitchId] {
        self.adjacency
            .get(switch.inner())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the sorted hosts attached to `switch`.
    pub fn hosts_in(&self, switch: SwitchId) -> &[HostId] {
        self.hosts
            .get(switch.inner())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the number of hosts attached to `switch`.
    pub fn nr_hosts_in(&self, switch: SwitchId) -> usize {
        self.hosts_in(switch).len()
    }

    /// Returns the half-open range of host IDs attached to `switch`. The range is empty if the
    /// switch has no hosts.
    pub fn host_range(&self, switch: SwitchId) -> Range<usize> {
        match (self.hosts_in(switch).first(), self.hosts_in(switch).last()) {
            (Some(first), Some(last)) => first.inner()..last.inner() + 1,
            _ => 0..0,
        }
    }

    /// Returns the switch that `host` is attached to.
    pub fn switch_of(&self, host: HostId) -> Option<SwitchId> {
        self.host2switch.get(host.inner()).copied()
    }

    /// Returns the position of `host` among the hosts of its switch.
    pub fn index_in_switch(&self, host: HostId) -> Option<usize> {
        self.switch_of(host)
            .map(|s| host.inner() - self.host_range(s).start)
    }

    /// Returns true if every switch with hosts can reach every other switch with hosts over
    /// switch links. Without this, some host pairs have no route.
    pub fn hosts_connected(&self) -> bool {
        let mut components = UnionFind::<usize>::new(self.nr_switches());
        for link in &self.links {
            components.union(link.a.inner(), link.b.inner());
        }
        self.switches()
            .filter(|&s| self.nr_hosts_in(s) > 0)
            .map(|s| components.find(s.inner()))
            .all_equal()
    }

    delegate::delegate! {
        to self.links {
            /// Returns the number of switch links.
            #[call(len)]
            pub fn nr_links(&self) -> usize;
        }
    }

    /// Returns the switch links in the order they were listed.
    pub fn links(&self) -> &[SwitchLink] {
        &self.links
    }
}

enum EdgeLine {
    Blank,
    Switches(usize, usize),
    Host(usize, usize),
    Other,
}

impl EdgeLine {
    fn classify(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return EdgeLine::Blank;
        }
        if let Some((host, switch)) = line.split_once("->") {
            return match (host.trim().parse(), switch.trim().parse()) {
                (Ok(host), Ok(switch)) => EdgeLine::Host(host, switch),
                _ => EdgeLine::Other,
            };
        }
        match line.split_whitespace().collect::<Vec<_>>()[..] {
            [a, b] => match (a.parse(), b.parse()) {
                (Ok(a), Ok(b)) => EdgeLine::Switches(a, b),
                _ => EdgeLine::Other,
            },
            _ => EdgeLine::Other,
        }
    }
}

/// Topology construction error. All of these are fatal: no partial topology is usable.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Graph file has out of bounds nodes at line {line}: {host}->{switch} (NSW: {nr_switches})")]
    OutOfRangeSwitch {
        host: HostId,
        switch: SwitchId,
        nr_switches: usize,
        line: usize,
    },

    #[error("Switch {switch} at line {line} exceeds the addressable range")]
    SwitchIndexTooLarge { switch: SwitchId, line: usize },

    #[error("Too many switches (got {got}, max {max})")]
    TooManySwitches { got: usize, max: usize },

    #[error("Switch {0} is linked to itself")]
    SwitchAdjacentSelf(SwitchId),

    #[error("Host {host} is attached to undeclared switch {switch}")]
    UndeclaredSwitch { host: HostId, switch: SwitchId },

    #[error("Host {0} is attached more than once")]
    DuplicateHost(HostId),

    #[error("Hosts in switch {switch} are not contiguous: {hosts:?}")]
    NonContiguousHosts { switch: SwitchId, hosts: Vec<HostId> },

    #[error("Host IDs are not dense (host {missing} is missing)")]
    SparseHostIds { missing: HostId },
}
