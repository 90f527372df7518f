/// Core data structures for the UDP engine
///
/// Messages travel between the engine and its session in pairs: a group
/// segment flagged with `more`, followed by the body segment. Addresses are
/// resolved before the engine ever sees them and stay immutable afterwards.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// One segment of a two-part message
///
/// The group segment of a pair carries `more = true`; the body closes the
/// pair with `more = false`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    data: Vec<u8>,
    more: bool,
}

impl Message {
    /// Create a final (body) segment
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            more: false,
        }
    }

    /// Create a group segment, flagged as followed by a body
    pub fn group(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            more: true,
        }
    }

    /// Build a segment by copying a slice of a receive buffer
    pub fn from_slice(data: &[u8], more: bool) -> Self {
        Self {
            data: data.to_vec(),
            more,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if another segment of the same message follows
    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Address family of the engine's socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => Self::V4,
            SocketAddr::V6(_) => Self::V6,
        }
    }

    /// The unspecified ("any") address of this family
    pub fn unspecified(self) -> IpAddr {
        match self {
            Self::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

/// Operating mode, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Group segment travels inside the datagram behind a length byte
    Framed,
    /// Group segment is the peer's `host:port`; the datagram is the body
    Raw,
}

/// Fully resolved endpoint handed to the engine at initialization
///
/// `bind` is the local address used when receiving; `target` is the fixed
/// destination when sending and, for multicast, the group being joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    bind: SocketAddr,
    target: SocketAddr,
    multicast: bool,
    interface_index: u32,
}

impl ResolvedAddress {
    /// Create a resolved address; multicast is inferred from the target
    pub fn new(bind: SocketAddr, target: SocketAddr) -> Self {
        Self {
            bind,
            target,
            multicast: target.ip().is_multicast(),
            interface_index: 0,
        }
    }

    /// Interface index used for IPv6 group membership (0 = system default)
    pub fn with_interface_index(mut self, interface_index: u32) -> Self {
        self.interface_index = interface_index;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    pub fn target_addr(&self) -> SocketAddr {
        self.target
    }

    pub fn is_multicast(&self) -> bool {
        self.multicast
    }

    pub fn interface_index(&self) -> u32 {
        self.interface_index
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.target)
    }

    /// Address actually passed to `bind`
    ///
    /// Multicast receivers bind the wildcard address on the configured port;
    /// the membership request, not the bind, selects the group.
    pub fn effective_bind_addr(&self) -> SocketAddr {
        if self.multicast {
            SocketAddr::new(AddressFamily::of(&self.bind).unspecified(), self.bind.port())
        } else {
            self.bind
        }
    }
}
