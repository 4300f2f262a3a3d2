// ABOUTME: parses the network protocol names accepted by NetworkWrite.
// ABOUTME: each name maps to a transport and an optional address family restriction.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported protocol {0:?} (expected tcp, tcp4, tcp6, udp, udp4 or udp6)")]
pub struct UnsupportedProtocol(pub String);

impl Protocol {
    pub fn transport(self) -> Transport {
        match self {
            Protocol::Tcp | Protocol::Tcp4 | Protocol::Tcp6 => Transport::Tcp,
            Protocol::Udp | Protocol::Udp4 | Protocol::Udp6 => Transport::Udp,
        }
    }

    /// `None` means either family is acceptable.
    pub fn family(self) -> Option<AddressFamily> {
        match self {
            Protocol::Tcp | Protocol::Udp => None,
            Protocol::Tcp4 | Protocol::Udp4 => Some(AddressFamily::V4),
            Protocol::Tcp6 | Protocol::Udp6 => Some(AddressFamily::V6),
        }
    }

    pub fn accepts(self, addr: &SocketAddr) -> bool {
        match self.family() {
            None => true,
            Some(AddressFamily::V4) => addr.is_ipv4(),
            Some(AddressFamily::V6) => addr.is_ipv6(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tcp4 => "tcp4",
            Protocol::Tcp6 => "tcp6",
            Protocol::Udp => "udp",
            Protocol::Udp4 => "udp4",
            Protocol::Udp6 => "udp6",
        }
    }
}

impl FromStr for Protocol {
    type Err = UnsupportedProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "tcp4" => Ok(Protocol::Tcp4),
            "tcp6" => Ok(Protocol::Tcp6),
            "udp" => Ok(Protocol::Udp),
            "udp4" => Ok(Protocol::Udp4),
            "udp6" => Ok(Protocol::Udp6),
            other => Err(UnsupportedProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
