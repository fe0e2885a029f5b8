pub mod packet;
pub mod socket;

pub use packet::*;
pub use socket::*;

use socket2::{Domain, Protocol};
use std::fmt;
use std::net::IpAddr;

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn from_ipv6_flag(ipv6: bool) -> Self {
        if ipv6 { AddressFamily::V6 } else { AddressFamily::V4 }
    }

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    pub fn echo_request_type(self) -> u8 {
        match self {
            AddressFamily::V4 => ICMP_ECHO_REQUEST,
            AddressFamily::V6 => ICMPV6_ECHO_REQUEST,
        }
    }

    pub fn echo_reply_type(self) -> u8 {
        match self {
            AddressFamily::V4 => ICMP_ECHO_REPLY,
            AddressFamily::V6 => ICMPV6_ECHO_REPLY,
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        }
    }

    pub fn protocol(self) -> Protocol {
        match self {
            AddressFamily::V4 => Protocol::ICMPV4,
            AddressFamily::V6 => Protocol::ICMPV6,
        }
    }

    /// Protocol name as shown to the operator.
    pub fn protocol_name(self) -> &'static str {
        match self {
            AddressFamily::V4 => "ICMP",
            AddressFamily::V6 => "ICMPv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Header fields of an inbound ICMP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl EchoReply {
    pub fn is_echo_reply(&self, family: AddressFamily) -> bool {
        self.icmp_type == family.echo_reply_type()
    }

    /// Whether this message is the reply to the probe `(identifier, sequence)`.
    pub fn answers(&self, identifier: u16, sequence: u16, family: AddressFamily) -> bool {
        self.is_echo_reply(family) && self.identifier == identifier && self.sequence == sequence
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("malformed packet: {len} bytes, need at least {needed}")]
    Malformed { len: usize, needed: usize },
    #[error("checksum mismatch: header carries {carried:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { carried: u16, computed: u16 },
}
