use std::io;

use thiserror::Error;

use crate::icmp::AddressFamily;

/// Failures that can end or degrade a ping session.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("Unable to resolve {host} ({family}): {reason}")]
    Resolution {
        host: String,
        family: AddressFamily,
        reason: String,
    },
    #[error("This program requires root/administrator privileges to open raw sockets. Run with sudo. ({0})")]
    Permission(#[source] io::Error),
    #[error("Failed to set up raw socket: {0}")]
    Socket(#[source] io::Error),
    #[error("Error binding to interface {interface}: {source}")]
    InterfaceBind {
        interface: String,
        #[source]
        source: io::Error,
    },
    #[error("Error in sending packet: {0}")]
    Transmission(#[source] io::Error),
}

/// Classify a raw socket creation failure.
pub fn socket_creation_error(err: io::Error) -> PingError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        PingError::Permission(err)
    } else {
        PingError::Socket(err)
    }
}
