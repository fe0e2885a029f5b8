use socket2::{SockAddr, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::unix::AsyncFd;

use crate::engine::{Datagram, EchoTransport};
use crate::error::{PingError, socket_creation_error};
use crate::icmp::AddressFamily;
use crate::utils;

const RECV_BUFFER_LEN: usize = 1024;

/// Raw ICMP/ICMPv6 socket driven by the tokio reactor.
pub struct IcmpSocket {
    inner: AsyncFd<Socket>,
    family: AddressFamily,
}

impl IcmpSocket {
    pub fn new(family: AddressFamily) -> Result<Self, PingError> {
        let socket = Socket::new(family.domain(), Type::RAW, Some(family.protocol()))
            .map_err(socket_creation_error)?;

        socket.set_nonblocking(true).map_err(PingError::Socket)?;
        let inner = AsyncFd::new(socket).map_err(PingError::Socket)?;

        Ok(Self { inner, family })
    }

    /// Bind outgoing traffic to `interface` (`SO_BINDTODEVICE`).
    #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
    pub fn bind_to_interface(&self, interface: &str) -> Result<(), PingError> {
        self.inner
            .get_ref()
            .bind_device(Some(interface.as_bytes()))
            .map_err(|source| PingError::InterfaceBind {
                interface: interface.to_string(),
                source,
            })
    }

    #[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
    pub fn bind_to_interface(&self, interface: &str) -> Result<(), PingError> {
        Err(PingError::InterfaceBind {
            interface: interface.to_string(),
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "binding to a device is not supported on this platform",
            ),
        })
    }

    pub fn set_ttl(&self, ttl: u32) -> Result<(), PingError> {
        let socket = self.inner.get_ref();
        match self.family {
            AddressFamily::V4 => socket.set_ttl(ttl).map_err(PingError::Socket),
            AddressFamily::V6 => {
                // Some ICMPv6 packet classes go out through the multicast path
                socket.set_multicast_hops_v6(ttl).map_err(PingError::Socket)?;
                socket.set_unicast_hops_v6(ttl).map_err(PingError::Socket)
            }
        }
    }

    pub fn set_read_timeout(&self, timeout: Duration) -> Result<(), PingError> {
        self.inner
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(PingError::Socket)
    }
}

impl EchoTransport for IcmpSocket {
    async fn send_to(&self, packet: &[u8], destination: IpAddr) -> io::Result<usize> {
        let address = SockAddr::from(SocketAddr::new(destination, 0));

        log::debug!("Sending ICMP packet to {}: {} bytes", destination, packet.len());
        loop {
            let mut guard = self.inner.writable().await?;
            match guard.try_io(|inner| inner.get_ref().send_to(packet, &address)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv_from(&self) -> io::Result<Datagram> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| receive(inner.get_ref())) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

fn receive(socket: &Socket) -> io::Result<Datagram> {
    let mut buffer = [MaybeUninit::<u8>::uninit(); RECV_BUFFER_LEN];
    let (len, source) = socket.recv_from(&mut buffer)?;

    // SAFETY: recv_from initialised the first `len` bytes of the buffer.
    let bytes = buffer[..len]
        .iter()
        .map(|byte| unsafe { byte.assume_init() })
        .collect();

    let source = source
        .as_socket()
        .map(|addr| addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "datagram from a non-IP address"))?;

    log::debug!("Received {} bytes from {}", len, source);
    Ok(Datagram { bytes, source })
}

/// Open and configure the session socket.
///
/// Binding to an interface is only attempted for IPv4 and never fails the session.
pub fn open_socket(
    family: AddressFamily,
    interface: Option<&str>,
    ttl: u32,
    timeout: Duration,
) -> Result<IcmpSocket, PingError> {
    let socket = IcmpSocket::new(family)?;

    match (interface, family) {
        (Some(name), AddressFamily::V4) => {
            if let Err(e) = socket.bind_to_interface(name) {
                log::warn!("{}", e);
                utils::print_warning(&e.to_string());
            }
        }
        (Some(name), AddressFamily::V6) => {
            log::debug!("Interface binding is IPv4 only, ignoring '{}'", name);
        }
        (None, _) => {}
    }

    socket.set_ttl(ttl)?;
    socket.set_read_timeout(timeout)?;

    Ok(socket)
}
