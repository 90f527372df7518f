/// Socket primitives used by the lifecycle manager
///
/// `DatagramSocket` is the seam between the engine and the operating
/// system: `SystemSocket` is the real non-blocking UDP socket, built with
/// socket2 so options can be set before bind.
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};

use crate::contracts::AddressFamily;

/// Non-blocking datagram socket operations required by the engine
pub trait DatagramSocket: Sized {
    /// Open a non-blocking UDP socket of the given family
    fn open(family: AddressFamily) -> io::Result<Self>;

    fn bind_device(&self, device: &str) -> io::Result<()>;

    fn set_reuse_address(&self, enable: bool) -> io::Result<()>;

    /// IP_MULTICAST_LOOP for V4, IPV6_MULTICAST_LOOP for V6
    fn set_multicast_loop(&self, family: AddressFamily, enable: bool) -> io::Result<()>;

    fn bind(&self, addr: SocketAddr) -> io::Result<()>;

    fn join_multicast_v4(&self, group: Ipv4Addr, interface: Ipv4Addr) -> io::Result<()>;

    fn join_multicast_v6(&self, group: Ipv6Addr, interface_index: u32) -> io::Result<()>;

    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize>;

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

/// Operating system UDP socket
#[derive(Debug)]
pub struct SystemSocket {
    inner: UdpSocket,
}

impl SystemSocket {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl DatagramSocket for SystemSocket {
    fn open(family: AddressFamily) -> io::Result<Self> {
        let domain = match family {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            inner: socket.into(),
        })
    }

    #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
    fn bind_device(&self, device: &str) -> io::Result<()> {
        SockRef::from(&self.inner).bind_device(Some(device.as_bytes()))
    }

    #[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
    fn bind_device(&self, _device: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "binding to a network device is not supported on this platform",
        ))
    }

    fn set_reuse_address(&self, enable: bool) -> io::Result<()> {
        SockRef::from(&self.inner).set_reuse_address(enable)
    }

    fn set_multicast_loop(&self, family: AddressFamily, enable: bool) -> io::Result<()> {
        match family {
            AddressFamily::V4 => self.inner.set_multicast_loop_v4(enable),
            AddressFamily::V6 => self.inner.set_multicast_loop_v6(enable),
        }
    }

    fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        SockRef::from(&self.inner).bind(&SockAddr::from(addr))
    }

    fn join_multicast_v4(&self, group: Ipv4Addr, interface: Ipv4Addr) -> io::Result<()> {
        self.inner.join_multicast_v4(&group, &interface)
    }

    fn join_multicast_v6(&self, group: Ipv6Addr, interface_index: u32) -> io::Result<()> {
        self.inner.join_multicast_v6(&group, interface_index)
    }

    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, dest)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf)
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for SystemSocket {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.inner)
    }
}

/// Whether a receive error should simply wait for the next readiness event
///
/// Only errors that point at a broken descriptor or buffer are fatal;
/// resource exhaustion, network-down and would-block conditions are not.
pub fn is_transient_recv_error(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        if let Some(code) = err.raw_os_error() {
            return !matches!(
                code,
                libc::EBADF | libc::EFAULT | libc::ENOMEM | libc::ENOTSOCK
            );
        }
    }

    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::ConnectionReset
    )
}

/// Whether a send error counts as satisfied
///
/// A ready socket does not block on a bounded datagram in practice, so a
/// would-block result is treated as if the datagram went out.
pub fn is_transient_send_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
