use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{ComError, Result};

use super::DatagramTransport;

/// [`DatagramTransport`] over a `std::net::UdpSocket`.
///
/// The socket lives behind a lock so an acquisition thread can receive
/// while its owner queries or closes it.
#[derive(Debug)]
pub struct UdpTransport {
    bind_ip: IpAddr,
    socket: RwLock<Option<UdpSocket>>,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl UdpTransport {
    /// Transport that binds on `bind_ip` when opened.
    pub fn new(bind_ip: IpAddr) -> Self {
        Self {
            bind_ip,
            socket: RwLock::new(None),
        }
    }

    fn with_socket<R>(&self, f: impl FnOnce(&UdpSocket) -> Result<R>) -> Result<R> {
        let guard = self.socket.read();
        let socket = guard.as_ref().ok_or(ComError::NotConnected)?;
        f(socket)
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Windows reports a datagram larger than the peek buffer as an error
/// (`WSAEMSGSIZE`); it is still pending.
fn is_truncated(e: &std::io::Error) -> bool {
    cfg!(windows) && e.raw_os_error() == Some(10040)
}

impl DatagramTransport for UdpTransport {
    fn open(&self, port: u16, timeout: Duration) -> Result<()> {
        let mut slot = self.socket.write();
        if slot.is_some() {
            return Ok(());
        }

        let addr = SocketAddr::new(self.bind_ip, port);
        let socket = UdpSocket::bind(addr).map_err(|source| ComError::ConnectFailed {
            addr: addr.to_string(),
            source,
        })?;
        let limit = if timeout.is_zero() { None } else { Some(timeout) };
        socket.set_read_timeout(limit)?;
        tracing::info!(local = %socket.local_addr()?, "UDP socket opened");
        *slot = Some(socket);
        Ok(())
    }

    fn close(&self) {
        if self.socket.write().take().is_some() {
            tracing::info!("UDP socket closed");
        }
    }

    fn is_open(&self) -> bool {
        self.socket.read().is_some()
    }

    fn local_port(&self) -> Option<u16> {
        let guard = self.socket.read();
        guard.as_ref()?.local_addr().ok().map(|a| a.port())
    }

    fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<usize> {
        self.with_socket(|s| Ok(s.send_to(data, addr)?))
    }

    fn receive_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        self.with_socket(|s| match s.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    fn select(&self, timeout: Duration) -> Result<bool> {
        self.with_socket(|s| {
            let mut probe = [0u8; 1];
            let pending = if timeout.is_zero() {
                s.set_nonblocking(true)?;
                let peeked = s.peek_from(&mut probe);
                s.set_nonblocking(false)?;
                peeked
            } else {
                let previous = s.read_timeout()?;
                s.set_read_timeout(Some(timeout))?;
                let peeked = s.peek_from(&mut probe);
                s.set_read_timeout(previous)?;
                peeked
            };

            match pending {
                Ok(_) => Ok(true),
                Err(e) if is_timeout(&e) => Ok(false),
                Err(e) if is_truncated(&e) => Ok(true),
                Err(e) => Err(e.into()),
            }
        })
    }
}
