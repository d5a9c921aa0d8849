//! Transport collaborators the protocol layers are written against.
//!
//! The core never opens sockets itself. It talks to a device through one
//! of two traits:
//!
//! - [`StreamTransport`]: an ordered byte stream (TCP, serial). A frame may
//!   arrive in several reads.
//! - [`DatagramTransport`]: a message socket (UDP). One receive returns one
//!   whole datagram.
//!
//! [`tcp::TcpTransport`] and [`udp::UdpTransport`] adapt `std::net` sockets
//! to these traits.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;

pub mod tcp;
pub mod udp;

pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Ordered, reliable byte stream to one device.
pub trait StreamTransport: Send {
    /// Open the connection. Connecting an open transport is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Close the connection. Disconnecting a closed transport is a no-op.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read at most `buf.len()` bytes, waiting up to `timeout`.
    ///
    /// Returns the number of bytes read, never 0: a closed peer is
    /// [`ConnectionClosed`](crate::ComError::ConnectionClosed) and an expired
    /// wait is [`Timeout`](crate::ComError::Timeout).
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Drop whatever input is already buffered.
    fn discard_pending(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Datagram socket shared between a reader thread and its owner.
pub trait DatagramTransport: Send + Sync {
    /// Bind to `port` (0 for an ephemeral port). Receives block up to
    /// `timeout`; zero means no limit.
    fn open(&self, port: u16, timeout: Duration) -> Result<()>;

    fn close(&self);

    fn is_open(&self) -> bool;

    /// Locally bound port, once open.
    fn local_port(&self) -> Option<u16>;

    fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<usize>;

    /// Receive one datagram. `None` means the receive timeout expired.
    fn receive_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>>;

    /// Wait up to `timeout` for a datagram to be pending. Zero only checks
    /// what is already queued.
    fn select(&self, timeout: Duration) -> Result<bool>;
}

impl<T: DatagramTransport + ?Sized> DatagramTransport for std::sync::Arc<T> {
    fn open(&self, port: u16, timeout: Duration) -> Result<()> {
        (**self).open(port, timeout)
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn local_port(&self) -> Option<u16> {
        (**self).local_port()
    }

    fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<usize> {
        (**self).send_to(data, addr)
    }

    fn receive_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        (**self).receive_from(buf)
    }

    fn select(&self, timeout: Duration) -> Result<bool> {
        (**self).select(timeout)
    }
}
