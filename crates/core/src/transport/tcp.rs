use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{ComError, Result};

use super::StreamTransport;

/// [`StreamTransport`] over a `std::net::TcpStream`.
#[derive(Debug)]
pub struct TcpTransport {
    addr: SocketAddr,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
            stream: None,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(ComError::NotConnected)
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl StreamTransport for TcpTransport {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = TcpStream::connect_timeout(&self.addr, self.connect_timeout).map_err(
            |source| ComError::ConnectFailed {
                addr: self.addr.to_string(),
                source,
            },
        )?;
        stream.set_nodelay(true)?;
        tracing::info!(addr = %self.addr, "TCP connected");
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::info!(addr = %self.addr, "TCP disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream()?.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream()?;
        let limit = if timeout.is_zero() { None } else { Some(timeout) };
        stream.set_read_timeout(limit)?;

        match stream.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.stream = None;
                Err(ComError::ConnectionClosed)
            }
            Ok(n) => Ok(n),
            Err(e) if is_timeout(&e) => Err(ComError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn discard_pending(&mut self) -> Result<()> {
        let stream = self.stream()?;
        stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 1024];
        let drained = loop {
            match stream.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        stream.set_nonblocking(false)?;
        drained.map_err(Into::into)
    }
}
