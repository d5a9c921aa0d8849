//! In-memory transports for unit tests.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ComError, Result};
use crate::transport::{DatagramTransport, StreamTransport};

pub fn peer() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 49_000)
}

/// Datagram transport replaying queued datagrams.
#[derive(Debug, Default)]
pub struct ScriptedDatagram {
    queue: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    open: AtomicBool,
}

impl ScriptedDatagram {
    pub fn new(datagrams: Vec<Vec<u8>>) -> Self {
        let t = Self::default();
        t.queue.lock().extend(datagrams);
        t.open.store(true, Ordering::SeqCst);
        t
    }

    pub fn push(&self, datagram: Vec<u8>) {
        self.queue.lock().push_back(datagram);
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

impl DatagramTransport for ScriptedDatagram {
    fn open(&self, _port: u16, _timeout: Duration) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn local_port(&self) -> Option<u16> {
        self.is_open().then_some(40_000)
    }

    fn send_to(&self, data: &[u8], _addr: SocketAddr) -> Result<usize> {
        self.sent.lock().push(data.to_vec());
        Ok(data.len())
    }

    fn receive_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        if !self.is_open() {
            return Err(ComError::NotConnected);
        }
        let Some(datagram) = self.queue.lock().pop_front() else {
            std::thread::sleep(Duration::from_millis(1));
            return Ok(None);
        };
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(Some((n, peer())))
    }

    fn select(&self, _timeout: Duration) -> Result<bool> {
        Ok(!self.queue.lock().is_empty())
    }
}

/// Byte-stream transport that serves queued chunks, one per read.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    pub inbound: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub connected: bool,
    pub refuse_connect: bool,
    pub discarded: usize,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, bytes: &[u8]) {
        self.inbound.push_back(bytes.to_vec());
    }
}

impl StreamTransport for ScriptedStream {
    fn connect(&mut self) -> Result<()> {
        if self.refuse_connect {
            return Err(ComError::ConnectFailed {
                addr: peer().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(ComError::NotConnected);
        }
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(ComError::NotConnected);
        }
        let Some(mut chunk) = self.inbound.pop_front() else {
            return Err(ComError::Timeout);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.inbound.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn discard_pending(&mut self) -> Result<()> {
        self.discarded += self.inbound.drain(..).map(|c| c.len()).sum::<usize>();
        Ok(())
    }
}
