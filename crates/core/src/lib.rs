//! Communication stack for element-tagged sensor protocols.
//!
//! - [`protocol`]: request/answer framing ([`Framer`]) and the stock
//!   commands built on it.
//! - [`rtp`]: RTP packet parsing and building, sequence validation
//!   ([`SequenceValidator`]) and answer packetization.
//! - [`Reassembler`]: rebuilds answer frames from RTP-over-UDP fragments.
//! - [`StreamLink`] / [`DatagramLink`]: a framer bound to a TCP or UDP
//!   transport.
//! - [`Acquisition`]: background thread delivering RTP packets to a
//!   callback with loss statistics.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod reassembler;
pub mod rtp;
pub mod transport;

#[cfg(test)]
mod test_util;

pub use acquisition::Acquisition;
pub use config::{AcquisitionConfig, LinkConfig, SequenceConfig};
pub use error::{ComError, ErrorCategory, ProtocolErrorKind, Result};
pub use link::{DatagramFraming, DatagramLink, StreamLink};
pub use protocol::Framer;
pub use reassembler::Reassembler;
pub use rtp::{AnswerPacketizer, RtpPacket, SequenceValidator};
pub use transport::{DatagramTransport, StreamTransport, TcpTransport, UdpTransport};
