//! RTP (RFC 3550) support for sensors that stream answers as datagrams.
//!
//! A sensor splits each answer frame into RTP packets sharing one
//! timestamp; the marker bit flags the last packet of a frame.
//!
//! - [`packet`]: parse a received datagram, or build one.
//! - [`sequence`]: source validation and loss accounting.
//! - [`header`] / [`packetizer`]: the sending side, used to simulate a sensor.

pub mod header;
pub mod packet;
pub mod packetizer;
pub mod sequence;

pub use header::RtpHeader;
pub use packet::{RTP_HEADER_LEN, RtpPacket, RtpPacketBuf};
pub use packetizer::AnswerPacketizer;
pub use sequence::SequenceValidator;
