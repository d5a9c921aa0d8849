//! Splits protocol frames into RTP datagrams.

use super::header::RtpHeader;

/// Payload bytes per datagram, keeping packets under a 1500-byte Ethernet MTU.
pub const DEFAULT_MTU: usize = 1400;

/// Fragments whole answer frames into RTP packets.
///
/// This is the sender side of the [`Reassembler`](crate::Reassembler):
/// every fragment of one frame carries the same timestamp, sequence numbers
/// are consecutive and only the last fragment has the marker bit.
#[derive(Debug, Clone)]
pub struct AnswerPacketizer {
    header: RtpHeader,
    mtu: usize,
}

impl AnswerPacketizer {
    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        Self {
            header: RtpHeader::new(payload_type, ssrc),
            mtu: DEFAULT_MTU,
        }
    }

    pub fn with_random_ssrc(payload_type: u8) -> Self {
        Self {
            header: RtpHeader::with_random_ssrc(payload_type),
            mtu: DEFAULT_MTU,
        }
    }

    /// Maximum payload bytes per packet (at least 1).
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu.max(1);
        self
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn header(&self) -> &RtpHeader {
        &self.header
    }

    /// Sender state, e.g. to skip sequence numbers when simulating loss.
    pub fn header_mut(&mut self) -> &mut RtpHeader {
        &mut self.header
    }

    /// Packetize one frame, then advance the timestamp by `timestamp_increment`.
    pub fn packetize(&mut self, frame: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>> {
        let mut packets = Vec::with_capacity(frame.len().div_ceil(self.mtu));
        let mut chunks = frame.chunks(self.mtu).peekable();

        while let Some(chunk) = chunks.next() {
            let marker = chunks.peek().is_none();
            let hdr = self.header.write(marker);
            let mut packet = Vec::with_capacity(hdr.len() + chunk.len());
            packet.extend_from_slice(&hdr);
            packet.extend_from_slice(chunk);
            packets.push(packet);
        }

        tracing::trace!(
            frame_size = frame.len(),
            fragments = packets.len(),
            timestamp = self.header.timestamp(),
            "frame packetized"
        );
        self.header.advance_timestamp(timestamp_increment);
        packets
    }
}
