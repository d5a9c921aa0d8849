//! Outbound RTP header state.

/// Sender-side RTP fixed header state (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The sequence number wraps and advances on every [`write`](Self::write).
/// The timestamp only moves when the caller advances it, so all fragments
/// of one frame share a timestamp.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug, Clone)]
pub struct RtpHeader {
    /// RTP payload type (7-bit).
    pub payload_type: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
    timestamp: u32,
}

impl RtpHeader {
    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        tracing::debug!(
            payload_type,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP sender state created"
        );
        Self {
            payload_type: payload_type & 0x7F,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(payload_type: u8) -> Self {
        Self::new(payload_type, rand::random::<u32>())
    }

    /// Start the sequence at `sequence` instead of 0.
    pub fn with_sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    /// Sequence number the next [`write`](Self::write) will use.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    ///
    /// The `marker` bit flags the last packet of a frame.
    pub fn write(&mut self, marker: bool) -> [u8; 12] {
        let mut header = [0u8; 12];
        header[0] = 2 << 6;
        header[1] = ((marker as u8) << 7) | self.payload_type;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Skip `count` sequence numbers without writing packets.
    pub fn skip(&mut self, count: u16) {
        self.sequence = self.sequence.wrapping_add(count);
    }

    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(increment);
    }
}
