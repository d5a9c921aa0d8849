use std::time::Duration;

use crate::protocol::PROTOCOL_VERSION;

/// Default size of the framer transfer buffers, in bytes.
pub const DEFAULT_TRANSFER_BUFFER_SIZE: usize = 19_000;

/// Largest frame a framer will buffer, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// RTP payload type used by sensors that stream answers over RTP.
pub const DEFAULT_RTP_PAYLOAD_TYPE: u8 = 0x40;

/// Link-level configuration shared by the stream and datagram endpoints.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Protocol version written into every request header.
    pub protocol_version: u16,
    /// Initial size of the transfer buffers. They grow on demand.
    pub transfer_buffer_size: usize,
    /// Frames declaring a larger size fail with
    /// [`Capacity`](crate::ComError::Capacity) before any buffer grows.
    pub max_frame_size: usize,
    /// How long a byte-stream read may block before [`Timeout`](crate::ComError::Timeout).
    pub response_timeout: Duration,
    /// Upper bound for establishing a byte-stream connection.
    pub connect_timeout: Duration,
    /// Expected RTP payload type for reassembled answers.
    pub rtp_payload_type: u8,
    /// How long the datagram drain loop waits for the next packet.
    /// Zero drains only what is already queued.
    pub select_timeout: Duration,
    /// Local UDP port for datagram links (0 picks an ephemeral port).
    pub port: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            transfer_buffer_size: DEFAULT_TRANSFER_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            response_timeout: Duration::from_millis(2000),
            connect_timeout: Duration::from_millis(2000),
            rtp_payload_type: DEFAULT_RTP_PAYLOAD_TYPE,
            select_timeout: Duration::ZERO,
            port: 0,
        }
    }
}

/// Thresholds of the RTP sequence validator (RFC 3550 Appendix A.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceConfig {
    /// Largest forward jump still treated as in-order with loss.
    pub max_dropout: u16,
    /// Size of the window behind `max_seq` treated as duplicate/reordered.
    pub max_disorder: u16,
    /// In-order packets required before a source is trusted.
    pub min_sequential: u8,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_dropout: 3000,
            max_disorder: 100,
            min_sequential: 1,
        }
    }
}

/// Configuration of a continuous RTP acquisition session.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Local UDP port to listen on (0 picks an ephemeral port).
    pub port: u16,
    /// Receive timeout of the socket. Bounds how long
    /// [`Acquisition::stop`](crate::Acquisition::stop) may wait for the
    /// reader thread to notice the cleared running flag.
    pub receive_timeout: Duration,
    /// Size of the datagram receive buffer.
    pub receive_buffer_size: usize,
    pub sequence: SequenceConfig,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            port: 0,
            receive_timeout: Duration::from_millis(2000),
            receive_buffer_size: DEFAULT_TRANSFER_BUFFER_SIZE,
            sequence: SequenceConfig::default(),
        }
    }
}
