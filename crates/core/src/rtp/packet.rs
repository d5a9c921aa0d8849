//! Parsed RTP packet view and owned packet builder.

use crate::error::{ComError, ProtocolErrorKind, Result};

pub const RTP_HEADER_LEN: usize = 12;
pub const RTP_VERSION: u8 = 2;

const PADDING_BIT: u8 = 0x20;
const EXTENSION_BIT: u8 = 0x10;
const MARKER_BIT: u8 = 0x80;

/// Borrowed view of one received RTP packet.
///
/// Header fields are decoded with shifts and masks from the first 12 bytes;
/// sequence, timestamp and SSRC are converted from network order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpPacket<'a> {
    marker: bool,
    padding: bool,
    payload_type: u8,
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
    csrc: &'a [u8],
    payload: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < RTP_HEADER_LEN {
            return Err(ComError::protocol(ProtocolErrorKind::TruncatedRtpPacket {
                header: RTP_HEADER_LEN,
                length: buf.len(),
            }));
        }

        let version = buf[0] >> 6;
        if version != RTP_VERSION {
            return Err(ComError::protocol(ProtocolErrorKind::UnsupportedRtpVersion(
                version,
            )));
        }
        if buf[0] & EXTENSION_BIT != 0 {
            return Err(ComError::UnsupportedRtpExtension);
        }

        let csrc_count = (buf[0] & 0x0F) as usize;
        let header_len = RTP_HEADER_LEN + 4 * csrc_count;
        if buf.len() < header_len {
            return Err(ComError::protocol(ProtocolErrorKind::TruncatedRtpPacket {
                header: header_len,
                length: buf.len(),
            }));
        }

        let padding = buf[0] & PADDING_BIT != 0;
        let body = &buf[header_len..];
        let payload = if padding {
            let pad = body.last().copied().unwrap_or(0) as usize;
            if pad == 0 || pad > body.len() {
                return Err(ComError::protocol(ProtocolErrorKind::InvalidRtpPadding {
                    padding: pad,
                    body: body.len(),
                }));
            }
            &body[..body.len() - pad]
        } else {
            body
        };

        if payload.is_empty() {
            return Err(ComError::protocol(ProtocolErrorKind::EmptyRtpPayload));
        }

        Ok(Self {
            marker: buf[1] & MARKER_BIT != 0,
            padding,
            payload_type: buf[1] & 0x7F,
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            timestamp: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            csrc: &buf[RTP_HEADER_LEN..header_len],
            payload,
        })
    }

    pub fn marker(&self) -> bool {
        self.marker
    }

    pub fn padding(&self) -> bool {
        self.padding
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn csrc_count(&self) -> usize {
        self.csrc.len() / 4
    }

    pub fn csrc(&self, index: usize) -> Option<u32> {
        let c = self.csrc.get(index * 4..index * 4 + 4)?;
        Some(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }

    /// Payload bytes with CSRC list and padding removed.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Owned RTP packet under construction.
///
/// The header starts zeroed apart from the version, padding is never set,
/// and the payload region is left for the caller to fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacketBuf {
    data: Vec<u8>,
}

impl RtpPacketBuf {
    pub fn new(payload_len: usize) -> Self {
        let mut data = vec![0u8; RTP_HEADER_LEN + payload_len];
        data[0] = RTP_VERSION << 6;
        Self { data }
    }

    /// Build a packet whose 12-byte header was produced elsewhere.
    pub fn from_parts(header: [u8; RTP_HEADER_LEN], payload: &[u8]) -> Self {
        let mut data = Vec::with_capacity(RTP_HEADER_LEN + payload.len());
        data.extend_from_slice(&header);
        data.extend_from_slice(payload);
        data[0] &= !PADDING_BIT;
        Self { data }
    }

    pub fn set_marker(&mut self, marker: bool) -> &mut Self {
        if marker {
            self.data[1] |= MARKER_BIT;
        } else {
            self.data[1] &= !MARKER_BIT;
        }
        self
    }

    pub fn set_payload_type(&mut self, payload_type: u8) -> &mut Self {
        self.data[1] = (self.data[1] & MARKER_BIT) | (payload_type & 0x7F);
        self
    }

    pub fn set_sequence(&mut self, sequence: u16) -> &mut Self {
        self.data[2..4].copy_from_slice(&sequence.to_be_bytes());
        self
    }

    pub fn set_timestamp(&mut self, timestamp: u32) -> &mut Self {
        self.data[4..8].copy_from_slice(&timestamp.to_be_bytes());
        self
    }

    pub fn set_ssrc(&mut self, ssrc: u32) -> &mut Self {
        self.data[8..12].copy_from_slice(&ssrc.to_be_bytes());
        self
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[RTP_HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn parse(&self) -> Result<RtpPacket<'_>> {
        RtpPacket::parse(&self.data)
    }
}
