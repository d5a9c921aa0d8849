//! Fixed-size headers of the element protocol.
//!
//! Every header is decoded field by field from little-endian bytes; no struct
//! is ever overlaid on the wire buffer.
//!
//! ```text
//! Request (8 bytes)
//! +---------+---------+-----------------+
//! | version | code    | total size      |
//! | u16 LE  | u16 LE  | u32 LE          |
//! +---------+---------+-----------------+
//!
//! Answer (16 bytes)
//! +---------+---------+-----------------+---------+--------------+
//! | version | answer  | answer size     | request | reserved (6) |
//! | u16 LE  | u16 LE  | u32 LE          | u16 LE  |              |
//! +---------+---------+-----------------+---------+--------------+
//!
//! Element (8 bytes, followed by count * unit size payload bytes)
//! +---------+---------+-----------------+
//! | id      | count   | unit size       |
//! | u16 LE  | u16 LE  | u32 LE          |
//! +---------+---------+-----------------+
//! ```
//!
//! Both size fields include the header itself.

use crate::error::{ComError, ProtocolErrorKind, Result};

pub const REQUEST_HEADER_LEN: usize = 8;
pub const ANSWER_HEADER_LEN: usize = 16;
pub const ELEMENT_HEADER_LEN: usize = 8;

/// Byte offset of the total-size field inside a request header.
pub const REQUEST_TOTAL_SIZE_OFFSET: usize = 4;

#[inline]
pub(crate) fn get_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

#[inline]
pub(crate) fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
pub(crate) fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn ensure_len(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(ComError::protocol(ProtocolErrorKind::TruncatedHeader {
            needed,
            available: buf.len(),
        }));
    }
    Ok(())
}

/// Header written at the start of every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub protocol_version: u16,
    pub request_code: u16,
    /// Request size in bytes, header included.
    pub total_size: u32,
}

impl RequestHeader {
    pub fn encode(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.protocol_version);
        put_u16(buf, 2, self.request_code);
        put_u32(buf, REQUEST_TOTAL_SIZE_OFFSET, self.total_size);
    }

    /// Decode and validate that the declared size covers at least the header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, REQUEST_HEADER_LEN)?;
        let header = Self {
            protocol_version: get_u16(buf, 0),
            request_code: get_u16(buf, 2),
            total_size: get_u32(buf, REQUEST_TOTAL_SIZE_OFFSET),
        };
        if (header.total_size as usize) < REQUEST_HEADER_LEN {
            return Err(ComError::protocol(ProtocolErrorKind::SizeBelowHeader {
                declared: header.total_size,
                header: REQUEST_HEADER_LEN,
            }));
        }
        Ok(header)
    }

    /// Bytes that follow the header.
    pub fn payload_len(&self) -> usize {
        self.total_size as usize - REQUEST_HEADER_LEN
    }
}

/// Header at the start of every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerHeader {
    pub protocol_version: u16,
    /// Status of the request (see [`answer`](super::answer)).
    pub answer_code: u16,
    /// Answer size in bytes, header included.
    pub answer_size: u32,
    /// Request code echoed by the device.
    pub request_code: u16,
}

impl AnswerHeader {
    pub fn encode(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.protocol_version);
        put_u16(buf, 2, self.answer_code);
        put_u32(buf, 4, self.answer_size);
        put_u16(buf, 8, self.request_code);
        buf[10..ANSWER_HEADER_LEN].fill(0);
    }

    /// Decode and validate that the declared size covers at least the header.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, ANSWER_HEADER_LEN)?;
        let header = Self {
            protocol_version: get_u16(buf, 0),
            answer_code: get_u16(buf, 2),
            answer_size: get_u32(buf, 4),
            request_code: get_u16(buf, 8),
        };
        if (header.answer_size as usize) < ANSWER_HEADER_LEN {
            return Err(ComError::protocol(ProtocolErrorKind::SizeBelowHeader {
                declared: header.answer_size,
                header: ANSWER_HEADER_LEN,
            }));
        }
        Ok(header)
    }

    pub fn payload_len(&self) -> usize {
        self.answer_size as usize - ANSWER_HEADER_LEN
    }
}

/// Header preceding each element payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub id: u16,
    pub count: u16,
    /// Size of one value, in bytes.
    pub unit_size: u32,
}

impl ElementHeader {
    pub fn encode(&self, buf: &mut [u8]) {
        put_u16(buf, 0, self.id);
        put_u16(buf, 2, self.count);
        put_u32(buf, 4, self.unit_size);
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, ELEMENT_HEADER_LEN)?;
        Ok(Self {
            id: get_u16(buf, 0),
            count: get_u16(buf, 2),
            unit_size: get_u32(buf, 4),
        })
    }

    /// Payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        self.count as usize * self.unit_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_layout() {
        let mut buf = [0u8; REQUEST_HEADER_LEN];
        RequestHeader {
            protocol_version: 2,
            request_code: 0x7000,
            total_size: 0x0102_0304,
        }
        .encode(&mut buf);
        assert_eq!(buf, [0x02, 0x00, 0x00, 0x70, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn answer_header_request_code_at_offset_8() {
        let mut buf = [0xFFu8; ANSWER_HEADER_LEN];
        AnswerHeader {
            protocol_version: 2,
            answer_code: 0,
            answer_size: 16,
            request_code: 0x0002,
        }
        .encode(&mut buf);
        assert_eq!(&buf[8..10], &[0x02, 0x00]);
        assert!(buf[10..].iter().all(|b| *b == 0));
        let decoded = AnswerHeader::decode(&buf).unwrap();
        assert_eq!(decoded.request_code, 2);
        assert_eq!(decoded.payload_len(), 0);
    }

    #[test]
    fn answer_size_below_header_rejected() {
        let mut buf = [0u8; ANSWER_HEADER_LEN];
        put_u32(&mut buf, 4, 15);
        let err = AnswerHeader::decode(&buf).unwrap_err();
        assert!(matches!(
            err,
            ComError::Protocol {
                kind: ProtocolErrorKind::SizeBelowHeader { declared: 15, .. }
            }
        ));
    }

    #[test]
    fn truncated_element_header() {
        assert!(ElementHeader::decode(&[0u8; 7]).is_err());
    }
}
