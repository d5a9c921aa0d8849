//! Rebuilds answer frames from RTP fragments.
//!
//! A streaming sensor sends each answer as consecutive RTP packets that
//! share a timestamp, with the marker bit on the last one. The reassembler
//! appends payloads while sequence numbers advance by exactly one and hands
//! the whole frame to a [`Framer`] when the marker arrives.
//!
//! Any gap invalidates the frame being built. The reassembler then waits
//! for a clean start: the packet after a marker, or a packet that skips
//! exactly one sequence number (the lost marker) with a new timestamp.

use std::time::Duration;

use crate::error::{ComError, Result};
use crate::protocol::Framer;
use crate::rtp::{RtpPacket, SequenceValidator};
use crate::transport::DatagramTransport;

/// Room reserved up front for the payload accumulator.
pub const REASSEMBLY_RESERVE: usize = 200_000;

/// How far below `u16::MAX` a tracked sequence number must be for a small
/// incoming number to count as a wrap instead of stale data.
const WRAP_TOLERANCE: u16 = u16::MAX / 100;

/// What one datagram did to the frame being rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// Older than the tracked sequence number; ignored.
    Stale,
    /// Dropped because the frame is invalid or a packet is missing.
    /// `missed` is set when this gap should be reported as a missed frame.
    Gap { missed: bool },
    /// Appended to the frame being rebuilt.
    Appended,
    /// Completed a frame of `frame_len` bytes, now loaded in the framer.
    Completed { frame_len: usize },
}

/// Result of draining the socket once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Size of the frame delivered to the framer, if one completed.
    pub frame_len: Option<usize>,
    /// Timestamp of the last gap reported as a missed frame.
    pub missed_frame: Option<u32>,
}

#[derive(Debug)]
pub struct Reassembler {
    payload_type: u8,
    payload: Vec<u8>,
    frame_valid: bool,
    sequence: u16,
    timestamp: u32,
    first_frame: bool,
    last_error_timestamp: u32,
    validator: SequenceValidator,
    seeded: bool,
}

impl Reassembler {
    pub fn new(payload_type: u8) -> Self {
        Self {
            payload_type,
            payload: Vec::with_capacity(REASSEMBLY_RESERVE),
            frame_valid: false,
            sequence: 0,
            timestamp: 0,
            first_frame: true,
            last_error_timestamp: 0,
            validator: SequenceValidator::default(),
            seeded: false,
        }
    }

    /// Forget all stream state, as on a new connection.
    pub fn reset(&mut self) {
        self.payload.clear();
        self.frame_valid = false;
        self.sequence = 0;
        self.timestamp = 0;
        self.first_frame = true;
        self.last_error_timestamp = 0;
        self.validator = SequenceValidator::new(self.validator.config());
        self.seeded = false;
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn is_frame_valid(&self) -> bool {
        self.frame_valid
    }

    /// Bytes accumulated for the frame in progress.
    pub fn pending_len(&self) -> usize {
        self.payload.len()
    }

    /// Last tracked sequence number and timestamp.
    pub fn position(&self) -> (u16, u32) {
        (self.sequence, self.timestamp)
    }

    /// Loss statistics over every packet seen since the last reset.
    pub fn validator(&self) -> &SequenceValidator {
        &self.validator
    }

    fn discard(&mut self) {
        self.frame_valid = false;
        self.payload.clear();
    }

    /// Feed one datagram.
    ///
    /// Unsupported or foreign packets are errors; they also invalidate the
    /// frame in progress so later packets resynchronize cleanly.
    /// A repeated sequence number is not stale, so it breaks the frame in
    /// progress like a gap does.
    pub fn push(&mut self, datagram: &[u8], framer: &mut Framer) -> Result<Fragment> {
        let packet = match RtpPacket::parse(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                self.discard();
                return Err(e);
            }
        };
        if packet.payload_type() != self.payload_type {
            self.discard();
            return Err(ComError::WrongPayloadType {
                expected: self.payload_type,
                received: packet.payload_type(),
            });
        }

        let seq = packet.sequence();
        let ts = packet.timestamp();

        if !self.seeded {
            self.validator.init_sequence(seq);
            self.seeded = true;
        }
        self.validator.update_sequence(seq);

        let mut next_frame_valid = false;
        if !self.frame_valid {
            if packet.marker() {
                next_frame_valid = true;
            }
            if self.timestamp != ts && seq == self.sequence.wrapping_add(2) {
                tracing::debug!(seq, timestamp = ts, "resynchronized on frame start");
                self.frame_valid = true;
                self.payload.clear();
                self.sequence = seq.wrapping_sub(1);
            }
        }

        let outcome = if seq < self.sequence && seq > WRAP_TOLERANCE {
            tracing::trace!(seq, tracked = self.sequence, "stale RTP packet ignored");
            Ok(Fragment::Stale)
        } else if !self.frame_valid || seq != self.sequence.wrapping_add(1) {
            self.discard();
            let mut missed = false;
            if ts != self.last_error_timestamp {
                // The first gap after start is expected while joining mid-frame.
                missed = !self.first_frame;
                self.last_error_timestamp = ts;
            }
            if missed {
                tracing::warn!(seq, expected = self.sequence.wrapping_add(1), timestamp = ts, "RTP packet missed");
            }
            Ok(Fragment::Gap { missed })
        } else {
            self.first_frame = false;
            self.payload.extend_from_slice(packet.payload());
            if packet.marker() {
                self.complete(framer)
            } else {
                Ok(Fragment::Appended)
            }
        };

        let wrapped = seq < WRAP_TOLERANCE && self.sequence > u16::MAX - WRAP_TOLERANCE;
        if seq >= self.sequence.wrapping_add(1) || wrapped {
            self.sequence = seq;
            self.timestamp = ts;
        }

        if next_frame_valid {
            self.frame_valid = true;
        }

        outcome
    }

    fn complete(&mut self, framer: &mut Framer) -> Result<Fragment> {
        let frame_len = self.payload.len();
        let copied = framer
            .inbound_region(0, frame_len)
            .map(|region| region.copy_from_slice(&self.payload));
        self.payload.clear();
        copied?;

        framer.load_answer(frame_len)?;
        tracing::trace!(frame_len, "frame reassembled");
        Ok(Fragment::Completed { frame_len })
    }

    /// Read datagrams until a frame completes or none is pending.
    ///
    /// `buf` receives each datagram. A missed frame is only reported through
    /// the returned [`DrainReport`], so a frame that completed in the same
    /// pass is still delivered.
    pub fn drain<T: DatagramTransport + ?Sized>(
        &mut self,
        transport: &T,
        buf: &mut [u8],
        select_timeout: Duration,
        framer: &mut Framer,
    ) -> Result<DrainReport> {
        framer.clear_inbound();
        let mut report = DrainReport::default();

        while report.frame_len.is_none() && transport.select(select_timeout)? {
            let Some((len, _from)) = transport.receive_from(buf)? else {
                break;
            };
            match self.push(&buf[..len], framer)? {
                Fragment::Completed { frame_len } => report.frame_len = Some(frame_len),
                Fragment::Gap { missed: true } => report.missed_frame = Some(self.last_error_timestamp),
                Fragment::Gap { missed: false } | Fragment::Appended | Fragment::Stale => {}
            }
        }

        Ok(report)
    }
}
