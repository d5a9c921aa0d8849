//! RTP source validation and loss accounting (RFC 3550 Appendix A.1).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SequenceConfig;

const RTP_SEQ_MOD: u64 = 1 << 16;

/// Per-source sequence state machine.
///
/// A source starts on probation after [`init_sequence`](Self::init_sequence)
/// and becomes valid once `min_sequential` packets arrived in order. While
/// valid, each sequence number is classified by its distance from the highest
/// one seen:
///
/// | Distance (mod 2^16)             | Outcome                                  |
/// |---------------------------------|------------------------------------------|
/// | `< max_dropout`                 | accepted, counts a wrap if it went back  |
/// | `<= 2^16 - max_disorder`        | rejected, unless it follows the previous rejected number (source restart) |
/// | otherwise                       | accepted as duplicate or reordered       |
///
/// Probation packets are not counted as received, except the one that
/// completes probation.
///
/// A reset can be requested from another thread through
/// [`reset_handle`](Self::reset_handle); it is applied at the start of the
/// next [`update_sequence`](Self::update_sequence).
#[derive(Debug)]
pub struct SequenceValidator {
    config: SequenceConfig,
    max_seq: u16,
    cycles: u64,
    base_seq: u64,
    bad_seq: u32,
    probation: u32,
    received: u64,
    reset_requested: Arc<AtomicBool>,
}

impl Default for SequenceValidator {
    fn default() -> Self {
        Self::new(SequenceConfig::default())
    }
}

impl SequenceValidator {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            max_seq: 0,
            cycles: 0,
            base_seq: 0,
            bad_seq: 0,
            probation: 0,
            received: 0,
            reset_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> SequenceConfig {
        self.config
    }

    pub fn max_dropout(&self) -> u16 {
        self.config.max_dropout
    }

    pub fn set_max_dropout(&mut self, max_dropout: u16) {
        self.config.max_dropout = max_dropout;
    }

    pub fn max_disorder(&self) -> u16 {
        self.config.max_disorder
    }

    pub fn set_max_disorder(&mut self, max_disorder: u16) {
        self.config.max_disorder = max_disorder;
    }

    pub fn min_sequential(&self) -> u8 {
        self.config.min_sequential
    }

    pub fn set_min_sequential(&mut self, min_sequential: u8) {
        self.config.min_sequential = min_sequential;
    }

    /// Put the source on probation, expecting `seq` next.
    pub fn init_sequence(&mut self, seq: u16) {
        self.probation = self.config.min_sequential as u32;
        self.max_seq = seq.wrapping_sub(1);
    }

    /// Restart loss accounting from `seq`.
    pub fn reset_sequence(&mut self, seq: u16) {
        self.base_seq = seq as u64;
        self.max_seq = seq;
        self.bad_seq = RTP_SEQ_MOD as u32 + 1;
        self.cycles = 0;
        self.received = 0;
    }

    /// Classify one incoming sequence number. Returns whether it is accepted.
    pub fn update_sequence(&mut self, seq: u16) -> bool {
        if self.reset_requested.swap(false, Ordering::AcqRel) {
            tracing::debug!(max_seq = self.max_seq, "statistics reset applied");
            self.reset_sequence(self.max_seq);
        }

        let delta = seq.wrapping_sub(self.max_seq);

        if self.probation > 0 {
            if seq == self.max_seq.wrapping_add(1) {
                self.probation -= 1;
                self.max_seq = seq;
                if self.probation == 0 {
                    self.reset_sequence(seq);
                    self.received += 1;
                    tracing::debug!(seq, "RTP source validated");
                    return true;
                }
            } else {
                self.probation = (self.config.min_sequential as u32).saturating_sub(1);
                self.max_seq = seq;
            }
            return false;
        }

        if delta < self.config.max_dropout {
            if seq < self.max_seq {
                self.cycles += RTP_SEQ_MOD;
            }
            self.max_seq = seq;
        } else if delta as u64 <= RTP_SEQ_MOD - self.config.max_disorder as u64 {
            if seq as u32 == self.bad_seq {
                tracing::debug!(seq, "RTP sequence restarted");
                self.reset_sequence(seq);
            } else {
                tracing::debug!(seq, max_seq = self.max_seq, "RTP sequence jump rejected");
                self.bad_seq = (seq as u32 + 1) & (RTP_SEQ_MOD as u32 - 1);
                return false;
            }
        } else {
            tracing::trace!(seq, max_seq = self.max_seq, "duplicate or reordered RTP packet");
        }

        self.received += 1;
        true
    }

    /// Packets expected from the extended sequence range but never received.
    pub fn lost_packet_count(&self) -> u64 {
        let extended_max = self.cycles + self.max_seq as u64;
        let expected = (extended_max + 1).saturating_sub(self.base_seq);
        expected.saturating_sub(self.received)
    }

    pub fn packets_received(&self) -> u64 {
        self.received
    }

    pub fn max_seq(&self) -> u16 {
        self.max_seq
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether probation is over.
    pub fn is_valid(&self) -> bool {
        self.probation == 0
    }

    /// Request a statistics reset, applied on the next validated packet.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Shared flag that requests a reset from any thread when set.
    pub fn reset_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.reset_requested)
    }
}
