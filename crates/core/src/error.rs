//! Error types for the sensor communication stack.

use std::fmt;

/// Errors that can occur while talking to a sensor.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Connection**: [`NotConnected`](Self::NotConnected),
///   [`ConnectFailed`](Self::ConnectFailed),
///   [`ConnectionClosed`](Self::ConnectionClosed), [`Timeout`](Self::Timeout),
///   [`Io`](Self::Io): fatal to the current call, retryable after reconnect.
/// - **Protocol**: [`Protocol`](Self::Protocol),
///   [`UnsupportedRtpExtension`](Self::UnsupportedRtpExtension),
///   [`WrongPayloadType`](Self::WrongPayloadType),
///   [`AnswerCode`](Self::AnswerCode): the current frame is discarded.
/// - **Loss**: [`MissedFrame`](Self::MissedFrame): streaming resumes on its own.
/// - **Capacity**: [`Capacity`](Self::Capacity): buffer growth failed,
///   nothing was committed.
/// - **Acquisition**: [`Callback`](Self::Callback),
///   [`CallbackPanicked`](Self::CallbackPanicked),
///   [`StopFromWorker`](Self::StopFromWorker).
#[derive(Debug, thiserror::Error)]
pub enum ComError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An operation needed an open connection and there was none.
    #[error("device not connected")]
    NotConnected,

    /// The transport could not reach the device.
    #[error("connection to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the byte stream in the middle of a frame.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// No data arrived within the configured response timeout.
    #[error("timed out waiting for the device")]
    Timeout,

    /// Malformed frame, size mismatch or bounds violation.
    #[error("protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// RTP header extensions are not supported by this stack.
    #[error("extended RTP packet not supported")]
    UnsupportedRtpExtension,

    /// A datagram carried an RTP payload type other than the configured one.
    #[error("wrong RTP payload type: expected {expected:#04X}, received {received:#04X}")]
    WrongPayloadType { expected: u8, received: u8 },

    /// A gap was detected while reassembling a frame from RTP fragments.
    #[error("missed a frame (RTP timestamp {timestamp})")]
    MissedFrame { timestamp: u32 },

    /// A transfer buffer could not grow to the requested size.
    #[error("unable to grow buffer to {requested} bytes")]
    Capacity { requested: usize },

    /// The device answered a request with a non-OK answer code.
    #[error("request {request_code:#06X} answered with code {answer_code:#06X}")]
    AnswerCode { request_code: u16, answer_code: u16 },

    /// The packet callback of an acquisition session returned an error.
    #[error("packet callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The packet callback of an acquisition session panicked.
    #[error("packet callback panicked")]
    CallbackPanicked,

    /// `stop` was invoked from the acquisition thread itself.
    #[error("acquisition cannot be stopped from its own reader thread")]
    StopFromWorker,
}

/// Specific kind of malformed-frame failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// Fewer bytes than a fixed header needs.
    TruncatedHeader { needed: usize, available: usize },
    /// An answer or request declared a size smaller than its own header.
    SizeBelowHeader { declared: u32, header: usize },
    /// A declared frame size is larger than the bytes actually received.
    FrameOverrun { declared: usize, available: usize },
    /// An element declared more payload than the frame has left.
    ElementOverrun { declared: usize, remaining: usize },
    /// The answer echoed a different request code than the one sent.
    RequestCodeMismatch { expected: u16, received: u16 },
    /// No element has been read yet.
    NoCurrentElement,
    /// An element was added before any request or answer was started.
    NoMessageStarted,
    /// Caller count differs from the count of the last element read.
    CountMismatch { expected: u16, received: u16 },
    /// Caller unit size cannot hold one value of the last element read.
    UnitSizeTooSmall { element: u32, requested: u32 },
    /// Stride smaller than the unit size it steps over.
    StrideTooSmall { stride: usize, unit_size: usize },
    /// Source slice is too short for `count` values at the given stride.
    SourceTooShort { needed: usize, available: usize },
    /// Destination slice is too short for `count` values at the given stride.
    DestinationTooSmall { needed: usize, available: usize },
    /// RTP version field other than 2.
    UnsupportedRtpVersion(u8),
    /// RTP packet shorter than its fixed header plus CSRC list.
    TruncatedRtpPacket { header: usize, length: usize },
    /// RTP padding length larger than the packet body.
    InvalidRtpPadding { padding: usize, body: usize },
    /// RTP packet without payload bytes.
    EmptyRtpPayload,
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader { needed, available } => {
                write!(f, "truncated header ({available} of {needed} bytes)")
            }
            Self::SizeBelowHeader { declared, header } => {
                write!(f, "declared size {declared} is below header size {header}")
            }
            Self::FrameOverrun {
                declared,
                available,
            } => write!(
                f,
                "declared frame size {declared} exceeds {available} received bytes"
            ),
            Self::ElementOverrun {
                declared,
                remaining,
            } => write!(
                f,
                "element needs {declared} bytes but only {remaining} remain"
            ),
            Self::RequestCodeMismatch { expected, received } => write!(
                f,
                "received request code {received:#06X}, expected {expected:#06X}"
            ),
            Self::NoCurrentElement => write!(f, "no element has been read"),
            Self::NoMessageStarted => write!(f, "no request or answer has been started"),
            Self::CountMismatch { expected, received } => {
                write!(f, "element count is {expected}, caller asked for {received}")
            }
            Self::UnitSizeTooSmall { element, requested } => write!(
                f,
                "unit size {requested} cannot hold element values of {element} bytes"
            ),
            Self::StrideTooSmall { stride, unit_size } => {
                write!(f, "stride {stride} is smaller than unit size {unit_size}")
            }
            Self::SourceTooShort { needed, available } => {
                write!(f, "source holds {available} bytes, {needed} needed")
            }
            Self::DestinationTooSmall { needed, available } => {
                write!(f, "destination holds {available} bytes, {needed} needed")
            }
            Self::UnsupportedRtpVersion(v) => write!(f, "unexpected RTP version {v}"),
            Self::TruncatedRtpPacket { header, length } => {
                write!(f, "RTP packet of {length} bytes is shorter than its {header}-byte header")
            }
            Self::InvalidRtpPadding { padding, body } => {
                write!(f, "RTP padding of {padding} bytes exceeds {body}-byte body")
            }
            Self::EmptyRtpPayload => write!(f, "RTP payload is empty"),
        }
    }
}

/// Coarse classification of a [`ComError`], used to decide how to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Reconnect and retry.
    Connection,
    /// Frame discarded; the link is ready for the next request or datagram.
    Protocol,
    /// Data was lost but the stream resynchronizes without intervention.
    Loss,
    /// Memory could not be obtained.
    Capacity,
    /// Failure raised by user code in an acquisition callback.
    Callback,
}

impl ComError {
    pub(crate) fn protocol(kind: ProtocolErrorKind) -> Self {
        Self::Protocol { kind }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_)
            | Self::NotConnected
            | Self::ConnectFailed { .. }
            | Self::ConnectionClosed
            | Self::Timeout
            | Self::StopFromWorker => ErrorCategory::Connection,
            Self::Protocol { .. }
            | Self::UnsupportedRtpExtension
            | Self::WrongPayloadType { .. }
            | Self::AnswerCode { .. } => ErrorCategory::Protocol,
            Self::MissedFrame { .. } => ErrorCategory::Loss,
            Self::Capacity { .. } => ErrorCategory::Capacity,
            Self::Callback(_) | Self::CallbackPanicked => ErrorCategory::Callback,
        }
    }

    /// Whether the link must be reconnected before it can be used again.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectFailed { .. } | Self::ConnectionClosed
        )
    }
}

/// Convenience alias for `Result<T, ComError>`.
pub type Result<T> = std::result::Result<T, ComError>;
