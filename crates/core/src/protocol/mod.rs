//! Element-tagged request/answer protocol.
//!
//! Every exchange is a request followed by one answer. Both are a fixed
//! header followed by zero or more elements packed back to back:
//!
//! ```text
//! +----------------+----------+-----------+----------+-----------+---
//! | request/answer | element  | values    | element  | values    |
//! | header         | header   | count*sz  | header   | count*sz  | ...
//! +----------------+----------+-----------+----------+-----------+---
//! ```
//!
//! The header's size field always equals the header length plus every
//! element header and payload that follows. See [`wire`] for the exact
//! byte layouts and [`Framer`] for building and walking frames.
//!
//! ## Common request codes
//!
//! | Code | Constant | Purpose |
//! |------|----------|---------|
//! | 0x0001 | [`request::LISTING`] | List available elements |
//! | 0x0002 | [`request::GET`] | Read elements |
//! | 0x0003 | [`request::SET`] | Write elements |
//! | 0x0006 | [`request::ECHO`] | Liveness probe |
//! | 0x7000 | [`request::GET_DEVICE`] | Device identification |

pub mod commands;
pub mod framer;
pub mod store;
pub mod stride;
pub mod wire;

pub use commands::RequestChannel;
pub use framer::Framer;
pub use store::{ElementSlot, ElementStore, PropertyMap, RawProperty};
pub use wire::{AnswerHeader, ElementHeader, RequestHeader};

/// Protocol version written into configuration requests.
pub const PROTOCOL_VERSION: u16 = 0x0002;

/// Request codes.
pub mod request {
    pub const LISTING: u16 = 0x0001;
    pub const GET: u16 = 0x0002;
    pub const SET: u16 = 0x0003;
    pub const RESET: u16 = 0x0005;
    pub const ECHO: u16 = 0x0006;
    pub const UPDATE: u16 = 0x0007;
    pub const STATUS: u16 = 0x0008;
    pub const GET_DEVICE: u16 = 0x7000;
}

/// Answer codes carried in [`AnswerHeader::answer_code`](super::AnswerHeader).
pub mod answer {
    pub const OK: u16 = 0x0000;
    pub const ERROR: u16 = 0x0001;
    pub const FLASH_ERROR: u16 = 0x0002;
    pub const HARDWARE_FAILURE: u16 = 0x0003;
    pub const INVALID_DATA: u16 = 0x0004;
    pub const INVALID_REQUEST: u16 = 0x0005;
    pub const PROTOCOL_ERROR: u16 = 0x0006;
    pub const UNSUPPORTED_VERSION: u16 = 0x0007;
    pub const LIMITED_MODE: u16 = 0x0008;
    pub const OUTPUT_SIZE_TOO_LONG: u16 = 0x0009;
    pub const MISSING_ELEMENT: u16 = 0x000A;
    pub const NO_NEW_DATA: u16 = 0x000E;
    pub const MULTIPLE_ERRORS: u16 = 0xFFFE;
    pub const INVALID: u16 = 0xFFFF;

    /// Human-readable name of an answer code.
    pub fn name(code: u16) -> &'static str {
        match code {
            OK => "ok",
            ERROR => "error",
            FLASH_ERROR => "flash error",
            HARDWARE_FAILURE => "hardware failure",
            INVALID_DATA => "invalid data",
            INVALID_REQUEST => "invalid request",
            PROTOCOL_ERROR => "protocol error",
            UNSUPPORTED_VERSION => "unsupported version",
            LIMITED_MODE => "limited mode",
            OUTPUT_SIZE_TOO_LONG => "output size too long",
            MISSING_ELEMENT => "missing element",
            NO_NEW_DATA => "no new data",
            MULTIPLE_ERRORS => "multiple errors",
            INVALID => "invalid",
            _ => "unknown",
        }
    }
}

/// Element ids used by the built-in commands.
pub mod element {
    pub const ELEMENT_LIST: u16 = 0x0070;
    pub const DEVICE_TYPE: u16 = 0x00E0;
    pub const ECHO_STATE: u16 = 0x1002;
    pub const DATA_LEVEL: u16 = 0x106E;
}
