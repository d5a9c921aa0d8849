//! Protocol endpoints: a [`Framer`](crate::Framer) bound to a transport.
//!
//! - [`StreamLink`]: request/answer over a byte stream. Frames may span
//!   several reads, so the header is read first and the payload after it.
//! - [`DatagramLink`]: answers arriving over UDP, either one datagram per
//!   answer or reassembled from RTP fragments.

pub mod datagram;
pub mod stream;

pub use datagram::{DatagramFraming, DatagramLink};
pub use stream::StreamLink;
