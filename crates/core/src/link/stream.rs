use crate::config::LinkConfig;
use crate::error::{ComError, ProtocolErrorKind, Result};
use crate::protocol::wire::{ANSWER_HEADER_LEN, AnswerHeader, REQUEST_HEADER_LEN, RequestHeader};
use crate::protocol::{ElementStore, Framer, RequestChannel};
use crate::transport::StreamTransport;

/// Request/answer endpoint over a [`StreamTransport`].
///
/// The framer's buffers are created with the link and reused for every
/// exchange. Every operation that touches the device fails with
/// [`NotConnected`](ComError::NotConnected) until [`connect`](Self::connect)
/// succeeds.
///
/// ```no_run
/// use std::time::Duration;
/// use sensorcom::protocol::{answer, request};
/// use sensorcom::{LinkConfig, StreamLink, TcpTransport};
///
/// let addr = "192.168.0.10:48630".parse().expect("valid address");
/// let transport = TcpTransport::new(addr, Duration::from_secs(2));
/// let mut link = StreamLink::new(transport, LinkConfig::default());
/// link.connect()?;
/// link.start_request(request::ECHO)?;
/// link.send_request()?;
/// link.read_answer()?;
/// assert_eq!(link.framer().answer_code(), answer::OK);
/// # Ok::<(), sensorcom::ComError>(())
/// ```
#[derive(Debug)]
pub struct StreamLink<T: StreamTransport> {
    transport: T,
    framer: Framer,
    config: LinkConfig,
    pending_request: u16,
}

impl<T: StreamTransport> StreamLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            framer: Framer::new(config.protocol_version, config.transfer_buffer_size)
                .with_max_frame_size(config.max_frame_size),
            transport,
            config,
            pending_request: 0,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn framer_mut(&mut self) -> &mut Framer {
        &mut self.framer
    }

    pub fn connect(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect()?;
        self.framer.clear_inbound();
        tracing::debug!("stream link connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.transport.is_connected() {
            self.transport.disconnect();
            tracing::debug!("stream link disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn verify_connection(&self) -> Result<()> {
        if !self.transport.is_connected() {
            return Err(ComError::NotConnected);
        }
        Ok(())
    }

    pub fn start_request(&mut self, code: u16) -> Result<()> {
        self.verify_connection()?;
        self.framer.start_request(code);
        self.pending_request = code;
        Ok(())
    }

    pub fn add_element(
        &mut self,
        id: u16,
        count: u16,
        unit_size: u32,
        data: &[u8],
        stride: usize,
    ) -> Result<()> {
        self.verify_connection()?;
        self.framer.add_element(id, count, unit_size, data, stride)
    }

    /// Write the message built so far.
    pub fn send_request(&mut self) -> Result<()> {
        self.verify_connection()?;
        let bytes = self.framer.message_bytes();
        tracing::debug!(
            request_code = self.framer.request_code(),
            size = bytes.len(),
            "request sent"
        );
        self.transport.write(bytes)
    }

    /// Read inbound bytes `[start, start + len)` in as many reads as needed.
    fn read_exact(&mut self, start: usize, len: usize) -> Result<()> {
        let timeout = self.config.response_timeout;
        let mut filled = 0;
        while filled < len {
            let region = self.framer.inbound_region(start + filled, len - filled)?;
            filled += self.transport.read(region, timeout)?;
        }
        Ok(())
    }

    /// Refuse a declared frame size above the configured maximum, dropping
    /// whatever of that frame is already buffered.
    fn check_frame_size(&mut self, declared: u32) -> Result<()> {
        let declared = declared as usize;
        if declared > self.framer.max_frame_size() {
            tracing::warn!(declared, max = self.framer.max_frame_size(), "frame too large");
            self.transport.discard_pending()?;
            return Err(ComError::Capacity { requested: declared });
        }
        Ok(())
    }

    /// Read the answer to the last request sent.
    ///
    /// An answer echoing another request code is a protocol error; any
    /// input still buffered is discarded so the next exchange starts clean.
    pub fn read_answer(&mut self) -> Result<()> {
        self.verify_connection()?;
        self.framer.clear_inbound();

        self.read_exact(0, ANSWER_HEADER_LEN)?;
        let header = AnswerHeader::decode(self.framer.inbound_region(0, ANSWER_HEADER_LEN)?)?;
        if header.request_code != self.pending_request {
            tracing::warn!(
                expected = self.pending_request,
                received = header.request_code,
                "answer for another request"
            );
            self.transport.discard_pending()?;
            return Err(ComError::protocol(ProtocolErrorKind::RequestCodeMismatch {
                expected: self.pending_request,
                received: header.request_code,
            }));
        }
        self.check_frame_size(header.answer_size)?;

        if header.payload_len() > 0 {
            self.read_exact(ANSWER_HEADER_LEN, header.payload_len())?;
        }
        self.framer.load_answer(header.answer_size as usize)?;
        tracing::debug!(
            request_code = header.request_code,
            answer_code = header.answer_code,
            size = header.answer_size,
            "answer received"
        );
        Ok(())
    }

    /// Read one request, as a device would.
    pub fn read_request(&mut self) -> Result<RequestHeader> {
        self.verify_connection()?;
        self.framer.clear_inbound();

        self.read_exact(0, REQUEST_HEADER_LEN)?;
        let header = RequestHeader::decode(self.framer.inbound_region(0, REQUEST_HEADER_LEN)?)?;
        self.check_frame_size(header.total_size)?;
        if header.payload_len() > 0 {
            self.read_exact(REQUEST_HEADER_LEN, header.payload_len())?;
        }
        self.framer.load_request(header.total_size as usize)
    }

    pub fn read_element(&mut self) -> Result<bool> {
        self.framer.read_element()
    }

    pub fn read_element_to_property(&mut self, store: &mut dyn ElementStore) -> Result<bool> {
        self.framer.read_element_to_property(store)
    }

    pub fn read_element_to_properties(&mut self, store: &mut dyn ElementStore) -> Result<()> {
        self.framer.read_element_to_properties(store)
    }

    pub fn push_element_data_to_buffer(
        &self,
        dest: &mut [u8],
        count: u16,
        size: u32,
        stride: usize,
    ) -> Result<()> {
        self.framer
            .push_element_data_to_buffer(dest, count, size, stride)
    }
}

impl<T: StreamTransport> RequestChannel for StreamLink<T> {
    fn start_request(&mut self, code: u16) -> Result<()> {
        StreamLink::start_request(self, code)
    }

    fn add_element(
        &mut self,
        id: u16,
        count: u16,
        unit_size: u32,
        data: &[u8],
        stride: usize,
    ) -> Result<()> {
        StreamLink::add_element(self, id, count, unit_size, data, stride)
    }

    fn send_request(&mut self) -> Result<()> {
        StreamLink::send_request(self)
    }

    fn read_answer(&mut self) -> Result<()> {
        StreamLink::read_answer(self)
    }

    fn framer(&mut self) -> &mut Framer {
        &mut self.framer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PropertyMap, answer, element, request};
    use crate::test_util::ScriptedStream;

    fn link() -> StreamLink<ScriptedStream> {
        let mut link = StreamLink::new(ScriptedStream::new(), LinkConfig::default());
        link.connect().unwrap();
        link
    }

    fn answer_bytes(request_code: u16, answer_code: u16, elements: &[(u16, u16, u32, &[u8])]) -> Vec<u8> {
        let mut f = Framer::new(2, 64);
        f.start_answer(request_code, answer_code);
        for (id, count, unit, data) in elements {
            f.add_element(*id, *count, *unit, data, *unit as usize).unwrap();
        }
        f.message_bytes().to_vec()
    }

    #[test]
    fn operations_require_connection() {
        let mut link = StreamLink::new(ScriptedStream::new(), LinkConfig::default());
        assert!(matches!(link.start_request(1), Err(ComError::NotConnected)));
        assert!(matches!(
            link.add_element(1, 1, 1, &[0], 1),
            Err(ComError::NotConnected)
        ));
        assert!(matches!(link.send_request(), Err(ComError::NotConnected)));
        assert!(matches!(link.read_answer(), Err(ComError::NotConnected)));
    }

    #[test]
    fn failed_connect_leaves_link_disconnected() {
        let mut t = ScriptedStream::new();
        t.refuse_connect = true;
        let mut link = StreamLink::new(t, LinkConfig::default());
        let err = link.connect().unwrap_err();
        assert!(err.is_disconnect());
        assert!(!link.is_connected());
    }

    #[test]
    fn request_is_written_whole() {
        let mut link = link();
        link.start_request(request::SET).unwrap();
        link.add_element(element::ECHO_STATE, 1, 1, &[0], 1).unwrap();
        link.send_request().unwrap();
        assert_eq!(
            link.transport().written,
            vec![2, 0, 3, 0, 17, 0, 0, 0, 0x02, 0x10, 1, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn answer_read_across_partial_reads() {
        let mut link = link();
        let bytes = answer_bytes(
            request::GET,
            answer::OK,
            &[(element::DEVICE_TYPE, 1, 2, &[0xE0, 0x00]), (0x0050, 2, 4, &[1, 0, 0, 0, 2, 0, 0, 0])],
        );
        for chunk in bytes.chunks(5) {
            link.transport_mut().queue(chunk);
        }

        link.start_request(request::GET).unwrap();
        link.send_request().unwrap();
        link.read_answer().unwrap();
        assert_eq!(link.framer().answer_code(), answer::OK);

        let mut store = PropertyMap::new();
        store.register(element::DEVICE_TYPE, 2).register(0x0050, 4);
        link.read_element_to_properties(&mut store).unwrap();
        assert_eq!(store.get(element::DEVICE_TYPE).unwrap().u16_at(0), Some(0xE0));
        assert_eq!(store.get(0x0050).unwrap().u32_at(1), Some(2));
    }

    #[test]
    fn mismatched_request_code_discards_input() {
        let mut link = link();
        link.transport_mut()
            .queue(&answer_bytes(request::SET, answer::OK, &[]));
        link.transport_mut().queue(&[0xAA; 7]);

        link.start_request(request::GET).unwrap();
        link.send_request().unwrap();
        let err = link.read_answer().unwrap_err();
        assert!(matches!(
            err,
            ComError::Protocol {
                kind: ProtocolErrorKind::RequestCodeMismatch {
                    expected: 2,
                    received: 3
                }
            }
        ));
        assert_eq!(link.transport().discarded, 7);
    }

    #[test]
    fn missing_answer_times_out() {
        let mut link = link();
        link.start_request(request::ECHO).unwrap();
        link.send_request().unwrap();
        assert!(matches!(link.read_answer(), Err(ComError::Timeout)));
    }

    #[test]
    fn oversized_answer_refused_before_payload() {
        let config = LinkConfig {
            transfer_buffer_size: 256,
            max_frame_size: 1024,
            ..LinkConfig::default()
        };
        let mut link = StreamLink::new(ScriptedStream::new(), config);
        link.connect().unwrap();
        link.start_request(request::GET).unwrap();
        link.send_request().unwrap();

        let mut header = [0u8; ANSWER_HEADER_LEN];
        AnswerHeader {
            protocol_version: 2,
            answer_code: answer::OK,
            answer_size: 0xFFFF_FFFF,
            request_code: request::GET,
        }
        .encode(&mut header);
        link.transport_mut().queue(&header);
        link.transport_mut().queue(&[0u8; 32]);

        assert!(matches!(
            link.read_answer(),
            Err(ComError::Capacity { requested: 0xFFFF_FFFF })
        ));
        assert_eq!(link.transport().discarded, 32);
        assert!(link.framer().buffer_size() <= 1024);
    }

    #[test]
    fn device_reads_request() {
        let mut link = link();
        let mut f = Framer::new(2, 64);
        f.start_request(request::SET);
        f.add_element(element::ECHO_STATE, 1, 1, &[1], 1).unwrap();
        link.transport_mut().queue(f.message_bytes());

        let header = link.read_request().unwrap();
        assert_eq!(header.request_code, request::SET);
        assert!(link.read_element().unwrap());
        let mut state = [0u8; 1];
        link.push_element_data_to_buffer(&mut state, 1, 1, 1).unwrap();
        assert_eq!(state, [1]);
        assert!(!link.read_element().unwrap());
    }
}
