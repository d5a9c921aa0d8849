use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{ComError, ProtocolErrorKind, Result};

use super::store::ElementStore;
use super::stride;
use super::wire::{
    ANSWER_HEADER_LEN, AnswerHeader, ELEMENT_HEADER_LEN, ElementHeader, REQUEST_HEADER_LEN,
    REQUEST_TOTAL_SIZE_OFFSET, RequestHeader, get_u32, put_u32,
};

/// Location of the last element returned by [`Framer::read_element`].
#[derive(Debug, Clone, Copy)]
struct CurrentElement {
    header: ElementHeader,
    value_offset: usize,
}

/// Builds outbound requests and decodes inbound answers/requests.
///
/// A framer owns two transfer buffers that are created once per connection
/// and reused for every exchange. They grow on demand and never shrink.
///
/// ## Outbound
///
/// [`start_request`](Self::start_request) writes a request header whose
/// total-size field is patched by every [`add_element`](Self::add_element),
/// so [`message_bytes`](Self::message_bytes) is a complete, sendable request
/// after each call.
///
/// ## Inbound
///
/// Transports fill [`inbound_region`](Self::inbound_region), then
/// [`load_answer`](Self::load_answer) or [`load_request`](Self::load_request)
/// position an element cursor after the header. [`read_element`](Self::read_element)
/// walks the elements; remaining-byte bookkeeping is checked on every step.
#[derive(Debug)]
pub struct Framer {
    protocol_version: u16,
    max_frame_size: usize,

    outbound: Vec<u8>,
    message_size: usize,
    total_size_offset: usize,

    inbound: Vec<u8>,
    inbound_len: usize,
    cursor: usize,
    remaining: usize,
    current: Option<CurrentElement>,

    request_code: u16,
    answer_code: u16,
}

impl Framer {
    pub fn new(protocol_version: u16, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(ANSWER_HEADER_LEN);
        Self {
            protocol_version,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            outbound: vec![0; buffer_size],
            message_size: 0,
            total_size_offset: REQUEST_TOTAL_SIZE_OFFSET,
            inbound: vec![0; buffer_size],
            inbound_len: 0,
            cursor: 0,
            remaining: 0,
            current: None,
            request_code: 0,
            answer_code: 0,
        }
    }

    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    /// Request code of the request being built, or of the last decoded frame.
    pub fn request_code(&self) -> u16 {
        self.request_code
    }

    /// Answer code of the last decoded answer.
    pub fn answer_code(&self) -> u16 {
        self.answer_code
    }

    /// Size in bytes of the request built so far.
    pub fn message_size(&self) -> usize {
        self.message_size
    }

    /// Bytes still unread after the element cursor.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Current capacity of each transfer buffer.
    pub fn buffer_size(&self) -> usize {
        self.outbound.len()
    }

    /// Cap both transfer buffers at `max_frame_size` bytes.
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Reset the builder and write a fresh request header for `code`.
    pub fn start_request(&mut self, code: u16) {
        RequestHeader {
            protocol_version: self.protocol_version,
            request_code: code,
            total_size: REQUEST_HEADER_LEN as u32,
        }
        .encode(&mut self.outbound[..REQUEST_HEADER_LEN]);

        self.total_size_offset = REQUEST_TOTAL_SIZE_OFFSET;
        self.message_size = REQUEST_HEADER_LEN;
        self.request_code = code;
        tracing::trace!(request_code = code, "request started");
    }

    /// Reset the builder and write an answer header, as a device does.
    ///
    /// Elements added afterwards grow the answer size field the same way
    /// they grow a request's total size.
    pub fn start_answer(&mut self, request_code: u16, answer_code: u16) {
        AnswerHeader {
            protocol_version: self.protocol_version,
            answer_code,
            answer_size: ANSWER_HEADER_LEN as u32,
            request_code,
        }
        .encode(&mut self.outbound[..ANSWER_HEADER_LEN]);

        self.total_size_offset = REQUEST_TOTAL_SIZE_OFFSET;
        self.message_size = ANSWER_HEADER_LEN;
        self.request_code = request_code;
        self.answer_code = answer_code;
    }

    /// Append one element to the message being built.
    ///
    /// `data` holds `count` values of `unit_size` bytes, each starting
    /// `stride` bytes after the previous one. Values are packed on the wire.
    /// A request or answer must have been started first.
    pub fn add_element(
        &mut self,
        id: u16,
        count: u16,
        unit_size: u32,
        data: &[u8],
        stride: usize,
    ) -> Result<()> {
        if self.message_size == 0 {
            return Err(ComError::protocol(ProtocolErrorKind::NoMessageStarted));
        }
        let unit = unit_size as usize;
        let payload = count as usize * unit;
        let added = ELEMENT_HEADER_LEN + payload;
        let end = self.message_size + added;
        let new_total = u32::try_from(end)
            .map_err(|_| ComError::Capacity { requested: end })?;

        if stride::strided_len(count as usize, unit, stride) > data.len() {
            return Err(ComError::protocol(ProtocolErrorKind::SourceTooShort {
                needed: stride::strided_len(count as usize, unit, stride),
                available: data.len(),
            }));
        }

        if end > self.outbound.len() {
            grow(&mut self.outbound, end, self.max_frame_size)?;
            tracing::debug!(size = self.outbound.len(), "request buffer grown");
        }

        let at = self.message_size;
        ElementHeader {
            id,
            count,
            unit_size,
        }
        .encode(&mut self.outbound[at..at + ELEMENT_HEADER_LEN]);
        let value_at = at + ELEMENT_HEADER_LEN;
        stride::gather(
            &mut self.outbound[value_at..value_at + payload],
            data,
            count as usize,
            unit,
            stride,
        )?;

        self.message_size = end;
        put_u32(&mut self.outbound, self.total_size_offset, new_total);
        tracing::trace!(id, count, unit_size, total = end, "element added");
        Ok(())
    }

    /// The complete message built so far.
    pub fn message_bytes(&self) -> &[u8] {
        &self.outbound[..self.message_size]
    }

    /// Size as currently recorded in the outbound header.
    pub fn recorded_total_size(&self) -> u32 {
        get_u32(&self.outbound, self.total_size_offset)
    }

    /// Writable inbound bytes `[start, start + len)`, growing the buffer if needed.
    pub fn inbound_region(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        let end = start + len;
        if end > self.inbound.len() {
            grow(&mut self.inbound, end, self.max_frame_size)?;
            tracing::debug!(size = self.inbound.len(), "answer buffer grown");
        }
        Ok(&mut self.inbound[start..end])
    }

    /// Inbound bytes that belong to the frame loaded last.
    pub fn inbound(&self) -> &[u8] {
        &self.inbound[..self.inbound_len]
    }

    /// Decode the answer header at the start of the inbound buffer.
    ///
    /// `received` is how many inbound bytes hold valid frame data; the
    /// declared answer size must fit within it.
    pub fn load_answer(&mut self, received: usize) -> Result<AnswerHeader> {
        self.clear_cursor();
        let header = AnswerHeader::decode(&self.inbound[..received.min(self.inbound.len())])?;
        let size = header.answer_size as usize;
        if size > received {
            return Err(ComError::protocol(ProtocolErrorKind::FrameOverrun {
                declared: size,
                available: received,
            }));
        }

        self.request_code = header.request_code;
        self.answer_code = header.answer_code;
        self.inbound_len = size;
        self.cursor = ANSWER_HEADER_LEN;
        self.remaining = header.payload_len();
        Ok(header)
    }

    /// Decode the request header at the start of the inbound buffer.
    pub fn load_request(&mut self, received: usize) -> Result<RequestHeader> {
        self.clear_cursor();
        let header = RequestHeader::decode(&self.inbound[..received.min(self.inbound.len())])?;
        let size = header.total_size as usize;
        if size > received {
            return Err(ComError::protocol(ProtocolErrorKind::FrameOverrun {
                declared: size,
                available: received,
            }));
        }

        self.request_code = header.request_code;
        self.answer_code = 0;
        self.inbound_len = size;
        self.cursor = REQUEST_HEADER_LEN;
        self.remaining = header.payload_len();
        Ok(header)
    }

    /// Forget the loaded frame, e.g. after a protocol error.
    pub fn clear_inbound(&mut self) {
        self.clear_cursor();
        self.request_code = 0;
        self.answer_code = 0;
    }

    fn clear_cursor(&mut self) {
        self.inbound_len = 0;
        self.cursor = 0;
        self.remaining = 0;
        self.current = None;
    }

    /// Advance to the next element. Returns `false` once no bytes remain.
    pub fn read_element(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            self.current = None;
            return Ok(false);
        }

        if self.remaining < ELEMENT_HEADER_LEN {
            let remaining = self.remaining;
            self.remaining = 0;
            self.current = None;
            return Err(ComError::protocol(ProtocolErrorKind::ElementOverrun {
                declared: ELEMENT_HEADER_LEN,
                remaining,
            }));
        }

        let at = self.cursor;
        let header = ElementHeader::decode(&self.inbound[at..self.inbound_len])?;
        let consumed = ELEMENT_HEADER_LEN + header.payload_len();
        let Some(remaining) = self.remaining.checked_sub(consumed) else {
            let remaining = self.remaining;
            self.remaining = 0;
            self.current = None;
            return Err(ComError::protocol(ProtocolErrorKind::ElementOverrun {
                declared: consumed,
                remaining,
            }));
        };

        self.current = Some(CurrentElement {
            header,
            value_offset: at + ELEMENT_HEADER_LEN,
        });
        self.cursor += consumed;
        self.remaining = remaining;
        Ok(true)
    }

    fn current(&self) -> Result<&CurrentElement> {
        self.current
            .as_ref()
            .ok_or(ComError::protocol(ProtocolErrorKind::NoCurrentElement))
    }

    pub fn element_id(&self) -> Option<u16> {
        self.current.map(|e| e.header.id)
    }

    pub fn element_count(&self) -> Option<u16> {
        self.current.map(|e| e.header.count)
    }

    pub fn element_unit_size(&self) -> Option<u32> {
        self.current.map(|e| e.header.unit_size)
    }

    /// Packed payload of the last element read.
    pub fn element_data(&self) -> Option<&[u8]> {
        self.current.map(|e| {
            let end = e.value_offset + e.header.payload_len();
            &self.inbound[e.value_offset..end]
        })
    }

    /// Copy the last element read into caller storage.
    ///
    /// `count` must equal the element count and `size` must be able to hold
    /// one element value. Values land `stride` bytes apart in `dest`.
    pub fn push_element_data_to_buffer(
        &self,
        dest: &mut [u8],
        count: u16,
        size: u32,
        stride: usize,
    ) -> Result<()> {
        let element = self.current()?;
        if count != element.header.count {
            return Err(ComError::protocol(ProtocolErrorKind::CountMismatch {
                expected: element.header.count,
                received: count,
            }));
        }
        if size < element.header.unit_size {
            return Err(ComError::protocol(ProtocolErrorKind::UnitSizeTooSmall {
                element: element.header.unit_size,
                requested: size,
            }));
        }

        let end = element.value_offset + element.header.payload_len();
        stride::scatter(
            dest,
            &self.inbound[element.value_offset..end],
            count as usize,
            element.header.unit_size as usize,
            stride,
        )
    }

    /// Read one element and store it into the slot registered for its id.
    ///
    /// Unknown ids are skipped. Returns `false` once no element remains.
    pub fn read_element_to_property(&mut self, store: &mut dyn ElementStore) -> Result<bool> {
        if !self.read_element()? {
            return Ok(false);
        }
        let element = *self.current()?;
        let header = element.header;

        let Some(slot) = store.find_slot(header.id) else {
            tracing::debug!(id = header.id, "no property for element, skipped");
            return Ok(true);
        };

        let unit = header.unit_size as usize;
        let slot_stride = slot.stride();
        if slot_stride < unit {
            return Err(ComError::protocol(ProtocolErrorKind::UnitSizeTooSmall {
                element: header.unit_size,
                requested: slot_stride as u32,
            }));
        }

        let end = element.value_offset + header.payload_len();
        let storage = slot.resize(header.count as usize);
        stride::scatter(
            storage,
            &self.inbound[element.value_offset..end],
            header.count as usize,
            unit,
            slot_stride,
        )?;
        Ok(true)
    }

    /// Store every remaining element of the loaded frame.
    pub fn read_element_to_properties(&mut self, store: &mut dyn ElementStore) -> Result<()> {
        while self.read_element_to_property(store)? {}
        Ok(())
    }
}

/// Grow `buf` geometrically so it holds at least `needed` bytes.
fn grow(buf: &mut Vec<u8>, needed: usize, max: usize) -> Result<()> {
    if needed > max {
        return Err(ComError::Capacity { requested: needed });
    }
    let target = needed.max(buf.len().saturating_mul(2)).min(max);
    buf.try_reserve_exact(target - buf.len())
        .map_err(|_| ComError::Capacity { requested: target })?;
    buf.resize(target, 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::store::PropertyMap;

    fn framer() -> Framer {
        Framer::new(2, 64)
    }

    /// Move the request built by `framer` into its own inbound buffer.
    fn loop_back(framer: &mut Framer) -> RequestHeader {
        let bytes = framer.message_bytes().to_vec();
        framer
            .inbound_region(0, bytes.len())
            .unwrap()
            .copy_from_slice(&bytes);
        framer.load_request(bytes.len()).unwrap()
    }

    /// Put an answer for `request_code` carrying the given elements in the inbound buffer.
    fn load_answer_with(framer: &mut Framer, request_code: u16, elements: &[(u16, u16, u32, &[u8])]) {
        let mut body = Vec::new();
        for (id, count, unit, data) in elements {
            let mut h = [0u8; ELEMENT_HEADER_LEN];
            ElementHeader {
                id: *id,
                count: *count,
                unit_size: *unit,
            }
            .encode(&mut h);
            body.extend_from_slice(&h);
            body.extend_from_slice(data);
        }
        let mut frame = vec![0u8; ANSWER_HEADER_LEN];
        AnswerHeader {
            protocol_version: 2,
            answer_code: 0,
            answer_size: (ANSWER_HEADER_LEN + body.len()) as u32,
            request_code,
        }
        .encode(&mut frame);
        frame.extend_from_slice(&body);
        framer
            .inbound_region(0, frame.len())
            .unwrap()
            .copy_from_slice(&frame);
        framer.load_answer(frame.len()).unwrap();
    }

    #[test]
    fn start_request_writes_header() {
        let mut f = framer();
        f.start_request(0x0002);
        assert_eq!(f.message_size(), REQUEST_HEADER_LEN);
        assert_eq!(f.message_bytes(), &[2, 0, 2, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn total_size_patched_after_every_element() {
        let mut f = framer();
        f.start_request(3);
        f.add_element(0x10, 1, 4, &7u32.to_le_bytes(), 4).unwrap();
        assert_eq!(f.recorded_total_size(), 8 + 8 + 4);
        f.add_element(0x11, 3, 2, &[1, 0, 2, 0, 3, 0], 2).unwrap();
        assert_eq!(f.recorded_total_size(), 8 + 8 + 4 + 8 + 6);
        assert_eq!(f.recorded_total_size() as usize, f.message_size());
    }

    #[test]
    fn elements_round_trip_in_order() {
        let mut f = framer();
        let elements: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (0x0070, 2, 2, vec![0xE0, 0x00, 0x01, 0x00]),
            (0x1002, 1, 1, vec![1]),
            (0x2000, 0, 4, vec![]),
            (0x3000, 2, 3, vec![1, 2, 3, 4, 5, 6]),
            (0x106E, 1, 8, 0x0123_4567_89AB_CDEFu64.to_le_bytes().to_vec()),
        ];
        f.start_request(0x0002);
        for (id, count, unit, data) in &elements {
            f.add_element(*id, *count, *unit, data, *unit as usize).unwrap();
        }

        let header = loop_back(&mut f);
        assert_eq!(header.request_code, 0x0002);

        let mut decoded = Vec::new();
        while f.read_element().unwrap() {
            decoded.push((
                f.element_id().unwrap(),
                f.element_count().unwrap(),
                f.element_unit_size().unwrap(),
                f.element_data().unwrap().to_vec(),
            ));
        }
        assert_eq!(decoded, elements);
        assert_eq!(f.remaining(), 0);
    }

    #[test]
    fn buffer_grows_and_keeps_total_size() {
        let mut f = Framer::new(2, 16);
        f.start_request(9);
        let big = vec![0x5Au8; 1000];
        f.add_element(1, 1000, 1, &big, 1).unwrap();
        assert!(f.buffer_size() >= 8 + 8 + 1000);
        assert_eq!(f.recorded_total_size(), 1016);
        f.add_element(2, 1, 4, &[1, 2, 3, 4], 4).unwrap();
        assert_eq!(f.recorded_total_size(), 1028);
        assert_eq!(&f.message_bytes()[..8], &[2, 0, 9, 0, 0x04, 0x04, 0, 0]);
    }

    #[test]
    fn element_without_started_message_is_refused() {
        let mut f = framer();
        assert!(matches!(
            f.add_element(1, 1, 1, &[0], 1),
            Err(ComError::Protocol {
                kind: ProtocolErrorKind::NoMessageStarted
            })
        ));
        assert!(f.message_bytes().is_empty());

        f.start_request(3);
        f.add_element(1, 1, 1, &[0], 1).unwrap();
        assert_eq!(f.recorded_total_size(), 17);
    }

    #[test]
    fn growth_stops_at_max_frame_size() {
        let mut f = Framer::new(2, 16).with_max_frame_size(64);
        assert!(matches!(
            f.inbound_region(0, 0xFFFF_FFFF),
            Err(ComError::Capacity { requested: 0xFFFF_FFFF })
        ));
        assert_eq!(f.inbound_region(0, 40).unwrap().len(), 40);
        assert!(f.inbound_region(0, 64).is_ok());

        f.start_request(1);
        assert!(matches!(
            f.add_element(1, 100, 1, &[0; 100], 1),
            Err(ComError::Capacity { requested: 116 })
        ));
        assert_eq!(f.recorded_total_size(), 8);
        assert!(f.buffer_size() <= 64);
    }

    #[test]
    fn strided_add_then_push_restores_array() {
        for unit in [1u32, 2, 4, 8] {
            let stride = unit as usize + 3;
            let count = 5u16;
            let mut records = vec![0u8; count as usize * stride];
            for i in 0..count as usize {
                for b in 0..unit as usize {
                    records[i * stride + b] = (i * 16 + b + 1) as u8;
                }
            }

            let mut f = framer();
            f.start_request(1);
            f.add_element(0x42, count, unit, &records, stride).unwrap();
            loop_back(&mut f);
            assert!(f.read_element().unwrap());

            let mut out = vec![0u8; records.len()];
            f.push_element_data_to_buffer(&mut out, count, unit, stride)
                .unwrap();
            assert_eq!(out, records, "unit {unit}");
        }
    }

    #[test]
    fn push_requires_exact_count() {
        let mut f = framer();
        load_answer_with(&mut f, 2, &[(1, 2, 2, &[1, 0, 2, 0])]);
        assert!(f.read_element().unwrap());
        let mut out = [0u8; 8];
        let err = f.push_element_data_to_buffer(&mut out, 3, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            ComError::Protocol {
                kind: ProtocolErrorKind::CountMismatch {
                    expected: 2,
                    received: 3
                }
            }
        ));
        let err = f.push_element_data_to_buffer(&mut out, 2, 1, 2).unwrap_err();
        assert!(matches!(
            err,
            ComError::Protocol {
                kind: ProtocolErrorKind::UnitSizeTooSmall { .. }
            }
        ));
    }

    #[test]
    fn push_widens_into_larger_units() {
        let mut f = framer();
        load_answer_with(&mut f, 2, &[(1, 2, 2, &[0x34, 0x12, 0x78, 0x56])]);
        assert!(f.read_element().unwrap());
        let mut out = [0u8; 8];
        f.push_element_data_to_buffer(&mut out, 2, 4, 4).unwrap();
        assert_eq!(u32::from_le_bytes(out[..4].try_into().unwrap()), 0x1234);
        assert_eq!(u32::from_le_bytes(out[4..].try_into().unwrap()), 0x5678);
    }

    #[test]
    fn push_without_element_fails() {
        let f = framer();
        let mut out = [0u8; 4];
        assert!(f.push_element_data_to_buffer(&mut out, 1, 4, 4).is_err());
    }

    #[test]
    fn overrunning_element_is_protocol_error() {
        let mut f = framer();
        let mut frame = vec![0u8; ANSWER_HEADER_LEN + ELEMENT_HEADER_LEN + 2];
        AnswerHeader {
            protocol_version: 2,
            answer_code: 0,
            answer_size: frame.len() as u32,
            request_code: 2,
        }
        .encode(&mut frame);
        // Declares 4 values of 4 bytes but only 2 payload bytes follow.
        ElementHeader {
            id: 1,
            count: 4,
            unit_size: 4,
        }
        .encode(&mut frame[ANSWER_HEADER_LEN..]);
        f.inbound_region(0, frame.len())
            .unwrap()
            .copy_from_slice(&frame);
        f.load_answer(frame.len()).unwrap();

        let err = f.read_element().unwrap_err();
        assert!(matches!(
            err,
            ComError::Protocol {
                kind: ProtocolErrorKind::ElementOverrun {
                    declared: 24,
                    remaining: 10
                }
            }
        ));
        assert_eq!(f.remaining(), 0);
        assert!(!f.read_element().unwrap());
    }

    #[test]
    fn answer_larger_than_received_rejected() {
        let mut f = framer();
        let mut frame = vec![0u8; ANSWER_HEADER_LEN];
        AnswerHeader {
            protocol_version: 2,
            answer_code: 0,
            answer_size: 40,
            request_code: 2,
        }
        .encode(&mut frame);
        f.inbound_region(0, 16).unwrap().copy_from_slice(&frame);
        assert!(f.load_answer(16).is_err());
    }

    #[test]
    fn read_to_properties_skips_unknown_ids() {
        let mut f = framer();
        load_answer_with(
            &mut f,
            2,
            &[
                (0x00E0, 1, 2, &[0x34, 0x12]),
                (0x0BAD, 1, 1, &[9]),
                (0x0050, 2, 2, &[1, 0, 2, 0]),
            ],
        );

        let mut store = PropertyMap::new();
        store.register(0x00E0, 2).register(0x0050, 4);
        f.read_element_to_properties(&mut store).unwrap();

        assert_eq!(store.get(0x00E0).unwrap().u16_at(0), Some(0x1234));
        let widened = store.get(0x0050).unwrap();
        assert_eq!(widened.count(), 2);
        assert_eq!(widened.u32_at(0), Some(1));
        assert_eq!(widened.u32_at(1), Some(2));
        assert!(store.get(0x0BAD).is_none());
    }

    #[test]
    fn property_with_narrow_stride_rejected() {
        let mut f = framer();
        load_answer_with(&mut f, 2, &[(0x10, 1, 4, &[1, 2, 3, 4])]);
        let mut store = PropertyMap::new();
        store.register(0x10, 2);
        assert!(f.read_element_to_property(&mut store).is_err());
    }

    #[test]
    fn answer_builder_loads_as_answer() {
        let mut f = framer();
        f.start_answer(0x0002, 0);
        f.add_element(0x00E0, 1, 2, &[0x34, 0x12], 2).unwrap();
        let bytes = f.message_bytes().to_vec();
        assert_eq!(bytes.len(), 16 + 8 + 2);

        f.inbound_region(0, bytes.len())
            .unwrap()
            .copy_from_slice(&bytes);
        let header = f.load_answer(bytes.len()).unwrap();
        assert_eq!(header.answer_size as usize, bytes.len());
        assert!(f.read_element().unwrap());
        assert_eq!(f.element_data(), Some(&[0x34, 0x12][..]));
    }

    #[test]
    fn source_shorter_than_declared_rejected() {
        let mut f = framer();
        f.start_request(1);
        assert!(f.add_element(1, 4, 4, &[0u8; 12], 4).is_err());
        assert_eq!(f.message_size(), REQUEST_HEADER_LEN);
        assert_eq!(f.recorded_total_size(), REQUEST_HEADER_LEN as u32);
    }
}
