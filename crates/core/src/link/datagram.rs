use std::net::SocketAddr;

use crate::config::LinkConfig;
use crate::error::{ComError, Result};
use crate::protocol::{ElementStore, Framer};
use crate::reassembler::Reassembler;
use crate::transport::DatagramTransport;

/// How answers are carried in datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramFraming {
    /// One datagram holds exactly one answer.
    Plain,
    /// Answers are split into RTP packets and reassembled.
    Rtp,
}

/// Answer endpoint over a [`DatagramTransport`].
///
/// Data servers push answers without being asked, so
/// [`read_answer`](Self::read_answer) reports whether a new frame is
/// available instead of failing when nothing arrived.
#[derive(Debug)]
pub struct DatagramLink<T: DatagramTransport> {
    transport: T,
    framer: Framer,
    config: LinkConfig,
    framing: DatagramFraming,
    reassembler: Reassembler,
    receive_buffer: Vec<u8>,
    connected: bool,
}

impl<T: DatagramTransport> DatagramLink<T> {
    pub fn new(transport: T, framing: DatagramFraming, config: LinkConfig) -> Self {
        Self {
            framer: Framer::new(config.protocol_version, config.transfer_buffer_size)
                .with_max_frame_size(config.max_frame_size),
            reassembler: Reassembler::new(config.rtp_payload_type),
            receive_buffer: vec![0; config.transfer_buffer_size],
            transport,
            config,
            framing,
            connected: false,
        }
    }

    pub fn framing(&self) -> DatagramFraming {
        self.framing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn framer_mut(&mut self) -> &mut Framer {
        &mut self.framer
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Open the socket and start from a clean reassembly state.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.transport
            .open(self.config.port, self.config.response_timeout)?;
        self.reassembler.reset();
        self.framer.clear_inbound();
        self.connected = true;
        tracing::debug!(port = self.transport.local_port(), framing = ?self.framing, "datagram link connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            self.transport.close();
            self.connected = false;
            tracing::debug!("datagram link disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn local_port(&self) -> Option<u16> {
        self.transport.local_port()
    }

    fn verify_connection(&self) -> Result<()> {
        if !self.connected {
            return Err(ComError::NotConnected);
        }
        Ok(())
    }

    pub fn start_request(&mut self, code: u16) -> Result<()> {
        self.verify_connection()?;
        self.framer.start_request(code);
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

    /// Send the message built so far to `addr` as one datagram.
    pub fn send_request_to(&mut self, addr: SocketAddr) -> Result<()> {
        self.verify_connection()?;
        let bytes = self.framer.message_bytes();
        self.transport.send_to(bytes, addr)?;
        tracing::debug!(%addr, size = bytes.len(), "request sent");
        Ok(())
    }

    /// Load the next answer into the framer.
    ///
    /// Returns `Ok(true)` when a frame was loaded and `Ok(false)` when none
    /// was available. With RTP framing, a gap seen while draining is
    /// reported as [`MissedFrame`](ComError::MissedFrame) after any frame
    /// completed in the same pass has been loaded, so its elements can
    /// still be read.
    pub fn read_answer(&mut self) -> Result<bool> {
        self.verify_connection()?;
        match self.framing {
            DatagramFraming::Plain => self.read_plain(),
            DatagramFraming::Rtp => self.read_rtp(),
        }
    }

    fn read_plain(&mut self) -> Result<bool> {
        self.framer.clear_inbound();
        let Some((len, from)) = self.transport.receive_from(&mut self.receive_buffer)? else {
            return Ok(false);
        };
        self.framer
            .inbound_region(0, len)?
            .copy_from_slice(&self.receive_buffer[..len]);
        let header = self.framer.load_answer(len)?;
        tracing::trace!(%from, request_code = header.request_code, size = len, "answer datagram");
        Ok(true)
    }

    fn read_rtp(&mut self) -> Result<bool> {
        let report = self.reassembler.drain(
            &self.transport,
            &mut self.receive_buffer,
            self.config.select_timeout,
            &mut self.framer,
        )?;
        if let Some(timestamp) = report.missed_frame {
            return Err(ComError::MissedFrame { timestamp });
        }
        Ok(report.frame_len.is_some())
    }

    pub fn read_element(&mut self) -> Result<bool> {
        self.framer.read_element()
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

impl<T: DatagramTransport> Drop for DatagramLink<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{answer, element, request};
    use crate::rtp::AnswerPacketizer;
    use crate::test_util::{ScriptedDatagram, peer};

    fn device_type_answer(device_type: u16) -> Vec<u8> {
        let mut f = Framer::new(2, 64);
        f.start_answer(request::GET, answer::OK);
        f.add_element(element::DEVICE_TYPE, 1, 2, &device_type.to_le_bytes(), 2)
            .unwrap();
        f.message_bytes().to_vec()
    }

    fn connected(framing: DatagramFraming, datagrams: Vec<Vec<u8>>) -> DatagramLink<ScriptedDatagram> {
        let mut link = DatagramLink::new(ScriptedDatagram::new(datagrams), framing, LinkConfig::default());
        link.connect().unwrap();
        link
    }

    fn read_device_type<T: DatagramTransport>(link: &mut DatagramLink<T>) -> u16 {
        assert!(link.read_element().unwrap());
        let mut out = [0u8; 2];
        link.push_element_data_to_buffer(&mut out, 1, 2, 2).unwrap();
        u16::from_le_bytes(out)
    }

    #[test]
    fn plain_datagram_is_one_answer() {
        let mut link = connected(DatagramFraming::Plain, vec![device_type_answer(0x12)]);
        assert!(link.read_answer().unwrap());
        assert_eq!(read_device_type(&mut link), 0x12);
        assert!(!link.read_answer().unwrap());
    }

    #[test]
    fn rtp_frames_are_reassembled() {
        let mut sensor = AnswerPacketizer::new(0x40, 7).with_mtu(8);
        let mut datagrams = sensor.packetize(&[0], 1);
        datagrams.extend(sensor.packetize(&device_type_answer(0x34), 1));

        let mut link = connected(DatagramFraming::Rtp, datagrams);
        assert!(link.read_answer().unwrap());
        assert_eq!(link.framer().request_code(), request::GET);
        assert_eq!(read_device_type(&mut link), 0x34);
        assert!(!link.read_answer().unwrap());
    }

    #[test]
    fn completed_frame_survives_missed_frame_error() {
        let mut sensor = AnswerPacketizer::new(0x40, 7).with_mtu(8);
        let mut datagrams = sensor.packetize(&[0], 1);
        datagrams.extend(sensor.packetize(&device_type_answer(0x55), 1));

        // Next frame loses its second fragment.
        let mut broken = sensor.packetize(&device_type_answer(0x66), 1);
        broken.remove(1);
        datagrams.extend(broken);

        let mut link = connected(DatagramFraming::Rtp, datagrams);
        assert!(link.read_answer().unwrap());
        assert_eq!(read_device_type(&mut link), 0x55);

        let err = link.read_answer().unwrap_err();
        assert!(matches!(err, ComError::MissedFrame { timestamp: 2 }));
        // The broken frame's marker re-arms reassembly for the next frame.
        assert!(link.reassembler().is_frame_valid());
        assert_eq!(link.reassembler().pending_len(), 0);
    }

    #[test]
    fn requests_need_connection() {
        let mut link = DatagramLink::new(ScriptedDatagram::default(), DatagramFraming::Plain, LinkConfig::default());
        assert!(matches!(link.read_answer(), Err(ComError::NotConnected)));
        assert!(matches!(link.start_request(request::GET), Err(ComError::NotConnected)));

        link.connect().unwrap();
        link.start_request(request::GET).unwrap();
        link.send_request_to(peer()).unwrap();
        assert_eq!(link.transport().sent()[0].len(), 8);
    }

    #[test]
    fn disconnect_closes_socket() {
        let mut link = connected(DatagramFraming::Rtp, vec![]);
        assert!(link.transport().is_open());
        link.disconnect();
        assert!(!link.transport().is_open());
        assert!(!link.is_connected());
    }
}
