//! Higher-level exchanges built from start/add/send/read primitives.

use crate::error::{ComError, Result};

use super::framer::Framer;
use super::{answer, element, request};

/// An endpoint that can carry one request and read back its answer.
///
/// Implemented by [`StreamLink`](crate::StreamLink); the helpers in this
/// module work against any implementation.
pub trait RequestChannel {
    fn start_request(&mut self, code: u16) -> Result<()>;

    fn add_element(
        &mut self,
        id: u16,
        count: u16,
        unit_size: u32,
        data: &[u8],
        stride: usize,
    ) -> Result<()>;

    fn send_request(&mut self) -> Result<()>;

    /// Read the next answer into the framer and position its element cursor.
    fn read_answer(&mut self) -> Result<()>;

    fn framer(&mut self) -> &mut Framer;
}

/// Send an element-less request and require an OK answer.
///
/// The answer is read up to `retries + 1` times, so firmware that needs time
/// to compute a result can answer late. Disconnections are never retried.
pub fn send_command<C: RequestChannel + ?Sized>(
    channel: &mut C,
    code: u16,
    retries: u32,
) -> Result<()> {
    channel.start_request(code)?;
    channel.send_request()?;

    let mut left = retries;
    loop {
        let outcome = channel.read_answer().and_then(|()| {
            let answer_code = channel.framer().answer_code();
            if answer_code != answer::OK {
                return Err(ComError::AnswerCode {
                    request_code: code,
                    answer_code,
                });
            }
            Ok(())
        });

        match outcome {
            Ok(()) => return Ok(()),
            Err(e) if e.is_disconnect() || left == 0 => return Err(e),
            Err(e) => {
                tracing::debug!(request_code = code, left, error = %e, "retrying answer read");
                left -= 1;
            }
        }
    }
}

/// Ask a configuration server for its device type.
///
/// Returns `None` when the device answered but did not report a usable
/// device-type element.
pub fn query_device_type<C: RequestChannel + ?Sized>(channel: &mut C) -> Result<Option<u16>> {
    channel.start_request(request::GET)?;
    let ids = element::DEVICE_TYPE.to_le_bytes();
    channel.add_element(element::ELEMENT_LIST, 1, 2, &ids, 2)?;
    channel.send_request()?;
    channel.read_answer()?;

    let framer = channel.framer();
    if !framer.read_element()? || framer.answer_code() != answer::OK {
        return Ok(None);
    }
    if framer.element_count() != Some(1) || framer.element_unit_size() != Some(2) {
        return Ok(None);
    }

    let device_type = framer
        .element_data()
        .and_then(|d| Some(u16::from_le_bytes([*d.first()?, *d.get(1)?])));
    if let Some(device_type) = device_type {
        tracing::info!(device_type = format_args!("{:#06X}", device_type), "device type");
    }
    Ok(device_type)
}

/// Enable or disable the periodic echo the device expects to stay connected.
pub fn set_echo_state<C: RequestChannel + ?Sized>(channel: &mut C, enabled: bool) -> Result<()> {
    channel.start_request(request::SET)?;
    channel.add_element(element::ECHO_STATE, 1, 1, &[enabled as u8], 1)?;
    channel.send_request()?;
    channel.read_answer()
}
