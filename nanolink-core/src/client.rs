//! Logger-side link facade
//!
//! One method per packet type on top of [`FrameWriter`]. The facade also
//! remembers which render mode the display was last confirmed to be in;
//! that view changes only when a MODE frame is acknowledged.

use embedded_hal::delay::DelayNs;
use nanolink_hal::uart::{Uart, UartTx};
use nanolink_protocol::{
    Delivery, DisplayMode, FrameWriter, LinkConfig, Payload, SendError, StatusText, NO_CHANNEL,
    VALUES_COUNT,
};

type SendResult<T> = Result<Delivery, SendError<<T as UartTx>::Error>>;

/// Sending end of the link
pub struct LoggerLink<T, D> {
    writer: FrameWriter<T, D>,
    peer_mode: Option<DisplayMode>,
}

impl<T, D> LoggerLink<T, D>
where
    T: Uart,
    D: DelayNs,
{
    pub fn new(port: T, delay: D, config: LinkConfig) -> Self {
        Self {
            writer: FrameWriter::new(port, delay, config),
            peer_mode: None,
        }
    }

    /// Mode the display last acknowledged, `None` until the first success
    pub fn peer_mode(&self) -> Option<DisplayMode> {
        self.peer_mode
    }

    /// One reading per channel
    pub fn send_values(&mut self, values: &[u16; VALUES_COUNT]) -> SendResult<T> {
        self.writer.send_payload(&Payload::Values(*values))
    }

    /// Status line, truncated to the field width
    pub fn send_status(&mut self, text: &str) -> SendResult<T> {
        self.writer
            .send_payload(&Payload::Status(StatusText::new(text)))
    }

    /// Switch the display's render mode
    ///
    /// On failure the previously confirmed mode is kept.
    pub fn send_mode(&mut self, mode: DisplayMode) -> SendResult<T> {
        let result = self.writer.send_payload(&Payload::Mode(mode));
        match &result {
            Ok(delivery) if delivery.confirmed => self.peer_mode = Some(mode),
            Ok(_) => {}
            Err(_) => warn!("mode change to {} not confirmed", mode),
        }
        result
    }

    /// Start auto-ranging on `channel`
    pub fn send_calibrate(&mut self, channel: u8) -> SendResult<T> {
        self.writer.send_payload(&Payload::Calibrate { channel })
    }

    /// Stop auto-ranging
    pub fn send_stop_calibration(&mut self) -> SendResult<T> {
        self.send_calibrate(NO_CHANNEL)
    }

    /// Persist a channel's bounds on the display
    pub fn send_store_calibration(&mut self, channel: u8) -> SendResult<T> {
        self.writer
            .send_payload(&Payload::StoreCalibration { channel })
    }

    /// Reload a channel's bounds from the display's storage
    pub fn send_read_calibration(&mut self, channel: u8) -> SendResult<T> {
        self.writer
            .send_payload(&Payload::ReadCalibration { channel })
    }

    /// Signal strength, never confirmed
    pub fn send_signal(&mut self, strength: u8) -> SendResult<T> {
        self.writer.send_payload(&Payload::Signal(strength))
    }

    /// Underlying frame writer
    pub fn writer(&self) -> &FrameWriter<T, D> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut FrameWriter<T, D> {
        &mut self.writer
    }

    pub fn into_inner(self) -> (T, D) {
        self.writer.into_inner()
    }
}
