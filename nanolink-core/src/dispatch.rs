//! Packet handlers
//!
//! The only place decoded payloads are interpreted. Each packet type has
//! one handler that mutates [`DeviceState`].

use nanolink_hal::storage::NvStorage;
use nanolink_protocol::{DisplayMode, Payload, StatusText, VALUES_COUNT};

use crate::calibration::CalibrationError;
use crate::state::DeviceState;

impl<S: NvStorage> DeviceState<S> {
    /// Apply one validated payload
    ///
    /// Every handler is idempotent for repeated delivery of the same frame,
    /// so a retransmission after a lost ack changes nothing further.
    pub fn apply(&mut self, payload: &Payload) -> Result<(), CalibrationError> {
        debug!("dispatch {}", payload.packet_type());

        match payload {
            Payload::Values(values) => {
                self.on_values(values);
                Ok(())
            }
            Payload::Status(text) => {
                self.on_status(text);
                Ok(())
            }
            Payload::Mode(mode) => {
                self.on_mode(*mode);
                Ok(())
            }
            Payload::Calibrate { channel } => {
                self.on_calibrate(*channel);
                Ok(())
            }
            Payload::StoreCalibration { channel } => self.calibration.store(*channel),
            Payload::ReadCalibration { channel } => {
                self.calibration.load(*channel)?;
                self.dirty = true;
                Ok(())
            }
            Payload::Signal(strength) => {
                self.signal = *strength;
                self.dirty = true;
                Ok(())
            }
        }
    }

    fn on_values(&mut self, values: &[u16; VALUES_COUNT]) {
        self.values = *values;
        self.calibration.observe_all(values);
        self.dirty = true;
    }

    fn on_status(&mut self, text: &StatusText) {
        self.status = text.clone();
        self.dirty = true;
    }

    fn on_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.dirty = true;
    }

    fn on_calibrate(&mut self, channel: u8) {
        self.calibration.start_calibration(channel);
        self.dirty = true;
    }
}
