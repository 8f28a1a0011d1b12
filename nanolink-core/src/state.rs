//! Display-side device state
//!
//! Everything a received frame can change lives in one owned struct that
//! the receive loop passes to the handlers by reference.

use nanolink_hal::storage::NvStorage;
use nanolink_protocol::{DisplayMode, StatusText, VALUES_COUNT};

use crate::calibration::{CalibrationError, CalibrationStore};

/// Status shown before the logger has sent any
pub const INITIAL_STATUS: &str = "IDLE";

/// Render state plus calibration
pub struct DeviceState<S> {
    pub(crate) mode: DisplayMode,
    pub(crate) status: StatusText,
    pub(crate) values: [u16; VALUES_COUNT],
    pub(crate) signal: u8,
    pub(crate) calibration: CalibrationStore<S>,
    pub(crate) dirty: bool,
}

impl<S: NvStorage> DeviceState<S> {
    /// Fresh state around an already booted calibration store
    pub fn new(calibration: CalibrationStore<S>) -> Self {
        Self {
            mode: DisplayMode::default(),
            status: StatusText::new(INITIAL_STATUS),
            values: [0; VALUES_COUNT],
            signal: 0,
            calibration,
            // First render draws the initial status
            dirty: true,
        }
    }

    /// Boot calibration from storage and build the initial state
    pub fn boot(storage: S) -> Result<Self, CalibrationError> {
        Ok(Self::new(CalibrationStore::boot(storage)?))
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn status(&self) -> &StatusText {
        &self.status
    }

    /// Latest raw reading per channel
    pub fn values(&self) -> &[u16; VALUES_COUNT] {
        &self.values
    }

    pub fn signal(&self) -> u8 {
        self.signal
    }

    /// Calibration bounds, read-only
    ///
    /// Bounds change only through received calibration commands.
    pub fn calibration(&self) -> &CalibrationStore<S> {
        &self.calibration
    }

    /// Bar height for a channel's latest reading
    pub fn scaled(&self, channel: u8) -> u16 {
        self.values
            .get(usize::from(channel))
            .map(|&value| self.calibration.scale(channel, value))
            .unwrap_or(0)
    }

    /// True if anything visible changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }

    /// Release the storage
    pub fn into_storage(self) -> S {
        self.calibration.into_storage()
    }
}
