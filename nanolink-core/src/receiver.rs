//! Display-side receive loop
//!
//! [`DisplayLink::poll`] is called from the main loop between render
//! passes. It feeds pending bytes into the frame reader until a frame
//! completes or the input drains, dispatches complete frames to the
//! device state and answers with a single ack byte for every packet type
//! the link configuration confirms.
//!
//! A frame that stalls part way through is given `drain_timeout_us` to
//! finish. After that it is dropped, `0xEE` is sent if its type expects
//! a reply, and the reader resynchronizes.

use embedded_hal::delay::DelayNs;
use nanolink_hal::storage::NvStorage;
use nanolink_hal::uart::{Uart, UartTx};
use nanolink_protocol::{
    AckCode, Frame, FrameError, FrameReader, LinkConfig, PacketType, ReaderStats,
};

use crate::calibration::CalibrationError;
use crate::state::DeviceState;

/// Outcome of one [`DisplayLink::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Poll {
    /// No frame in progress and nothing pending
    Idle,
    /// Input drained mid-frame; the partial frame is kept for the next poll
    Drained,
    /// A valid frame was applied to the device state
    Dispatched(PacketType),
    /// A complete frame failed its checksum and was dropped
    Rejected(PacketType),
    /// A partial frame stalled past the drain timeout and was dropped
    Truncated,
}

/// Receiving end of the link
pub struct DisplayLink<T, D, S> {
    port: T,
    delay: D,
    config: LinkConfig,
    reader: FrameReader,
    state: DeviceState<S>,
}

impl<T, D, S> DisplayLink<T, D, S>
where
    T: Uart,
    D: DelayNs,
    S: NvStorage,
{
    /// Create a link around existing device state
    pub fn new(port: T, delay: D, config: LinkConfig, state: DeviceState<S>) -> Self {
        Self {
            port,
            delay,
            config,
            reader: FrameReader::new(),
            state,
        }
    }

    /// Boot calibration from `storage` and start listening
    pub fn boot(port: T, delay: D, config: LinkConfig, storage: S) -> Result<Self, CalibrationError> {
        Ok(Self::new(port, delay, config, DeviceState::boot(storage)?))
    }

    /// Process pending input
    ///
    /// Returns after at most one complete frame, so the caller can render
    /// between frames. Never waits longer than the drain timeout.
    pub fn poll(&mut self) -> Result<Poll, <T as UartTx>::Error> {
        let mut received = false;

        loop {
            let Some(byte) = self.next_byte()? else {
                return self.on_drained(received);
            };
            received = true;

            match self.reader.feed(byte) {
                Ok(Some(frame)) => return self.on_frame(frame),
                Ok(None) => {}
                Err(FrameError::ChecksumMismatch(packet_type)) => {
                    self.reply(packet_type, AckCode::ChecksumMismatch)?;
                    return Ok(Poll::Rejected(packet_type));
                }
                Err(e) => {
                    debug!("frame dropped: {}", e);
                }
            }
        }
    }

    /// Next input byte, waiting up to the drain timeout while mid-frame
    fn next_byte(&mut self) -> Result<Option<u8>, <T as UartTx>::Error> {
        if let Some(byte) = self.port.try_read_byte()? {
            return Ok(Some(byte));
        }
        if self.reader.is_idle() || self.config.drain_timeout_us == 0 {
            return Ok(None);
        }

        let step = self.config.poll_step_us();
        let mut waited: u32 = 0;
        while waited < self.config.drain_timeout_us {
            self.delay.delay_us(step);
            waited = waited.saturating_add(step);
            if let Some(byte) = self.port.try_read_byte()? {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }

    fn on_drained(&mut self, received: bool) -> Result<Poll, <T as UartTx>::Error> {
        if self.reader.is_idle() {
            if !received && self.config.report_idle {
                self.port.write_blocking(&[AckCode::NoData.as_u8()])?;
                self.port.flush()?;
            }
            return Ok(Poll::Idle);
        }

        if self.config.drain_timeout_us == 0 {
            return Ok(Poll::Drained);
        }

        let (consumed, expected) = self.reader.progress();
        debug!("truncated frame, {} of {} bytes", consumed, expected);
        // Without a type byte there is no way to tell whether a reply is expected
        if let Some(packet_type) = self.reader.abort() {
            self.reply(packet_type, AckCode::Truncated)?;
        }
        Ok(Poll::Truncated)
    }

    fn on_frame(&mut self, frame: Frame) -> Result<Poll, <T as UartTx>::Error> {
        let packet_type = frame.packet_type();

        match frame.decode() {
            Ok(payload) => {
                // The ack reports frame integrity, not handler success
                if let Err(e) = self.state.apply(&payload) {
                    warn!("{} handler failed: {}", packet_type, e);
                }
            }
            Err(e) => {
                warn!("{} payload rejected: {}", packet_type, e);
            }
        }

        self.reply(packet_type, AckCode::Ok)?;
        Ok(Poll::Dispatched(packet_type))
    }

    /// Send an ack byte if this packet type is confirmed
    fn reply(&mut self, packet_type: PacketType, code: AckCode) -> Result<(), <T as UartTx>::Error> {
        if !self.config.confirms(packet_type) {
            return Ok(());
        }
        trace!("ack {} with {=u8:#x}", packet_type, code.as_u8());
        self.port.write_blocking(&[code.as_u8()])?;
        self.port.flush()
    }

    /// Device state for rendering
    pub fn state(&self) -> &DeviceState<S> {
        &self.state
    }

    /// Device state, mutably (dirty tracking)
    pub fn state_mut(&mut self) -> &mut DeviceState<S> {
        &mut self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Reader counters
    pub fn reader_stats(&self) -> ReaderStats {
        self.reader.stats()
    }

    /// Progress of the frame being received, for a link activity indicator
    pub fn progress(&self) -> (usize, usize) {
        self.reader.progress()
    }

    pub fn port(&self) -> &T {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Release the port, delay and device state
    pub fn into_parts(self) -> (T, D, DeviceState<S>) {
        (self.port, self.delay, self.state)
    }
}
