//! Frame transmission with optional confirmation
//!
//! A confirmed send waits for one ack byte per attempt, polling with a
//! cooperative delay so the wait is always bounded. Every reply other than
//! `0x00`, and every attempt that times out, consumes one attempt from the
//! budget in [`LinkConfig::max_attempts`].

use embedded_hal::delay::DelayNs;
use nanolink_hal::uart::{Uart, UartTx};

use crate::config::LinkConfig;
use crate::frame::{Frame, FrameError};
use crate::messages::Payload;
use crate::packet::{AckCode, PacketType, MAX_FRAME_SIZE};

/// Successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delivery {
    /// Transmissions used, first try included
    pub attempts: u8,
    /// Whether the peer acknowledged the frame
    pub confirmed: bool,
}

/// Failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<E> {
    /// Serial port failure
    Io(E),
    /// Frame could not be built
    Frame(FrameError),
    /// Every attempt was rejected or timed out
    Exhausted {
        attempts: u8,
        /// Last reply byte, `None` if the last attempt timed out
        last_reply: Option<u8>,
    },
}

impl<E> From<FrameError> for SendError<E> {
    fn from(e: FrameError) -> Self {
        SendError::Frame(e)
    }
}

/// Builds frames and writes them to a serial port
pub struct FrameWriter<T, D> {
    port: T,
    delay: D,
    config: LinkConfig,
}

impl<T, D> FrameWriter<T, D>
where
    T: Uart,
    D: DelayNs,
{
    /// Create a writer over a serial port
    pub fn new(port: T, delay: D, config: LinkConfig) -> Self {
        Self {
            port,
            delay,
            config,
        }
    }

    /// Link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Underlying serial port
    pub fn port(&self) -> &T {
        &self.port
    }

    /// Underlying serial port, mutably
    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }

    /// Delay provider
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Release the port and delay
    pub fn into_inner(self) -> (T, D) {
        (self.port, self.delay)
    }

    /// Send a typed payload, confirming it when the link config says so
    pub fn send_payload(
        &mut self,
        payload: &Payload,
    ) -> Result<Delivery, SendError<<T as UartTx>::Error>> {
        let (buf, len) = payload.to_bytes();
        let packet_type = payload.packet_type();
        let confirm = self.config.confirms(packet_type);
        self.send(packet_type, &buf[..len], confirm)
    }

    /// Send one frame
    ///
    /// The whole frame is written before the port is flushed. With
    /// `require_confirm` the frame is retransmitted until the peer replies
    /// `0x00` or the attempt budget runs out.
    pub fn send(
        &mut self,
        packet_type: PacketType,
        payload: &[u8],
        require_confirm: bool,
    ) -> Result<Delivery, SendError<<T as UartTx>::Error>> {
        let frame = Frame::new(packet_type, payload)?;
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = frame.encode(&mut buf)?;

        let max_attempts = self.config.attempts();
        let mut last_reply = None;

        for attempt in 1..=max_attempts {
            if require_confirm {
                // Stale bytes would be mistaken for this frame's ack
                let dropped = self.port.discard_pending().map_err(SendError::Io)?;
                if dropped > 0 {
                    trace!("dropped {} stale bytes before send", dropped);
                }
            }

            self.port.write_blocking(&buf[..len]).map_err(SendError::Io)?;
            self.port.flush().map_err(SendError::Io)?;

            if !require_confirm {
                return Ok(Delivery {
                    attempts: attempt,
                    confirmed: false,
                });
            }

            last_reply = self.wait_for_ack()?;
            match last_reply {
                Some(reply) if reply == AckCode::Ok.as_u8() => {
                    return Ok(Delivery {
                        attempts: attempt,
                        confirmed: true,
                    });
                }
                Some(reply) => {
                    debug!(
                        "{} attempt {}/{} rejected with {=u8:#x}",
                        packet_type, attempt, max_attempts, reply
                    );
                }
                None => {
                    debug!(
                        "{} attempt {}/{} timed out",
                        packet_type, attempt, max_attempts
                    );
                }
            }
        }

        warn!("{} not confirmed after {} attempts", packet_type, max_attempts);
        Err(SendError::Exhausted {
            attempts: max_attempts,
            last_reply,
        })
    }

    /// Poll for one reply byte until the ack timeout elapses
    fn wait_for_ack(&mut self) -> Result<Option<u8>, SendError<<T as UartTx>::Error>> {
        let step = self.config.poll_step_us();
        let mut waited: u32 = 0;

        loop {
            if let Some(byte) = self.port.try_read_byte().map_err(SendError::Io)? {
                return Ok(Some(byte));
            }
            if waited >= self.config.ack_timeout_us {
                return Ok(None);
            }
            self.delay.delay_us(step);
            waited = waited.saturating_add(step);
        }
    }
}
