//! UART serial communication abstractions
//!
//! The link runs over a plain asynchronous byte stream with no framing or
//! flow control of its own. Receivers poll for pending bytes one at a time
//! and never block; transmitters write whole frames.

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been queued or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data onto the wire
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Take one pending byte, if any.
    ///
    /// Returns `Ok(None)` immediately when nothing is waiting.
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Drop everything currently pending. Returns the number of bytes discarded.
    fn discard_pending(&mut self) -> Result<usize, Self::Error> {
        let mut dropped = 0;
        while self.try_read_byte()?.is_some() {
            dropped += 1;
        }
        Ok(dropped)
    }
}

/// Combined UART interface
///
/// For UARTs that provide both TX and RX on a single peripheral with one
/// error type.
pub trait Uart: UartTx + UartRx<Error = <Self as UartTx>::Error> {}

// Blanket implementation
impl<T> Uart for T where T: UartTx + UartRx<Error = <T as UartTx>::Error> {}

/// Adapter for any [`embedded_io`] serial port that can report pending input
#[cfg(feature = "embedded-io")]
pub struct IoUart<T>(pub T);

#[cfg(feature = "embedded-io")]
impl<T: embedded_io::Write> UartTx for IoUart<T> {
    type Error = T::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

#[cfg(feature = "embedded-io")]
impl<T: embedded_io::Read + embedded_io::ReadReady> UartRx for IoUart<T> {
    type Error = T::Error;

    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.0.read_ready()? {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        let n = self.0.read(&mut buf)?;
        Ok((n == 1).then_some(buf[0]))
    }
}
