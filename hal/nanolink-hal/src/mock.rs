//! Host-side mocks for testing and simulation
//!
//! [`MockSerial`] plays the peer end of the link: bytes pushed with
//! [`MockSerial::push_rx`] appear as received input, everything written is
//! captured, and scripted replies are released one per flush, the way a
//! peer answers after a frame has gone out on the wire.

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

use crate::uart::{UartRx, UartTx};

/// Receive queue capacity
pub const MOCK_RX_CAPACITY: usize = 512;
/// Transmit capture capacity
pub const MOCK_TX_CAPACITY: usize = 1024;
/// Maximum number of scripted replies
pub const MOCK_REPLY_CAPACITY: usize = 16;

/// Errors raised by the mock serial port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MockError {
    /// A capture buffer is full
    Overflow,
    /// Port was disconnected with [`MockSerial::disconnect`]
    Disconnected,
}

/// Mock serial port
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: Deque<u8, MOCK_RX_CAPACITY>,
    tx: Vec<u8, MOCK_TX_CAPACITY>,
    replies: Deque<Option<u8>, MOCK_REPLY_CAPACITY>,
    flushes: usize,
    connected: bool,
}

impl MockSerial {
    /// Create a connected port with empty queues
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Queue bytes as received input
    pub fn push_rx(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        for &byte in bytes {
            self.rx.push_back(byte).map_err(|_| MockError::Overflow)?;
        }
        Ok(())
    }

    /// Script the reply released on a future flush
    ///
    /// Replies are consumed in order, one per flush. `None` models a peer
    /// that stays silent for that frame.
    pub fn queue_reply(&mut self, reply: Option<u8>) -> Result<(), MockError> {
        self.replies
            .push_back(reply)
            .map_err(|_| MockError::Overflow)
    }

    /// Everything written so far
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Take and clear the captured output
    pub fn take_tx(&mut self) -> Vec<u8, MOCK_TX_CAPACITY> {
        core::mem::take(&mut self.tx)
    }

    /// Number of bytes still waiting to be read
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Number of flushes performed
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Simulate connection loss
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Restore connection
    pub fn reconnect(&mut self) {
        self.connected = true;
    }
}

impl UartTx for MockSerial {
    type Error = MockError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MockError::Disconnected);
        }
        self.tx
            .extend_from_slice(data)
            .map_err(|_| MockError::Overflow)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.connected {
            return Err(MockError::Disconnected);
        }
        self.flushes += 1;
        if let Some(Some(byte)) = self.replies.pop_front() {
            self.rx.push_back(byte).map_err(|_| MockError::Overflow)?;
        }
        Ok(())
    }
}

impl UartRx for MockSerial {
    type Error = MockError;

    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.connected {
            return Err(MockError::Disconnected);
        }
        Ok(self.rx.pop_front())
    }
}

/// Delay that only records how long it was asked to wait
#[derive(Debug, Default, Clone, Copy)]
pub struct MockDelay {
    elapsed_ns: u64,
    calls: u32,
}

impl MockDelay {
    /// Create a delay with zero elapsed time
    pub const fn new() -> Self {
        Self {
            elapsed_ns: 0,
            calls: 0,
        }
    }

    /// Total requested delay in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }

    /// Number of delay calls
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
        self.calls += 1;
    }
}
