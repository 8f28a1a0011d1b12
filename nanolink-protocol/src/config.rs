//! Link configuration shared by both ends
//!
//! Sender and receiver must agree on which packet types are confirmed,
//! otherwise acks for unconfirmed traffic would be read as replies to the
//! next confirmed frame.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::packet::PacketType;

/// Default number of transmissions per confirmed frame
pub const DEFAULT_MAX_ATTEMPTS: u8 = 4;

/// Link timing and reliability settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Transmissions per confirmed frame, first try included (0 acts as 1)
    pub max_attempts: u8,
    /// Wait for one ack byte per attempt, in microseconds
    pub ack_timeout_us: u32,
    /// Cooperative yield between polls, in microseconds
    pub poll_interval_us: u32,
    /// How long a partial frame may stall before it is dropped with an
    /// `0xEE` reply, in microseconds. Zero keeps partial frames across polls.
    pub drain_timeout_us: u32,
    /// Confirm VALUES frames
    pub confirm_values: bool,
    /// Reply `0xDD` when polled with nothing pending
    ///
    /// Diagnostic only. The logger reads acks from the same line and counts
    /// any byte other than `0x00` as a failed attempt, so keep this off
    /// while the peer sends confirmed frames.
    pub report_idle: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            ack_timeout_us: 50_000,
            poll_interval_us: 500,
            drain_timeout_us: 5_000,
            confirm_values: false,
            report_idle: false,
        }
    }
}

impl LinkConfig {
    /// Effective attempt budget
    pub fn attempts(&self) -> u8 {
        self.max_attempts.max(1)
    }

    /// Effective poll step, never zero so waits always advance
    pub fn poll_step_us(&self) -> u32 {
        self.poll_interval_us.max(1)
    }

    /// Whether frames of this type are confirmed with an ack byte
    pub fn confirms(&self, packet_type: PacketType) -> bool {
        match packet_type {
            PacketType::Values => self.confirm_values,
            PacketType::Signal => false,
            PacketType::Status
            | PacketType::Mode
            | PacketType::Calibrate
            | PacketType::StoreCalibration
            | PacketType::ReadCalibration => true,
        }
    }
}
