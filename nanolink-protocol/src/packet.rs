//! Packet type table and wire constants
//!
//! Every packet type carries one fixed-size payload, so the frame length is
//! known as soon as the type byte has been read.

use crate::checksum::CHECKSUM_LEN;
use crate::frame::FrameError;

/// Frame synchronization header
pub const FRAME_HEADER: [u8; 3] = [0xAC, 0xDC, 0xFC];

/// Header length in bytes
pub const HEADER_LEN: usize = FRAME_HEADER.len();

/// Number of telemetry channels in a VALUES payload
#[cfg(not(feature = "legacy-v1"))]
pub const VALUES_COUNT: usize = 14;
/// Number of telemetry channels in a VALUES payload
#[cfg(feature = "legacy-v1")]
pub const VALUES_COUNT: usize = 10;

/// Capacity of the STATUS text field
#[cfg(not(feature = "legacy-v1"))]
pub const STATUS_LEN: usize = 10;
/// Capacity of the STATUS text field
#[cfg(feature = "legacy-v1")]
pub const STATUS_LEN: usize = 20;

/// Channel byte meaning "no channel" in calibration commands
pub const NO_CHANNEL: u8 = 0xFF;

/// Size of the VALUES payload (little-endian u16 per channel)
pub const VALUES_PAYLOAD_SIZE: usize = VALUES_COUNT * 2;

/// Largest payload of any packet type
pub const MAX_PAYLOAD_SIZE: usize = if VALUES_PAYLOAD_SIZE > STATUS_LEN {
    VALUES_PAYLOAD_SIZE
} else {
    STATUS_LEN
};

/// Largest complete frame (HEADER + TYPE + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = HEADER_LEN + 1 + MAX_PAYLOAD_SIZE + CHECKSUM_LEN;

/// Packet type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// One reading per telemetry channel
    Values = 0x01,
    /// Short NUL-padded status text
    Status = 0x02,
    /// Display render mode
    Mode = 0x03,
    /// Start auto-ranging on a channel (out-of-range channel stops it)
    Calibrate = 0x04,
    /// Persist a channel's bounds
    StoreCalibration = 0x05,
    /// Reload a channel's bounds from storage
    ReadCalibration = 0x06,
    /// Signal strength, 0-255
    Signal = 0x07,
}

impl PacketType {
    /// All packet types in wire order
    pub const ALL: [PacketType; 7] = [
        PacketType::Values,
        PacketType::Status,
        PacketType::Mode,
        PacketType::Calibrate,
        PacketType::StoreCalibration,
        PacketType::ReadCalibration,
        PacketType::Signal,
    ];

    /// Parse a type from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(PacketType::Values),
            0x02 => Some(PacketType::Status),
            0x03 => Some(PacketType::Mode),
            0x04 => Some(PacketType::Calibrate),
            0x05 => Some(PacketType::StoreCalibration),
            0x06 => Some(PacketType::ReadCalibration),
            0x07 => Some(PacketType::Signal),
            _ => None,
        }
    }

    /// Wire byte for this type
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed payload size for this type
    pub const fn payload_size(self) -> usize {
        match self {
            PacketType::Values => VALUES_PAYLOAD_SIZE,
            PacketType::Status => STATUS_LEN,
            PacketType::Mode
            | PacketType::Calibrate
            | PacketType::StoreCalibration
            | PacketType::ReadCalibration
            | PacketType::Signal => 1,
        }
    }

    /// Total frame length for this type
    pub const fn frame_len(self) -> usize {
        HEADER_LEN + 1 + self.payload_size() + CHECKSUM_LEN
    }
}

impl TryFrom<u8> for PacketType {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        PacketType::from_byte(byte).ok_or(FrameError::UnknownType(byte))
    }
}

/// Single-byte reply sent by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AckCode {
    /// Frame accepted and dispatched
    Ok = 0x00,
    /// Checksum did not match; frame discarded
    ChecksumMismatch = 0xFF,
    /// Input drained before the frame was complete
    Truncated = 0xEE,
    /// Polled with no input pending (diagnostic)
    NoData = 0xDD,
}

impl AckCode {
    /// Parse an ack from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(AckCode::Ok),
            0xFF => Some(AckCode::ChecksumMismatch),
            0xEE => Some(AckCode::Truncated),
            0xDD => Some(AckCode::NoData),
            _ => None,
        }
    }

    /// Wire byte for this ack
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}
