//! Typed payloads for each packet type
//!
//! Payloads are read and written field by field at fixed offsets rather
//! than reinterpreted in place, so layout does not depend on alignment or
//! host endianness. Multi-byte fields are little-endian.

use heapless::String;

use crate::frame::FrameError;
use crate::packet::{PacketType, MAX_PAYLOAD_SIZE, STATUS_LEN, VALUES_COUNT};

/// Display render mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DisplayMode {
    /// Show the status text line
    #[default]
    StatusText = 0x01,
    /// Show one bar per telemetry channel
    Values = 0x02,
}

impl DisplayMode {
    /// Parse a mode byte. Unknown modes fall back to [`DisplayMode::StatusText`].
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x02 => DisplayMode::Values,
            _ => DisplayMode::StatusText,
        }
    }

    /// Wire byte for this mode
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Fixed-width status text
///
/// On the wire the text is followed by NUL padding up to [`STATUS_LEN`].
/// Decoding stops at the first NUL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusText(String<STATUS_LEN>);

impl StatusText {
    /// Create status text, truncating to the field capacity
    ///
    /// Non-ASCII characters are replaced with `?` so every character is one
    /// byte on the wire.
    pub fn new(text: &str) -> Self {
        let mut out = String::new();
        for ch in text.chars() {
            let ch = if ch.is_ascii() && ch != '\0' { ch } else { '?' };
            if out.push(ch).is_err() {
                break;
            }
        }
        Self(out)
    }

    /// Text content
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn encode(&self, buf: &mut [u8]) {
        let bytes = self.0.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()..STATUS_LEN].fill(0);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut out = String::new();
        for &byte in bytes.iter().take_while(|&&b| b != 0) {
            let ch = if byte.is_ascii() { byte as char } else { '?' };
            // Field and string share a capacity, so this cannot overflow
            let _ = out.push(ch);
        }
        Self(out)
    }
}

/// Decoded payload of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// Raw reading per channel
    Values([u16; VALUES_COUNT]),
    /// Status text
    Status(StatusText),
    /// Render mode
    Mode(DisplayMode),
    /// Start auto-ranging on `channel`; out-of-range stops calibration
    Calibrate { channel: u8 },
    /// Persist `channel`'s bounds
    StoreCalibration { channel: u8 },
    /// Reload `channel`'s bounds from storage
    ReadCalibration { channel: u8 },
    /// Signal strength
    Signal(u8),
}

impl Payload {
    /// Packet type carrying this payload
    pub fn packet_type(&self) -> PacketType {
        match self {
            Payload::Values(_) => PacketType::Values,
            Payload::Status(_) => PacketType::Status,
            Payload::Mode(_) => PacketType::Mode,
            Payload::Calibrate { .. } => PacketType::Calibrate,
            Payload::StoreCalibration { .. } => PacketType::StoreCalibration,
            Payload::ReadCalibration { .. } => PacketType::ReadCalibration,
            Payload::Signal(_) => PacketType::Signal,
        }
    }

    /// Encode the payload into `buf`
    ///
    /// Returns the number of bytes written, always the fixed size of the
    /// packet type.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, FrameError> {
        let size = self.packet_type().payload_size();
        if buf.len() < size {
            return Err(FrameError::BufferTooSmall);
        }

        match self {
            Payload::Values(values) => {
                for (chunk, value) in buf[..size].chunks_exact_mut(2).zip(values) {
                    chunk.copy_from_slice(&value.to_le_bytes());
                }
            }
            Payload::Status(text) => text.encode(&mut buf[..size]),
            Payload::Mode(mode) => buf[0] = mode.as_u8(),
            Payload::Calibrate { channel }
            | Payload::StoreCalibration { channel }
            | Payload::ReadCalibration { channel } => buf[0] = *channel,
            Payload::Signal(strength) => buf[0] = *strength,
        }

        Ok(size)
    }

    /// Encode into a fixed buffer sized for the largest payload
    pub fn to_bytes(&self) -> ([u8; MAX_PAYLOAD_SIZE], usize) {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        // Buffer holds every payload type
        let len = self.encode(&mut buf).unwrap_or(0);
        (buf, len)
    }

    /// Decode a payload of the given type
    ///
    /// `bytes` must be exactly the fixed payload size for the type.
    pub fn decode(packet_type: PacketType, bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != packet_type.payload_size() {
            return Err(FrameError::PayloadSize);
        }

        let payload = match packet_type {
            PacketType::Values => {
                let mut values = [0u16; VALUES_COUNT];
                for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(2)) {
                    *value = u16::from_le_bytes([chunk[0], chunk[1]]);
                }
                Payload::Values(values)
            }
            PacketType::Status => Payload::Status(StatusText::decode(bytes)),
            PacketType::Mode => Payload::Mode(DisplayMode::from_byte(bytes[0])),
            PacketType::Calibrate => Payload::Calibrate { channel: bytes[0] },
            PacketType::StoreCalibration => Payload::StoreCalibration { channel: bytes[0] },
            PacketType::ReadCalibration => Payload::ReadCalibration { channel: bytes[0] },
            PacketType::Signal => Payload::Signal(bytes[0]),
        };

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_little_endian() {
        let mut values = [0u16; VALUES_COUNT];
        values[0] = 0x1234;
        values[VALUES_COUNT - 1] = 0xABCD;

        let (buf, len) = Payload::Values(values).to_bytes();
        assert_eq!(len, VALUES_COUNT * 2);
        assert_eq!(&buf[..2], &[0x34, 0x12]);
        assert_eq!(&buf[len - 2..len], &[0xCD, 0xAB]);

        let decoded = Payload::decode(PacketType::Values, &buf[..len]).unwrap();
        assert_eq!(decoded, Payload::Values(values));
    }

    #[test]
    fn test_status_nul_padded() {
        let (buf, len) = Payload::Status(StatusText::new("IDLE")).to_bytes();
        assert_eq!(len, STATUS_LEN);
        assert_eq!(&buf[..4], b"IDLE");
        assert!(buf[4..len].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_status_stops_at_first_nul() {
        let mut raw = [0u8; STATUS_LEN];
        raw[..3].copy_from_slice(b"LOG");
        raw[4] = b'X'; // garbage after terminator is ignored

        let decoded = Payload::decode(PacketType::Status, &raw).unwrap();
        match decoded {
            Payload::Status(text) => assert_eq!(text.as_str(), "LOG"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_status_truncates_to_capacity() {
        let long = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let text = StatusText::new(long);
        assert_eq!(text.as_str(), &long[..STATUS_LEN]);
    }

    #[test]
    fn test_status_replaces_non_ascii() {
        assert_eq!(StatusText::new("20°C").as_str(), "20?C");

        let mut raw = [0u8; STATUS_LEN];
        raw[0] = b'A';
        raw[1] = 0xB0;
        let decoded = Payload::decode(PacketType::Status, &raw).unwrap();
        assert_eq!(decoded, Payload::Status(StatusText::new("A?")));
    }

    #[test]
    fn test_unknown_mode_falls_back_to_status_text() {
        let decoded = Payload::decode(PacketType::Mode, &[0x7F]).unwrap();
        assert_eq!(decoded, Payload::Mode(DisplayMode::StatusText));
    }

    #[test]
    fn test_single_byte_payloads() {
        let payload = Payload::Calibrate { channel: 3 };
        let (buf, len) = payload.to_bytes();
        assert_eq!((len, buf[0]), (1, 3));
        assert_eq!(
            Payload::decode(PacketType::StoreCalibration, &[5]).unwrap(),
            Payload::StoreCalibration { channel: 5 }
        );
        assert_eq!(
            Payload::decode(PacketType::Signal, &[200]).unwrap(),
            Payload::Signal(200)
        );
    }

    #[test]
    fn test_decode_wrong_size() {
        assert_eq!(
            Payload::decode(PacketType::Mode, &[1, 2]),
            Err(FrameError::PayloadSize)
        );
        assert_eq!(
            Payload::decode(PacketType::Values, &[0; 3]),
            Err(FrameError::PayloadSize)
        );
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            Payload::Values([0; VALUES_COUNT]).encode(&mut buf),
            Err(FrameError::BufferTooSmall)
        );
    }
}
