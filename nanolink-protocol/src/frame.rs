//! Frame encoding and decoding for the Nanolink protocol.
//!
//! Frame format:
//! - HEADER (3 bytes): 0xAC 0xDC 0xFC synchronization sequence
//! - TYPE (1 byte): packet type, selects the fixed payload size
//! - PAYLOAD (fixed size per TYPE)
//! - CHECKSUM (2 bytes): running additive checksum over TYPE and PAYLOAD

use heapless::Vec;

use crate::checksum::{Checksum, CHECKSUM_LEN};
use crate::messages::Payload;
use crate::packet::{PacketType, FRAME_HEADER, HEADER_LEN, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Type byte does not name a known packet type
    UnknownType(u8),
    /// Payload length differs from the fixed size of its type
    PayloadSize,
    /// Checksum mismatch on a received frame
    ChecksumMismatch(PacketType),
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A validated frame: known type and a payload of exactly the right size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    packet_type: PacketType,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a frame from a raw payload
    pub fn new(packet_type: PacketType, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != packet_type.payload_size() {
            return Err(FrameError::PayloadSize);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadSize)?;

        Ok(Self {
            packet_type,
            payload: payload_vec,
        })
    }

    /// Create a frame carrying a typed payload
    pub fn from_payload(payload: &Payload) -> Result<Self, FrameError> {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = payload.encode(&mut buf)?;
        Self::new(payload.packet_type(), &buf[..len])
    }

    /// Packet type
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload into its typed form
    pub fn decode(&self) -> Result<Payload, FrameError> {
        Payload::decode(self.packet_type, &self.payload)
    }

    /// Checksum over TYPE and PAYLOAD
    pub fn checksum(&self) -> Checksum {
        let mut checksum = Checksum::new();
        checksum.update(self.packet_type.as_u8());
        checksum.update_slice(&self.payload);
        checksum
    }

    /// Encoded length in bytes
    pub fn encoded_len(&self) -> usize {
        self.packet_type.frame_len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let payload_end = HEADER_LEN + 1 + self.payload.len();
        buffer[..HEADER_LEN].copy_from_slice(&FRAME_HEADER);
        buffer[HEADER_LEN] = self.packet_type.as_u8();
        buffer[HEADER_LEN + 1..payload_end].copy_from_slice(&self.payload);
        buffer[payload_end..frame_len].copy_from_slice(&self.checksum().to_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Counters kept by [`FrameReader`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReaderStats {
    /// Frames that passed validation
    pub frames: u32,
    /// Frames dropped on checksum mismatch
    pub checksum_errors: u32,
    /// Resyncs caused by an unknown type byte
    pub unknown_types: u32,
    /// Frames abandoned part way through
    pub truncated: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Matched this many header bytes so far
    SeekHeader(usize),
    /// Header matched, next byte is the type
    ReadType,
    /// Collecting payload and checksum bytes
    ReadPayload { packet_type: PacketType, pos: usize },
}

/// Incremental frame parser
///
/// Consumes one byte at a time and never blocks. Any failure returns the
/// parser to header search; there is no sticky error state. A byte that
/// breaks a partial header match is re-tested against the first header
/// byte, so `AC AC DC FC` still synchronizes.
#[derive(Debug, Clone)]
pub struct FrameReader {
    state: ReadState,
    buffer: [u8; MAX_PAYLOAD_SIZE + CHECKSUM_LEN],
    stats: ReaderStats,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    /// Create a new frame reader
    pub const fn new() -> Self {
        Self {
            state: ReadState::SeekHeader(0),
            buffer: [0; MAX_PAYLOAD_SIZE + CHECKSUM_LEN],
            stats: ReaderStats {
                frames: 0,
                checksum_errors: 0,
                unknown_types: 0,
                truncated: 0,
            },
        }
    }

    /// Return to header search, discarding any partial frame
    pub fn reset(&mut self) {
        self.state = ReadState::SeekHeader(0);
    }

    /// Abandon a partial frame
    ///
    /// Returns the packet type of the abandoned frame if its type byte had
    /// already been read. Counts as a truncation whenever at least one
    /// header byte had matched.
    pub fn abort(&mut self) -> Option<PacketType> {
        let pending = self.pending_type();
        if self.in_frame() {
            self.stats.truncated += 1;
            trace!("frame abandoned after {} bytes", self.progress().0);
        }
        self.reset();
        pending
    }

    /// True while scanning for the first header byte
    pub fn is_idle(&self) -> bool {
        self.state == ReadState::SeekHeader(0)
    }

    /// True once at least one header byte has matched
    pub fn in_frame(&self) -> bool {
        !self.is_idle()
    }

    /// Type of the frame being collected, once known
    pub fn pending_type(&self) -> Option<PacketType> {
        match self.state {
            ReadState::ReadPayload { packet_type, .. } => Some(packet_type),
            _ => None,
        }
    }

    /// Link activity indicator: (bytes consumed, expected frame length)
    ///
    /// Before the type byte arrives the expected length is only known to
    /// be at least header plus type.
    pub fn progress(&self) -> (usize, usize) {
        match self.state {
            ReadState::SeekHeader(matched) => (matched, HEADER_LEN + 1),
            ReadState::ReadType => (HEADER_LEN, HEADER_LEN + 1),
            ReadState::ReadPayload { packet_type, pos } => {
                (HEADER_LEN + 1 + pos, packet_type.frame_len())
            }
        }
    }

    /// Counters since creation
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Feed a single byte to the reader
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or
    /// `Err(FrameError::ChecksumMismatch)` when a complete frame failed
    /// validation. Header mismatches and unknown types resynchronize
    /// silently.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ReadState::SeekHeader(matched) => {
                if byte == FRAME_HEADER[matched] {
                    self.state = if matched + 1 == HEADER_LEN {
                        ReadState::ReadType
                    } else {
                        ReadState::SeekHeader(matched + 1)
                    };
                } else if byte == FRAME_HEADER[0] {
                    self.state = ReadState::SeekHeader(1);
                } else {
                    self.state = ReadState::SeekHeader(0);
                }
                Ok(None)
            }
            ReadState::ReadType => {
                match PacketType::from_byte(byte) {
                    Some(packet_type) => {
                        self.state = ReadState::ReadPayload { packet_type, pos: 0 };
                    }
                    None => {
                        trace!("unknown packet type {=u8:#x}, resync", byte);
                        self.stats.unknown_types += 1;
                        self.reset();
                    }
                }
                Ok(None)
            }
            ReadState::ReadPayload { packet_type, pos } => {
                self.buffer[pos] = byte;
                let pos = pos + 1;
                let size = packet_type.payload_size();

                if pos < size + CHECKSUM_LEN {
                    self.state = ReadState::ReadPayload { packet_type, pos };
                    return Ok(None);
                }

                self.reset();
                self.validate(packet_type, size)
            }
        }
    }

    fn validate(&mut self, packet_type: PacketType, size: usize) -> Result<Option<Frame>, FrameError> {
        let mut checksum = Checksum::new();
        checksum.update(packet_type.as_u8());
        checksum.update_slice(&self.buffer[..size]);

        if !checksum.matches(&self.buffer[size..size + CHECKSUM_LEN]) {
            warn!("checksum mismatch on {}", packet_type);
            self.stats.checksum_errors += 1;
            return Err(FrameError::ChecksumMismatch(packet_type));
        }

        self.stats.frames += 1;
        Frame::new(packet_type, &self.buffer[..size]).map(Some)
    }

    /// Feed multiple bytes to the reader
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Frame>, FrameError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}
