//! Nanolink Communication Protocol
//!
//! This crate defines the UART framing between the data logger (producer)
//! and the remote display (consumer). The byte stream has no framing,
//! acknowledgement or retransmission of its own, so every frame carries a
//! sync header, a fixed-size payload and a checksum, and selected packet
//! types are confirmed with a single reply byte.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌─────────────┬──────┬──────────────────────┬──────────┐
//! │ HEADER      │ TYPE │ PAYLOAD              │ CHECKSUM │
//! │ AC DC FC    │ 1B   │ fixed size per TYPE  │ 2B       │
//! └─────────────┴──────┴──────────────────────┴──────────┘
//! ```
//!
//! Reply byte (display → logger): `0x00` ok, `0xFF` checksum mismatch,
//! `0xEE` truncated frame, `0xDD` nothing pending.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod fmt;

pub mod checksum;
pub mod config;
pub mod frame;
pub mod messages;
pub mod packet;
pub mod writer;

pub use checksum::{Checksum, CHECKSUM_LEN};
pub use config::LinkConfig;
pub use frame::{Frame, FrameError, FrameReader, ReaderStats};
pub use messages::{DisplayMode, Payload, StatusText};
pub use packet::{
    AckCode, PacketType, FRAME_HEADER, HEADER_LEN, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, NO_CHANNEL,
    STATUS_LEN, VALUES_COUNT,
};
pub use writer::{Delivery, FrameWriter, SendError};
