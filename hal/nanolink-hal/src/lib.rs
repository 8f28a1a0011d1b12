//! Nanolink Hardware Abstraction Layer
//!
//! This crate defines the two hardware seams the telemetry link needs,
//! so the protocol and calibration logic can run unchanged on the logger
//! board, the display board, and the host test harness.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  nanolink-core / nanolink-protocol      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nanolink-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────────┐
//!         ▼           ▼               ▼
//!  embedded-io   embedded-storage   mock (host)
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Half-duplex serial byte stream
//! - [`storage::NvStorage`] - Byte-addressable non-volatile storage (EEPROM)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod storage;
pub mod uart;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export key traits at crate root for convenience
pub use storage::{NvStorage, RamStorage, StorageError};
pub use uart::{Uart, UartRx, UartTx};
