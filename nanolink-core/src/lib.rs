//! Board-agnostic link endpoints for the logger and the display
//!
//! This crate contains everything above the wire format that does not
//! depend on specific hardware:
//!
//! - Auto-ranging calibration with explicit persistence
//! - Display-side device state and packet handlers
//! - Display-side receive loop with ack replies
//! - Logger-side send facade
//!
//! ```text
//!  logger                                   display
//! ┌────────────┐   frames   ┌─────────────┐   apply   ┌─────────────┐
//! │ LoggerLink │ ─────────▶ │ DisplayLink │ ────────▶ │ DeviceState │
//! └────────────┘ ◀───────── └─────────────┘           │ Calibration │
//!                  ack byte                            └─────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod fmt;

pub mod calibration;
pub mod client;
pub mod dispatch;
pub mod receiver;
pub mod state;

pub use calibration::{CalibrationError, CalibrationRecord, CalibrationStore};
pub use client::LoggerLink;
pub use receiver::{DisplayLink, Poll};
pub use state::DeviceState;
