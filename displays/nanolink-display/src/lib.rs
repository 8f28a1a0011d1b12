//! Display-side rendering for Nanolink
//!
//! This crate provides:
//! - `DisplayBackend` trait for the panel driver (OLED, TFT, etc.)
//! - The render pass that draws device state as status text or value bars
//!
//! Panel drivers implement [`DisplayBackend`] with their hardware-specific
//! code. The display firmware owns a `DisplayLink` from `nanolink-core`,
//! polls it, and calls [`view::refresh`] between polls.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod backend;
pub mod view;

// Re-export key types
pub use backend::{DisplayBackend, DisplayError};
pub use view::{refresh, render};
