//! Display backend trait
//!
//! Drawing primitives live with the panel driver. The renderer only needs
//! filled boxes and a line of text.

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with display
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
    /// Display not initialized
    NotInitialized,
}

/// Pixel display backend
///
/// Implementations buffer drawing calls and push them to the panel on
/// [`DisplayBackend::flush`].
pub trait DisplayBackend {
    /// Clear the frame buffer
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Fill a rectangle
    ///
    /// - `x`, `y`: Top-left corner in pixels
    /// - `width`, `height`: Size in pixels
    fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError>;

    /// Draw text with its baseline at (`x`, `y`)
    fn draw_text(&mut self, x: u16, y: u16, text: &str) -> Result<(), DisplayError>;

    /// Send the frame buffer to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Panel size in pixels as (width, height)
    fn pixel_dimensions(&self) -> (u16, u16);
}
