//! Telemetry renderer
//!
//! Turns [`DeviceState`] into drawing calls:
//!
//! ```text
//! y=0   ████████████░░░░░░░░   signal strength
//! y=1   ██████░░░░░░░░░░░░░░   frame being received
//!
//!        STATUS TEXT           (StatusText mode)
//!   or
//!       █  █     █             (Values mode, one bar per channel,
//!    █  █  █  █  █              bottom-anchored)
//! ```

use nanolink_core::DeviceState;
use nanolink_hal::storage::NvStorage;
use nanolink_protocol::DisplayMode;

use crate::backend::{DisplayBackend, DisplayError};

/// Horizontal distance between bars
pub const BAR_PITCH: u16 = 12;
/// Width of one bar
pub const BAR_WIDTH: u16 = 10;
/// Status text baseline position
pub const STATUS_POS: (u16, u16) = (5, 25);
/// Row of the signal strength bar
pub const SIGNAL_ROW: u16 = 0;
/// Row of the link activity bar
pub const ACTIVITY_ROW: u16 = 1;

/// Draw a full frame
///
/// `activity` is the receive progress as (bytes consumed, expected frame
/// length), see `DisplayLink::progress`.
pub fn render<B, S>(
    backend: &mut B,
    state: &DeviceState<S>,
    activity: (usize, usize),
) -> Result<(), DisplayError>
where
    B: DisplayBackend,
    S: NvStorage,
{
    let (width, _) = backend.pixel_dimensions();

    backend.clear()?;

    let signal = u32::from(state.signal()) * u32::from(width) / u32::from(u8::MAX);
    if signal > 0 {
        backend.fill_rect(0, SIGNAL_ROW, signal as u16, 1)?;
    }

    let (consumed, expected) = activity;
    if consumed > 0 && expected > 0 {
        let filled = consumed.min(expected) * usize::from(width) / expected;
        backend.fill_rect(0, ACTIVITY_ROW, filled as u16, 1)?;
    }

    match state.mode() {
        DisplayMode::StatusText => {
            backend.draw_text(STATUS_POS.0, STATUS_POS.1, state.status().as_str())?
        }
        DisplayMode::Values => render_bars(backend, state)?,
    }

    backend.flush()
}

/// Draw a frame only if the state changed since the last draw
///
/// Returns whether anything was drawn.
pub fn refresh<B, S>(
    backend: &mut B,
    state: &mut DeviceState<S>,
    activity: (usize, usize),
) -> Result<bool, DisplayError>
where
    B: DisplayBackend,
    S: NvStorage,
{
    if !state.take_dirty() && activity.0 == 0 {
        return Ok(false);
    }
    render(backend, state, activity)?;
    Ok(true)
}

/// Bars that do not fit the panel width are skipped
fn render_bars<B, S>(backend: &mut B, state: &DeviceState<S>) -> Result<(), DisplayError>
where
    B: DisplayBackend,
    S: NvStorage,
{
    let (width, height) = backend.pixel_dimensions();
    let calibration = state.calibration();

    for (channel, &value) in state.values().iter().enumerate() {
        let x = channel as u16 * BAR_PITCH;
        if x + BAR_WIDTH > width {
            break;
        }
        let bar = calibration.scale_to(channel as u8, value, height);
        if bar > 0 {
            backend.fill_rect(x, height - bar, BAR_WIDTH, bar)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::{String, Vec};
    use nanolink_core::calibration::{DEFAULT_MAX, STORAGE_SIZE};
    use nanolink_hal::RamStorage;
    use nanolink_protocol::{Payload, StatusText, VALUES_COUNT};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Clear,
        Rect(u16, u16, u16, u16),
        Text(u16, u16, String<32>),
        Flush,
    }

    struct Recorder {
        ops: Vec<Op, 64>,
        size: (u16, u16),
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                ops: Vec::new(),
                size: (128, 64),
            }
        }

        fn record(&mut self, op: Op) -> Result<(), DisplayError> {
            self.ops.push(op).map_err(|_| DisplayError::Communication)
        }

        fn rects(&self) -> impl Iterator<Item = (u16, u16, u16, u16)> + '_ {
            self.ops.iter().filter_map(|op| match op {
                Op::Rect(x, y, w, h) => Some((*x, *y, *w, *h)),
                _ => None,
            })
        }
    }

    impl DisplayBackend for Recorder {
        fn clear(&mut self) -> Result<(), DisplayError> {
            self.ops.clear();
            self.record(Op::Clear)
        }

        fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16) -> Result<(), DisplayError> {
            self.record(Op::Rect(x, y, width, height))
        }

        fn draw_text(&mut self, x: u16, y: u16, text: &str) -> Result<(), DisplayError> {
            let mut s = String::new();
            s.push_str(text).map_err(|_| DisplayError::Communication)?;
            self.record(Op::Text(x, y, s))
        }

        fn flush(&mut self) -> Result<(), DisplayError> {
            self.record(Op::Flush)
        }

        fn pixel_dimensions(&self) -> (u16, u16) {
            self.size
        }
    }

    type State = DeviceState<RamStorage<STORAGE_SIZE>>;

    fn state() -> State {
        DeviceState::boot(RamStorage::new()).unwrap()
    }

    #[test]
    fn test_status_mode_draws_text() {
        let mut backend = Recorder::new();
        let mut state = state();
        state
            .apply(&Payload::Status(StatusText::new("READY")))
            .unwrap();

        render(&mut backend, &state, (0, 4)).unwrap();

        let mut text = String::new();
        text.push_str("READY").unwrap();
        assert_eq!(backend.ops.first(), Some(&Op::Clear));
        assert!(backend.ops.contains(&Op::Text(5, 25, text)));
        assert_eq!(backend.ops.last(), Some(&Op::Flush));
        assert_eq!(backend.rects().count(), 0);
    }

    #[test]
    fn test_values_mode_draws_bottom_anchored_bars() {
        let mut backend = Recorder::new();
        let mut state = state();
        let mut values = [0u16; VALUES_COUNT];
        values[0] = DEFAULT_MAX;
        values[2] = DEFAULT_MAX / 2;
        state.apply(&Payload::Values(values)).unwrap();
        state
            .apply(&Payload::Mode(DisplayMode::Values))
            .unwrap();

        render(&mut backend, &state, (0, 4)).unwrap();

        let bars: std::vec::Vec<_> = backend.rects().collect();
        assert_eq!(bars, [(0, 0, 10, 64), (24, 32, 10, 32)]);
    }

    #[test]
    fn test_bars_limited_to_panel_width() {
        let mut backend = Recorder::new();
        let mut state = state();
        state
            .apply(&Payload::Values([DEFAULT_MAX; VALUES_COUNT]))
            .unwrap();
        state
            .apply(&Payload::Mode(DisplayMode::Values))
            .unwrap();

        render(&mut backend, &state, (0, 4)).unwrap();

        let fitting = (0..VALUES_COUNT as u16)
            .take_while(|i| i * BAR_PITCH + BAR_WIDTH <= 128)
            .count();
        assert_eq!(backend.rects().count(), fitting);
        assert!(backend.rects().all(|(x, _, w, _)| x + w <= 128));
    }

    #[test]
    fn test_signal_and_activity_rows() {
        let mut backend = Recorder::new();
        let mut state = state();
        state.apply(&Payload::Signal(u8::MAX)).unwrap();

        render(&mut backend, &state, (5, 10)).unwrap();

        let rows: std::vec::Vec<_> = backend.rects().collect();
        assert_eq!(rows, [(0, SIGNAL_ROW, 128, 1), (0, ACTIVITY_ROW, 64, 1)]);
    }

    #[test]
    fn test_refresh_only_when_dirty() {
        let mut backend = Recorder::new();
        let mut state = state();

        assert_eq!(refresh(&mut backend, &mut state, (0, 4)), Ok(true));
        assert_eq!(refresh(&mut backend, &mut state, (0, 4)), Ok(false));

        state.apply(&Payload::Signal(1)).unwrap();
        assert_eq!(refresh(&mut backend, &mut state, (0, 4)), Ok(true));

        // A frame in flight keeps the activity bar moving
        assert_eq!(refresh(&mut backend, &mut state, (2, 7)), Ok(true));
    }
}
