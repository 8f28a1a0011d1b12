//! Auto-ranging calibration with explicit persistence
//!
//! While a channel is selected for calibration every reading widens its
//! `[min, max]` bounds. Bounds reach storage only on an explicit store,
//! never on observation, to spare the EEPROM.
//!
//! Storage layout (little-endian):
//!
//! ```text
//! offset 0            sentinel (0xFF = never initialized, 0x00 = initialized)
//! offset 1..4         reserved
//! offset 4 + c * 4    channel c: min (u16), max (u16)
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use nanolink_hal::storage::{NvStorage, StorageError};
use nanolink_protocol::{NO_CHANNEL, VALUES_COUNT};

/// Offset of the initialization sentinel
pub const SENTINEL_OFFSET: usize = 0;
/// Sentinel value of storage that has never been initialized
pub const SENTINEL_UNINITIALIZED: u8 = 0xFF;
/// Sentinel value written after first-boot initialization
pub const SENTINEL_INITIALIZED: u8 = 0x00;

/// Offset of channel 0's record
pub const RECORD_BASE: usize = 4;
/// Bytes per channel record
pub const RECORD_SIZE: usize = 2 * core::mem::size_of::<u16>();
/// Storage needed for the sentinel and every channel record
pub const STORAGE_SIZE: usize = RECORD_BASE + VALUES_COUNT * RECORD_SIZE;

/// Default lower bound
pub const DEFAULT_MIN: u16 = 0;
/// Default upper bound (bar scale of roughly 0.058 px per count on a 64 px panel)
pub const DEFAULT_MAX: u16 = 1100;

/// Height of the value bars in pixels
pub const DISPLAY_HEIGHT: u16 = 64;

/// Calibration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Storage operation failed
    Storage(StorageError),
    /// Channel index outside `0..VALUES_COUNT`
    InvalidChannel(u8),
}

impl From<StorageError> for CalibrationError {
    fn from(e: StorageError) -> Self {
        CalibrationError::Storage(e)
    }
}

/// Bounds for a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationRecord {
    pub min: u16,
    pub max: u16,
}

impl Default for CalibrationRecord {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CalibrationRecord {
    /// Documented default range
    pub const DEFAULT: Self = Self {
        min: DEFAULT_MIN,
        max: DEFAULT_MAX,
    };

    /// Inverted bounds that any observation will replace
    pub const EMPTY: Self = Self {
        min: u16::MAX,
        max: u16::MIN,
    };

    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// True once at least one value has been observed (`min <= max`)
    pub const fn has_data(&self) -> bool {
        self.min <= self.max
    }

    /// Widen the bounds to include `value`; never narrows
    pub fn observe(&mut self, value: u16) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Map `value` linearly from `[min, max]` onto `[0, height]`
    ///
    /// Values outside the bounds are clamped. A degenerate range
    /// (`min >= max`) scales everything to zero.
    pub fn scale(&self, value: u16, height: u16) -> u16 {
        if self.min >= self.max {
            return 0;
        }
        let span = u32::from(self.max - self.min);
        let offset = u32::from(value.clamp(self.min, self.max) - self.min);
        // offset <= span, so the result is at most `height`
        (offset * u32::from(height) / span) as u16
    }

    /// Storage representation
    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let min = self.min.to_le_bytes();
        let max = self.max.to_le_bytes();
        [min[0], min[1], max[0], max[1]]
    }

    /// Parse the storage representation
    pub fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self {
            min: u16::from_le_bytes([bytes[0], bytes[1]]),
            max: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// Storage offset of a channel's record
pub const fn record_offset(channel: usize) -> usize {
    RECORD_BASE + channel * RECORD_SIZE
}

/// Per-channel bounds plus the single calibration selector
///
/// Owns every record. Other components read scaled magnitudes through
/// [`CalibrationStore::scale`].
pub struct CalibrationStore<S> {
    storage: S,
    records: [CalibrationRecord; VALUES_COUNT],
    calibrating: Option<u8>,
}

impl<S: NvStorage> CalibrationStore<S> {
    /// Bring the store up from non-volatile storage
    ///
    /// On first ever boot (sentinel `0xFF`) every channel is written with
    /// the default range and the sentinel is cleared. Later boots reload
    /// all channels.
    pub fn boot(storage: S) -> Result<Self, CalibrationError> {
        let mut store = Self {
            storage,
            records: [CalibrationRecord::DEFAULT; VALUES_COUNT],
            calibrating: None,
        };

        if store.storage.read_byte(SENTINEL_OFFSET)? == SENTINEL_UNINITIALIZED {
            info!("first boot, writing default calibration");
            for channel in 0..VALUES_COUNT {
                store.write_record(channel)?;
            }
            store
                .storage
                .write_byte(SENTINEL_OFFSET, SENTINEL_INITIALIZED)?;
        } else {
            for channel in 0..VALUES_COUNT {
                store.records[channel] = store.read_record(channel)?;
            }
            debug!("loaded calibration for {} channels", VALUES_COUNT);
        }

        Ok(store)
    }

    /// Channel currently calibrating, if any
    pub fn calibrating_channel(&self) -> Option<u8> {
        self.calibrating
    }

    /// Selector as sent on the wire, [`NO_CHANNEL`] when idle
    pub fn selector(&self) -> u8 {
        self.calibrating.unwrap_or(NO_CHANNEL)
    }

    /// Bounds for a channel
    pub fn record(&self, channel: u8) -> Option<CalibrationRecord> {
        self.records.get(usize::from(channel)).copied()
    }

    /// All bounds
    pub fn records(&self) -> &[CalibrationRecord; VALUES_COUNT] {
        &self.records
    }

    /// Start auto-ranging on `channel`
    ///
    /// The channel's bounds are inverted so the next readings define them.
    /// Any other calibrating channel stops first. An out-of-range channel
    /// stops calibration instead. Starting the same channel again simply
    /// resets its bounds again.
    pub fn start_calibration(&mut self, channel: u8) {
        if usize::from(channel) >= VALUES_COUNT {
            self.stop_calibration();
            return;
        }

        if let Some(previous) = self.calibrating {
            if previous != channel {
                self.finish(previous);
            }
        }

        self.records[usize::from(channel)] = CalibrationRecord::EMPTY;
        self.calibrating = Some(channel);
        info!("calibrating channel {}", channel);
    }

    /// Stop auto-ranging
    pub fn stop_calibration(&mut self) {
        if let Some(channel) = self.calibrating.take() {
            self.finish(channel);
            info!("calibration stopped on channel {}", channel);
        }
    }

    /// A channel that saw no readings falls back to the default range
    fn finish(&mut self, channel: u8) {
        let record = &mut self.records[usize::from(channel)];
        if !record.has_data() {
            debug!("channel {} saw no data, restoring defaults", channel);
            *record = CalibrationRecord::DEFAULT;
        }
    }

    /// Feed one reading; only the calibrating channel is affected
    pub fn observe(&mut self, channel: u8, value: u16) {
        if self.calibrating == Some(channel) {
            self.records[usize::from(channel)].observe(value);
        }
    }

    /// Feed a full VALUES payload
    pub fn observe_all(&mut self, values: &[u16; VALUES_COUNT]) {
        if let Some(channel) = self.calibrating {
            self.records[usize::from(channel)].observe(values[usize::from(channel)]);
        }
    }

    /// Persist a channel's current bounds
    pub fn store(&mut self, channel: u8) -> Result<(), CalibrationError> {
        let index = Self::index(channel)?;
        self.write_record(index)?;
        info!(
            "stored channel {} bounds {}..{}",
            channel, self.records[index].min, self.records[index].max
        );
        Ok(())
    }

    /// Reload a channel's bounds from storage
    pub fn load(&mut self, channel: u8) -> Result<CalibrationRecord, CalibrationError> {
        let index = Self::index(channel)?;
        let record = self.read_record(index)?;
        self.records[index] = record;
        info!("loaded channel {} bounds {}..{}", channel, record.min, record.max);
        Ok(record)
    }

    /// Display magnitude for a reading, `0..=DISPLAY_HEIGHT`
    pub fn scale(&self, channel: u8, value: u16) -> u16 {
        self.scale_to(channel, value, DISPLAY_HEIGHT)
    }

    /// Display magnitude for a reading on a panel of `height` pixels
    pub fn scale_to(&self, channel: u8, value: u16, height: u16) -> u16 {
        self.record(channel)
            .map(|record| record.scale(value, height))
            .unwrap_or(0)
    }

    /// Underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Release the storage, e.g. to simulate a power cycle
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn index(channel: u8) -> Result<usize, CalibrationError> {
        let index = usize::from(channel);
        if index < VALUES_COUNT {
            Ok(index)
        } else {
            Err(CalibrationError::InvalidChannel(channel))
        }
    }

    fn write_record(&mut self, channel: usize) -> Result<(), CalibrationError> {
        let bytes = self.records[channel].to_bytes();
        self.storage.write(record_offset(channel), &bytes)?;
        Ok(())
    }

    /// Read a record, normalizing inverted bounds to the default range
    fn read_record(&mut self, channel: usize) -> Result<CalibrationRecord, CalibrationError> {
        let mut bytes = [0u8; RECORD_SIZE];
        self.storage.read(record_offset(channel), &mut bytes)?;
        let record = CalibrationRecord::from_bytes(bytes);
        if record.has_data() {
            Ok(record)
        } else {
            warn!("channel {} stored bounds inverted, using defaults", channel);
            Ok(CalibrationRecord::DEFAULT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanolink_hal::RamStorage;
    use proptest::prelude::*;

    type Storage = RamStorage<STORAGE_SIZE>;

    fn fresh_store() -> CalibrationStore<Storage> {
        CalibrationStore::boot(Storage::new()).unwrap()
    }

    #[test]
    fn test_first_boot_writes_defaults() {
        let store = fresh_store();
        let bytes = store.storage().as_bytes();

        assert_eq!(bytes[SENTINEL_OFFSET], SENTINEL_INITIALIZED);
        for channel in 0..VALUES_COUNT {
            let offset = record_offset(channel);
            assert_eq!(
                &bytes[offset..offset + RECORD_SIZE],
                &CalibrationRecord::DEFAULT.to_bytes()
            );
        }
        assert_eq!(store.record(0), Some(CalibrationRecord::DEFAULT));
        assert_eq!(store.calibrating_channel(), None);
        assert_eq!(store.selector(), NO_CHANNEL);
    }

    #[test]
    fn test_second_boot_loads_stored_bounds() {
        let mut store = fresh_store();
        store.start_calibration(2);
        store.observe(2, 300);
        store.observe(2, 900);
        store.stop_calibration();
        store.store(2).unwrap();

        // Power cycle
        let storage = store.into_storage();
        assert_eq!(storage.as_bytes()[SENTINEL_OFFSET], SENTINEL_INITIALIZED);
        let store = CalibrationStore::boot(storage).unwrap();

        assert_eq!(store.record(2), Some(CalibrationRecord::new(300, 900)));
        assert_eq!(store.record(1), Some(CalibrationRecord::DEFAULT));
    }

    #[test]
    fn test_boot_from_initialized_image() {
        let mut image = [0xFFu8; STORAGE_SIZE];
        image[SENTINEL_OFFSET] = SENTINEL_INITIALIZED;
        for channel in 0..VALUES_COUNT {
            let offset = record_offset(channel);
            image[offset..offset + RECORD_SIZE]
                .copy_from_slice(&CalibrationRecord::new(10, 20).to_bytes());
        }
        let offset = record_offset(1);
        image[offset..offset + RECORD_SIZE].copy_from_slice(&[0x2C, 0x01, 0xE8, 0x03]);

        let store = CalibrationStore::boot(Storage::from_bytes(image)).unwrap();
        assert_eq!(store.record(0), Some(CalibrationRecord::new(10, 20)));
        assert_eq!(store.record(1), Some(CalibrationRecord::new(300, 1000)));
        // Loading never writes
        assert_eq!(store.storage().write_count(), 0);
        assert_eq!(store.storage().as_bytes(), &image);
    }

    #[test]
    fn test_store_load_roundtrip_is_bit_identical() {
        let mut store = fresh_store();
        store.start_calibration(0);
        store.observe(0, 0xBEEF);
        store.observe(0, 0x0102);
        store.stop_calibration();
        let before = store.record(0).unwrap();
        store.store(0).unwrap();

        let mut store = CalibrationStore::boot(store.into_storage()).unwrap();
        assert_eq!(store.load(0).unwrap(), before);
        assert_eq!(store.record(0).unwrap().to_bytes(), before.to_bytes());
    }

    #[test]
    fn test_observe_does_not_touch_storage() {
        let mut store = fresh_store();
        let writes = store.storage().write_count();

        store.start_calibration(1);
        for value in [10, 20, 5, 700] {
            store.observe(1, value);
        }
        assert_eq!(store.storage().write_count(), writes);
        assert_eq!(store.record(1), Some(CalibrationRecord::new(5, 700)));
    }

    #[test]
    fn test_observe_ignores_other_channels() {
        let mut store = fresh_store();
        store.start_calibration(3);
        store.observe(4, 5000);
        assert_eq!(store.record(4), Some(CalibrationRecord::DEFAULT));
        assert_eq!(store.record(3), Some(CalibrationRecord::EMPTY));

        let mut values = [0u16; VALUES_COUNT];
        values[3] = 42;
        values[4] = 4242;
        store.observe_all(&values);
        assert_eq!(store.record(3), Some(CalibrationRecord::new(42, 42)));
        assert_eq!(store.record(4), Some(CalibrationRecord::DEFAULT));
    }

    #[test]
    fn test_out_of_range_channel_stops_calibration() {
        let mut store = fresh_store();
        store.start_calibration(1);
        store.observe(1, 100);
        store.observe(1, 200);

        store.start_calibration(NO_CHANNEL);
        assert_eq!(store.calibrating_channel(), None);
        assert_eq!(store.record(1), Some(CalibrationRecord::new(100, 200)));

        store.start_calibration(VALUES_COUNT as u8);
        assert_eq!(store.calibrating_channel(), None);
    }

    #[test]
    fn test_stop_without_data_restores_defaults() {
        let mut store = fresh_store();
        store.start_calibration(5);
        store.stop_calibration();
        assert_eq!(store.record(5), Some(CalibrationRecord::DEFAULT));

        // Switching channels finishes the previous one the same way
        store.start_calibration(5);
        store.start_calibration(6);
        assert_eq!(store.record(5), Some(CalibrationRecord::DEFAULT));
        assert_eq!(store.calibrating_channel(), Some(6));
    }

    #[test]
    fn test_restart_is_idempotent() {
        let mut store = fresh_store();
        store.start_calibration(0);
        store.observe(0, 50);
        store.start_calibration(0);
        assert_eq!(store.record(0), Some(CalibrationRecord::EMPTY));
        store.start_calibration(0);
        assert_eq!(store.record(0), Some(CalibrationRecord::EMPTY));
        assert_eq!(store.calibrating_channel(), Some(0));
    }

    #[test]
    fn test_invalid_channel_persistence() {
        let mut store = fresh_store();
        assert_eq!(
            store.store(VALUES_COUNT as u8),
            Err(CalibrationError::InvalidChannel(VALUES_COUNT as u8))
        );
        assert_eq!(
            store.load(0xFF),
            Err(CalibrationError::InvalidChannel(0xFF))
        );
    }

    #[test]
    fn test_load_normalizes_inverted_bounds() {
        let mut store = fresh_store();
        store.start_calibration(0);
        // Never observed: EMPTY bounds get stored verbatim
        store.store(0).unwrap();
        store.stop_calibration();

        assert_eq!(store.load(0).unwrap(), CalibrationRecord::DEFAULT);
    }

    #[test]
    fn test_storage_too_small() {
        let result = CalibrationStore::boot(RamStorage::<8>::new());
        assert_eq!(
            result.err(),
            Some(CalibrationError::Storage(StorageError::OutOfRange))
        );
    }

    #[test]
    fn test_scale() {
        let record = CalibrationRecord::new(100, 200);
        assert_eq!(record.scale(100, 64), 0);
        assert_eq!(record.scale(150, 64), 32);
        assert_eq!(record.scale(200, 64), 64);
        // Clamped outside the range
        assert_eq!(record.scale(0, 64), 0);
        assert_eq!(record.scale(u16::MAX, 64), 64);
    }

    #[test]
    fn test_scale_degenerate_range() {
        assert_eq!(CalibrationRecord::new(500, 500).scale(500, 64), 0);
        assert_eq!(CalibrationRecord::EMPTY.scale(1234, 64), 0);

        let store = fresh_store();
        assert_eq!(store.scale(NO_CHANNEL, 500), 0);
    }

    #[test]
    fn test_default_scale_matches_bar_factor() {
        let store = fresh_store();
        // 550 counts is half the default range
        assert_eq!(store.scale(0, 550), 32);
        assert_eq!(store.scale(0, DEFAULT_MAX), DISPLAY_HEIGHT);
    }

    proptest! {
        #[test]
        fn bounds_only_widen(
            channel in 0u8..VALUES_COUNT as u8,
            readings in proptest::collection::vec(any::<u16>(), 1..64),
        ) {
            let mut store = fresh_store();
            store.start_calibration(channel);

            let mut previous = store.record(channel).unwrap();
            for value in readings {
                store.observe(channel, value);
                let current = store.record(channel).unwrap();
                prop_assert!(current.min <= previous.min);
                prop_assert!(current.max >= previous.max);
                prop_assert!(current.min <= value && value <= current.max);
                previous = current;
            }
        }

        #[test]
        fn scale_stays_within_height(
            min in any::<u16>(),
            max in any::<u16>(),
            value in any::<u16>(),
            height in 1u16..=480,
        ) {
            let scaled = CalibrationRecord::new(min, max).scale(value, height);
            prop_assert!(scaled <= height);
        }
    }
}
