//! Non-volatile storage abstractions
//!
//! Calibration bounds live in a small byte-addressable store (an EEPROM on
//! the display board). Writes wear the medium, so callers persist only on
//! explicit operator action.

/// Errors from storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Access past the end of the device
    OutOfRange,
    /// The underlying device reported a failure
    Device,
}

/// Byte-addressable non-volatile storage
pub trait NvStorage {
    /// Total addressable size in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Read a single byte
    fn read_byte(&mut self, offset: usize) -> Result<u8, StorageError> {
        let mut buf = [0u8; 1];
        self.read(offset, &mut buf)?;
        Ok(buf[0])
    }

    /// Write a single byte
    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        self.write(offset, &[value])
    }
}

/// Check that `len` bytes at `offset` fit in a device of `capacity` bytes
fn check_range(capacity: usize, offset: usize, len: usize) -> Result<(), StorageError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StorageError::OutOfRange),
    }
}

/// RAM-backed storage
///
/// Starts fully erased (every byte `0xFF`), like a fresh EEPROM. Keeping
/// the same instance across a rebuilt calibration store simulates a power
/// cycle.
#[derive(Debug, Clone)]
pub struct RamStorage<const N: usize> {
    bytes: [u8; N],
    write_count: usize,
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStorage<N> {
    /// Create erased storage
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            write_count: 0,
        }
    }

    /// Create storage with existing content
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self {
            bytes,
            write_count: 0,
        }
    }

    /// Raw content
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of write operations performed so far
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl<const N: usize> NvStorage for RamStorage<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_range(N, offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_range(N, offset, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.write_count += 1;
        Ok(())
    }
}

/// Adapter for any [`embedded_storage::Storage`] device
#[cfg(feature = "embedded-storage")]
pub struct StorageDevice<T>(pub T);

#[cfg(feature = "embedded-storage")]
impl<T: embedded_storage::Storage> NvStorage for StorageDevice<T> {
    fn capacity(&self) -> usize {
        self.0.capacity()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_range(self.capacity(), offset, buf.len())?;
        self.0
            .read(offset as u32, buf)
            .map_err(|_| StorageError::Device)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_range(self.capacity(), offset, data.len())?;
        self.0
            .write(offset as u32, data)
            .map_err(|_| StorageError::Device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_storage_starts_erased() {
        let mut storage = RamStorage::<16>::new();
        assert_eq!(storage.read_byte(0), Ok(0xFF));
        assert_eq!(storage.read_byte(15), Ok(0xFF));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_ram_storage_write_read() {
        let mut storage = RamStorage::<16>::new();
        storage.write(4, &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 4];
        storage.read(4, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_ram_storage_out_of_range() {
        let mut storage = RamStorage::<8>::new();
        assert_eq!(storage.write(6, &[0; 4]), Err(StorageError::OutOfRange));
        assert_eq!(storage.read_byte(8), Err(StorageError::OutOfRange));
        assert_eq!(
            storage.read(usize::MAX, &mut [0u8; 2]),
            Err(StorageError::OutOfRange)
        );
        // Failed writes leave content and wear counter untouched
        assert_eq!(storage.write_count(), 0);
        assert!(storage.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_ram_storage_from_image() {
        let mut image = [0xFFu8; 8];
        image[0] = 0x00;
        image[4..8].copy_from_slice(&[0x10, 0x00, 0x20, 0x00]);

        let mut storage = RamStorage::from_bytes(image);
        assert_eq!(storage.read_byte(0), Ok(0x00));
        let mut buf = [0u8; 4];
        storage.read(4, &mut buf).unwrap();
        assert_eq!(buf, [0x10, 0x00, 0x20, 0x00]);
        assert_eq!(storage.as_bytes(), &image);
        assert_eq!(storage.write_count(), 0);
    }

    #[cfg(feature = "embedded-storage")]
    mod device {
        use super::super::*;
        use embedded_storage::{ReadStorage, Storage};

        /// EEPROM model that fails on any access past its end
        struct Eeprom {
            bytes: [u8; 16],
        }

        #[derive(Debug)]
        struct Fault;

        impl ReadStorage for Eeprom {
            type Error = Fault;

            fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
                let start = offset as usize;
                let src = self.bytes.get(start..start + bytes.len()).ok_or(Fault)?;
                bytes.copy_from_slice(src);
                Ok(())
            }

            fn capacity(&self) -> usize {
                self.bytes.len()
            }
        }

        impl Storage for Eeprom {
            fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
                let start = offset as usize;
                let dst = self.bytes.get_mut(start..start + bytes.len()).ok_or(Fault)?;
                dst.copy_from_slice(bytes);
                Ok(())
            }
        }

        #[test]
        fn test_storage_device_read_write() {
            let mut device = StorageDevice(Eeprom { bytes: [0xFF; 16] });
            assert_eq!(device.capacity(), 16);

            device.write(2, &[1, 2, 3]).unwrap();
            let mut buf = [0u8; 3];
            device.read(2, &mut buf).unwrap();
            assert_eq!(buf, [1, 2, 3]);
            assert_eq!(device.write_byte(15, 0x00), Ok(()));
            assert_eq!(device.read_byte(15), Ok(0x00));
        }

        #[test]
        fn test_storage_device_rejects_out_of_range() {
            let mut device = StorageDevice(Eeprom { bytes: [0xFF; 16] });
            assert_eq!(device.write(14, &[0; 4]), Err(StorageError::OutOfRange));
            assert_eq!(device.read_byte(16), Err(StorageError::OutOfRange));
            assert_eq!(
                device.read(usize::MAX, &mut [0u8; 1]),
                Err(StorageError::OutOfRange)
            );
            // Guard runs before the device is touched
            assert!(device.0.bytes.iter().all(|&b| b == 0xFF));
        }
    }
}
