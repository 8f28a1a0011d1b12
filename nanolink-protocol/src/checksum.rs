//! Two-byte running additive checksum
//!
//! `ck_a` is the byte sum and `ck_b` the sum of the running `ck_a` values,
//! both modulo 256. Order-sensitive, no seed.
//!
//! Not CRC strength. Known blind spot: flipping the top bit of two bytes
//! whose positions differ by an even amount changes `ck_a` by 256 and
//! `ck_b` by a multiple of 256, so `[0x01, 0x02, 0x03]` and
//! `[0x81, 0x02, 0x83]` collide.

/// Checksum length on the wire
pub const CHECKSUM_LEN: usize = 2;

/// Running checksum state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum {
    pub ck_a: u8,
    pub ck_b: u8,
}

impl Checksum {
    pub const fn new() -> Self {
        Self { ck_a: 0, ck_b: 0 }
    }

    /// Fold one byte into the checksum
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    /// Fold a slice into the checksum
    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// Checksum of a complete byte sequence
    pub fn compute(bytes: &[u8]) -> Self {
        let mut checksum = Self::new();
        checksum.update_slice(bytes);
        checksum
    }

    /// Wire representation, `ck_a` first
    pub const fn to_bytes(self) -> [u8; CHECKSUM_LEN] {
        [self.ck_a, self.ck_b]
    }

    /// Compare against the two trailing bytes of a frame
    pub fn matches(self, received: &[u8]) -> bool {
        received == self.to_bytes()
    }
}
