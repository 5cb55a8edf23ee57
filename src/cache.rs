//! Per-file sector read-cache (§4.9).
//!
//! Each of the four files gets exactly one scratch sector buffer and a tag
//! recording which sector (if any) that buffer currently holds. A read that
//! lands on the cached sector skips the device entirely; any write to the
//! file invalidates its tag unconditionally, since we don't track which byte
//! ranges within the sector changed.
//!
//! `original_source` encodes "no sector cached" as `sector_number == 0` with
//! every real sector number stored `+1`, so that zero-initialized memory
//! reads as invalid. `Option<u64>` says the same thing without the bias and
//! costs nothing extra (the spec's Design Notes permit either).

use crate::port::{SectorBuf, SECTOR_SIZE};

#[derive(Debug, Clone)]
pub struct SectorCache {
    tag: Option<u64>,
    buf: SectorBuf,
}

impl Default for SectorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorCache {
    pub fn new() -> Self {
        Self { tag: None, buf: [0u8; SECTOR_SIZE] }
    }

    pub fn invalidate(&mut self) {
        self.tag = None;
    }

    /// Returns the cached sector's bytes if `sector` is the one currently held.
    pub fn get(&self, sector: u64) -> Option<&SectorBuf> {
        if self.tag == Some(sector) {
            Some(&self.buf)
        } else {
            None
        }
    }

    pub fn store(&mut self, sector: u64, data: &SectorBuf) {
        self.tag = Some(sector);
        self.buf.copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_invalid() {
        let cache = SectorCache::new();
        assert!(cache.get(0).is_none());
    }

    #[test]
    fn hits_after_store() {
        let mut cache = SectorCache::new();
        let data = [7u8; SECTOR_SIZE];
        cache.store(42, &data);
        assert_eq!(cache.get(42), Some(&data));
        assert!(cache.get(43).is_none());
    }

    #[test]
    fn invalidate_clears_regardless_of_sector() {
        let mut cache = SectorCache::new();
        cache.store(0, &[1u8; SECTOR_SIZE]);
        cache.invalidate();
        assert!(cache.get(0).is_none());
    }
}
