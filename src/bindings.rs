//! C bindings: a [`BlockDevice`] that forwards straight to `extern "C"`
//! functions shaped exactly like `kfs_port.h`, for linking this crate into
//! firmware that already has a sector port written in C.

use crate::port::{BlockDevice, Event};

extern "C" {
    fn kfs_get_sector_count() -> u32;
    fn kfs_disk_initialize() -> i32;
    fn kfs_read_sector(buff: *mut u8, sector: u32, count: u32) -> i32;
    fn kfs_write_sector(buff: *const u8, sector: u32, count: u32) -> i32;

    fn kfs_media_present() -> u8;
    fn kfs_uptime_ms() -> u32;
    fn kfs_log_event(event_number: u32);
}

const KFS_SUCCESS: i32 = -200;

/// A [`BlockDevice`] backed entirely by the `extern "C"` port a board
/// provides. Zero-sized: every method is a direct passthrough.
#[derive(Debug, Clone, Copy, Default)]
pub struct CBlockDevice;

impl CBlockDevice {
    pub fn new() -> Self {
        Self
    }
}

impl BlockDevice for CBlockDevice {
    type Error = i32;

    fn sector_count(&mut self) -> u32 {
        unsafe { kfs_get_sector_count() }
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        match unsafe { kfs_disk_initialize() } {
            KFS_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    fn read_sector(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<(), Self::Error> {
        match unsafe { kfs_read_sector(buf.as_mut_ptr(), sector, count) } {
            KFS_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    fn write_sector(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<(), Self::Error> {
        match unsafe { kfs_write_sector(buf.as_ptr(), sector, count) } {
            KFS_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    fn media_present(&mut self) -> bool {
        unsafe { kfs_media_present() != 0 }
    }

    fn uptime_ms(&mut self) -> u32 {
        unsafe { kfs_uptime_ms() }
    }

    fn log_event(&mut self, event: Event) {
        unsafe { kfs_log_event(event as u32) };
    }
}
