//! Sector-level I/O engine (§4.7, §4.8): the one-shot retry policy, and the
//! byte-range-to-sector translation that turns a `(file, byte_offset,
//! length)` request into a sequence of sector reads/writes.
//!
//! Everything here is unaware of circular-buffer wraparound; `fs.rs` is the
//! layer that splits a wrapping request into at most two calls into this
//! module, each of which sees a flat, non-wrapping byte range.

use crate::cache::SectorCache;
use crate::error::DiskState;
use crate::port::{BlockDevice, Event, SectorBuf, SECTOR_SIZE};
use crate::superblock::FileDescriptor;

/// Reads one sector, retrying exactly once on failure (§4.8). Logs
/// [`Event::ReadRetrySucceeded`] only when the retry is the one that
/// succeeded, never on a first-try success or on a double failure.
pub(crate) fn read_sector_retry<D: BlockDevice>(
    device: &mut D,
    buf: &mut SectorBuf,
    sector: u32,
) -> Result<(), DiskState> {
    if device.read_sector(buf, sector, 1).is_ok() {
        return Ok(());
    }
    if device.read_sector(buf, sector, 1).is_ok() {
        device.log_event(Event::ReadRetrySucceeded);
        log::debug!("sector {} read succeeded on retry", sector);
        return Ok(());
    }
    log::warn!("sector {} read failed twice", sector);
    Err(DiskState::BadDisk)
}

/// Writes one sector, retrying exactly once on failure (§4.8). Logs
/// [`Event::WriteRetrySucceeded`] only on a retry-success.
pub(crate) fn write_sector_retry<D: BlockDevice>(
    device: &mut D,
    buf: &SectorBuf,
    sector: u32,
) -> Result<(), DiskState> {
    if device.write_sector(buf, sector, 1).is_ok() {
        return Ok(());
    }
    if device.write_sector(buf, sector, 1).is_ok() {
        device.log_event(Event::WriteRetrySucceeded);
        log::debug!("sector {} write succeeded on retry", sector);
        return Ok(());
    }
    log::warn!("sector {} write failed twice", sector);
    Err(DiskState::BadDisk)
}

/// Reads `out.len()` bytes starting at `byte_offset` within `file`'s data
/// region, using and populating `cache` as it goes. Returns the number of
/// bytes actually read, which is less than `out.len()` only when the
/// request ran past `file.allocated_bytes`.
pub fn internal_read<D: BlockDevice>(
    device: &mut D,
    cache: &mut SectorCache,
    file: &FileDescriptor,
    byte_offset: u64,
    out: &mut [u8],
) -> Result<usize, DiskState> {
    if byte_offset >= file.allocated_bytes {
        return Ok(0);
    }
    let length = (out.len() as u64).min(file.allocated_bytes - byte_offset) as usize;
    let out = &mut out[..length];

    let mut done = 0usize;
    let mut offset = byte_offset;

    while done < length {
        let sector_index = offset / SECTOR_SIZE as u64;
        let sector_in_file_offset = (offset % SECTOR_SIZE as u64) as usize;
        let sector_number = file.sector_start + sector_index;
        let take = (SECTOR_SIZE - sector_in_file_offset).min(length - done);

        if let Some(cached) = cache.get(sector_number) {
            out[done..done + take].copy_from_slice(&cached[sector_in_file_offset..sector_in_file_offset + take]);
        } else {
            let mut buf = [0u8; SECTOR_SIZE];
            read_sector_retry(device, &mut buf, sector_number as u32)?;
            out[done..done + take].copy_from_slice(&buf[sector_in_file_offset..sector_in_file_offset + take]);
            cache.store(sector_number, &buf);
        }

        done += take;
        offset += take as u64;
    }

    Ok(done)
}

/// Writes `data` starting at `byte_offset` within `file`'s data region.
/// Invalidates `cache` first (the original does the same, unconditionally,
/// rather than tracking which sector a partial write touched), then
/// read-modify-writes every sector the range touches -- including sectors
/// written in full, since a write can't tell in general whether the rest of
/// a "full" sector write actually covers a previously-unwritten tail.
pub fn internal_write<D: BlockDevice>(
    device: &mut D,
    cache: &mut SectorCache,
    file: &FileDescriptor,
    byte_offset: u64,
    data: &[u8],
) -> Result<usize, DiskState> {
    cache.invalidate();

    if byte_offset >= file.allocated_bytes {
        return Ok(0);
    }
    let length = (data.len() as u64).min(file.allocated_bytes - byte_offset) as usize;
    let data = &data[..length];

    let mut done = 0usize;
    let mut offset = byte_offset;

    while done < length {
        let sector_index = offset / SECTOR_SIZE as u64;
        let sector_in_file_offset = (offset % SECTOR_SIZE as u64) as usize;
        let sector_number = file.sector_start + sector_index;
        let take = (SECTOR_SIZE - sector_in_file_offset).min(length - done);

        let mut buf = [0u8; SECTOR_SIZE];
        if take < SECTOR_SIZE {
            read_sector_retry(device, &mut buf, sector_number as u32)?;
        }
        buf[sector_in_file_offset..sector_in_file_offset + take].copy_from_slice(&data[done..done + take]);
        write_sector_retry(device, &buf, sector_number as u32)?;

        done += take;
        offset += take as u64;
    }

    Ok(done)
}
