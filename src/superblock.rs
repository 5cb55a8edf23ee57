//! The superblock (sector 0) and the four-file table (§3).
//!
//! `Superblock` is the in-memory mirror of sector 0; it is (de)serialized by
//! hand to the exact little-endian, unpadded layout §3 specifies, the same
//! way `fat/boot_sector.rs` hand-parses a BIOS Parameter Block field by
//! field rather than relying on `#[repr(C)]` struct layout matching the
//! wire format.

use core::convert::TryInto;

use crate::port::SECTOR_SIZE;

pub const MAGIC: [u8; 4] = *b"KFS\0";
pub const VERSION: [u8; 4] = *b"0.1\0";

pub const NUM_FILES: usize = 4;

/// One of the four fixed file roles (§6), in on-disk index order.
///
/// The Design Notes call for the static file table to be "expressed as a
/// compile-time-sized collection indexed by a small named enumeration of
/// file roles, not as a dynamic container" — this is that enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileId {
    Firmware = 0,
    Config = 1,
    Event = 2,
    Log = 3,
}

impl FileId {
    pub const ALL: [FileId; NUM_FILES] = [FileId::Firmware, FileId::Config, FileId::Event, FileId::Log];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl core::convert::TryFrom<u32> for FileId {
    type Error = crate::error::DiskState;

    fn try_from(fd: u32) -> Result<Self, Self::Error> {
        match fd {
            0 => Ok(FileId::Firmware),
            1 => Ok(FileId::Config),
            2 => Ok(FileId::Event),
            3 => Ok(FileId::Log),
            _ => Err(crate::error::DiskState::UnknownFile),
        }
    }
}

/// Compile-time sizes from §6. `Log` takes whatever sectors remain.
pub const FIRMWARE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const CONFIG_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const EVENT_SIZE_BYTES: u64 = 200 * 1024 * 1024;

/// A file descriptor (56 bytes on disk, §3): one of the four fixed files'
/// circular-buffer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileDescriptor {
    pub sector_start: u64,
    pub sector_count: u64,
    pub start_index: u64,
    pub read_index: u64,
    pub write_index: u64,
    pub file_size: u64,
    pub allocated_bytes: u64,
}

pub const FILE_DESCRIPTOR_BYTES: usize = 7 * 8;

impl FileDescriptor {
    fn read_le(bytes: &[u8]) -> Self {
        macro_rules! field {
            ($offset:literal) => {
                u64::from_le_bytes(bytes[$offset..$offset + 8].try_into().unwrap())
            };
        }

        Self {
            sector_start: field!(0),
            sector_count: field!(8),
            start_index: field!(16),
            read_index: field!(24),
            write_index: field!(32),
            file_size: field!(40),
            allocated_bytes: field!(48),
        }
    }

    fn write_le(&self, bytes: &mut [u8]) {
        bytes[0..8].copy_from_slice(&self.sector_start.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.sector_count.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.start_index.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.read_index.to_le_bytes());
        bytes[32..40].copy_from_slice(&self.write_index.to_le_bytes());
        bytes[40..48].copy_from_slice(&self.file_size.to_le_bytes());
        bytes[48..56].copy_from_slice(&self.allocated_bytes.to_le_bytes());
    }

    /// True when the buffer holds no valid bytes.
    pub fn is_empty(&self) -> bool {
        self.read_index == self.write_index && self.file_size == 0
    }

    /// True when the one-byte reserved gap (§4.6) is the only free space left.
    pub fn is_full(&self) -> bool {
        self.file_size == self.allocated_bytes - 1
    }
}

/// The in-memory mirror of sector 0 (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub sector_count: u64,
    pub files: [FileDescriptor; NUM_FILES],
}

impl Superblock {
    /// Lays out a fresh superblock for a device reporting `sector_count`
    /// sectors (§4.3): sector 0 reserved, then firmware, config, event, and
    /// finally log taking the remainder.
    pub fn format(sector_count: u64) -> Self {
        let mut files = [FileDescriptor::default(); NUM_FILES];
        let mut sectors_used = 1u64;

        let sizes = [
            FIRMWARE_SIZE_BYTES / SECTOR_SIZE as u64,
            CONFIG_SIZE_BYTES / SECTOR_SIZE as u64,
            EVENT_SIZE_BYTES / SECTOR_SIZE as u64,
        ];

        for (idx, &size_sectors) in sizes.iter().enumerate() {
            files[idx] = FileDescriptor {
                sector_start: sectors_used,
                sector_count: size_sectors,
                start_index: 0,
                read_index: 0,
                write_index: 0,
                file_size: 0,
                allocated_bytes: size_sectors * SECTOR_SIZE as u64,
            };
            sectors_used += size_sectors;
        }

        let log_sectors = sector_count.saturating_sub(sectors_used);
        files[FileId::Log.index()] = FileDescriptor {
            sector_start: sectors_used,
            sector_count: log_sectors,
            start_index: 0,
            read_index: 0,
            write_index: 0,
            file_size: 0,
            allocated_bytes: log_sectors * SECTOR_SIZE as u64,
        };

        Self { sector_count, files }
    }

    pub fn to_sector(&self) -> [u8; SECTOR_SIZE] {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[0..4].copy_from_slice(&MAGIC);
        sector[4..8].copy_from_slice(&VERSION);
        sector[8..16].copy_from_slice(&self.sector_count.to_le_bytes());

        for (idx, file) in self.files.iter().enumerate() {
            let start = 16 + idx * FILE_DESCRIPTOR_BYTES;
            file.write_le(&mut sector[start..start + FILE_DESCRIPTOR_BYTES]);
        }

        sector
    }

    /// Parses sector 0, validating magic/version/sector-count in the fixed
    /// order §4.2 specifies.
    pub fn from_sector(
        sector: &[u8; SECTOR_SIZE],
        reported_sector_count: u64,
    ) -> Result<Self, crate::error::DiskState> {
        use crate::error::DiskState;

        if sector[0..4] != MAGIC {
            return Err(DiskState::Unformatted);
        }
        if sector[4..8] != VERSION {
            return Err(DiskState::BadVersion);
        }

        let sector_count = u64::from_le_bytes(sector[8..16].try_into().unwrap());
        if sector_count != reported_sector_count {
            return Err(DiskState::MismatchSectorCount);
        }

        let mut files = [FileDescriptor::default(); NUM_FILES];
        for (idx, file) in files.iter_mut().enumerate() {
            let start = 16 + idx * FILE_DESCRIPTOR_BYTES;
            *file = FileDescriptor::read_le(&sector[start..start + FILE_DESCRIPTOR_BYTES]);
        }

        Ok(Self { sector_count, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_scenario_1() {
        // §8 scenario 1: a 2,097,152-sector device.
        let sb = Superblock::format(2_097_152);
        assert_eq!(sb.files[FileId::Firmware.index()].sector_start, 1);
        assert_eq!(sb.files[FileId::Firmware.index()].sector_count, 20_480);
        assert_eq!(sb.files[FileId::Config.index()].sector_start, 20_481);
        assert_eq!(sb.files[FileId::Config.index()].sector_count, 204_800);
        assert_eq!(sb.files[FileId::Event.index()].sector_start, 225_281);
        assert_eq!(sb.files[FileId::Event.index()].sector_count, 409_600);
        assert_eq!(sb.files[FileId::Log.index()].sector_start, 634_881);
        assert_eq!(sb.files[FileId::Log.index()].sector_count, 1_462_271);
    }

    #[test]
    fn files_are_contiguous_and_disjoint() {
        let sb = Superblock::format(2_097_152);
        for pair in sb.files.windows(2) {
            assert_eq!(pair[0].sector_start + pair[0].sector_count, pair[1].sector_start);
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let sb = Superblock::format(65536);
        let sector = sb.to_sector();
        let parsed = Superblock::from_sector(&sector, 65536).unwrap();
        assert_eq!(sb, parsed);
    }

    #[test]
    fn zeroed_sector_is_unformatted() {
        let sector = [0u8; SECTOR_SIZE];
        assert_eq!(
            Superblock::from_sector(&sector, 65536).unwrap_err(),
            crate::error::DiskState::Unformatted
        );
    }

    #[test]
    fn bumped_version_byte_is_bad_version() {
        let sb = Superblock::format(65536);
        let mut sector = sb.to_sector();
        sector[4] = b'1'; // was '0'
        assert_eq!(
            Superblock::from_sector(&sector, 65536).unwrap_err(),
            crate::error::DiskState::BadVersion
        );
    }

    #[test]
    fn stale_sector_count_mismatches() {
        let sb = Superblock::format(65536);
        let sector = sb.to_sector();
        assert_eq!(
            Superblock::from_sector(&sector, 65537).unwrap_err(),
            crate::error::DiskState::MismatchSectorCount
        );
    }
}
