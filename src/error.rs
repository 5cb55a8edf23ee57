//! The disk-state / error taxonomy (§4.1, §7).
//!
//! `DiskState::Success` doubles as "no error" and as a value of the mount
//! predicate; everything else is a terminal or caller-error outcome that a
//! public call can leave behind in `Kfs::state()`.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DiskState {
    Success,
    BadDisk,
    WriteError,
    ReadError,
    SeekError,

    BadVersion,
    Unformatted,
    MismatchSectorCount,

    UnknownFile,
    NotInstalled,
}

impl DiskState {
    /// Three of the ten states are recoverable by reformatting (§4.2, §4.5,
    /// §4.10): the disk answered but its superblock doesn't match what we
    /// expect.
    pub fn is_recoverable_by_format(self) -> bool {
        matches!(
            self,
            DiskState::Unformatted | DiskState::BadVersion | DiskState::MismatchSectorCount
        )
    }

    pub fn is_success(self) -> bool {
        matches!(self, DiskState::Success)
    }

    /// `kfs_strerror` equivalent.
    pub fn as_str(self) -> &'static str {
        match self {
            DiskState::Success => "KFS_SUCCESS",
            DiskState::BadDisk => "KFS_BADDISK",
            DiskState::WriteError => "KFS_WRITE_ERROR",
            DiskState::ReadError => "KFS_READ_ERROR",
            DiskState::SeekError => "KFS_SEEK_ERROR",
            DiskState::BadVersion => "KFS_BAD_VERSION",
            DiskState::Unformatted => "KFS_UNFORMATTED",
            DiskState::MismatchSectorCount => "KFS_MISMATCH_SECTOR_COUNT",
            DiskState::UnknownFile => "KFS_UNKNOWN_FILE",
            DiskState::NotInstalled => "KFS_NOT_INSTALLED",
        }
    }
}

impl fmt::Display for DiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(not(feature = "no_std"))]
impl std::error::Error for DiskState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_set() {
        assert!(DiskState::Unformatted.is_recoverable_by_format());
        assert!(DiskState::BadVersion.is_recoverable_by_format());
        assert!(DiskState::MismatchSectorCount.is_recoverable_by_format());
        assert!(!DiskState::BadDisk.is_recoverable_by_format());
        assert!(!DiskState::Success.is_recoverable_by_format());
    }

    #[test]
    fn strerror_matches_names() {
        assert_eq!(DiskState::NotInstalled.as_str(), "KFS_NOT_INSTALLED");
        assert_eq!(DiskState::Success.to_string(), "KFS_SUCCESS");
    }
}
