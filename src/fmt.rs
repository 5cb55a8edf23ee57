//! Human-readable byte-count formatting, for [`crate::Kfs::print_stats`].
//!
//! Reproduces `original_source`'s `kfs_size_str` ladder exactly: whole bytes
//! under 1024, then whole kilobytes, then whole megabytes -- and no further.
//! A multi-gigabyte log partition still prints in megabytes, because that's
//! what the device this was written for did.

use core::fmt;

const KI: u64 = 1024;
const MI: u64 = 1024 * 1024;

/// Writes `bytes` as `<n>b`, `<n>k`, or `<n>m`, truncating (not rounding) at
/// each step, matching the original's `sprintf("%4lld%c", n, suffix)`.
pub fn human_size(bytes: u64, out: &mut dyn fmt::Write) -> fmt::Result {
    if bytes < KI {
        write!(out, "{}b", bytes)
    } else if bytes < MI {
        write!(out, "{}k", bytes / KI)
    } else {
        write!(out, "{}m", bytes / MI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(bytes: u64) -> std::string::String {
        let mut s = std::string::String::new();
        human_size(bytes, &mut s).unwrap();
        s
    }

    #[test]
    fn bytes_ladder() {
        assert_eq!(render(0), "0b");
        assert_eq!(render(1023), "1023b");
        assert_eq!(render(1024), "1k");
    }

    #[test]
    fn kilobytes_ladder() {
        assert_eq!(render(2048), "2k");
        assert_eq!(render(1024 * 1024 - 1), "1023k");
    }

    #[test]
    fn megabytes_ladder_never_reaches_gigabytes() {
        assert_eq!(render(1024 * 1024), "1m");
        assert_eq!(render(200 * 1024 * 1024), "200m");
        assert_eq!(render(10u64 * 1024 * 1024 * 1024), "10240m");
    }
}
