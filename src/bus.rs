//! The shared-bus lock (§5, §6, §9).
//!
//! The block device sits on a bus shared with other peripherals, so every
//! public file call must bracket its sector I/O with an acquire/release pair
//! around the *bus*, not just around this crate's own state. `original_source`
//! did this by hand with `spi_lock`/`spi_unlock` calls, and got it wrong once
//! (`kfs_write` unlocked before ever locking — see §9). Here the acquire and
//! the release are tied to a value's lifetime instead of to two independent
//! call sites, so there is no call site left that can desync the pair.
//!
//! The backend is selected the same way `mutex.rs` selects its `Mutex` type:
//! a real OS mutex on host builds, an `extern "C"` semaphore pair when this
//! crate is linked into firmware that provides one, or a Cortex-M
//! critical section when neither is available.

cfg_if::cfg_if! {
    if #[cfg(feature = "external_mutex")] {
        mod external;
        pub use external::{Bus, BusGuard};
    } else if #[cfg(all(target_arch = "arm", feature = "no_std"))] {
        mod bare_metal;
        pub use bare_metal::{Bus, BusGuard};
    } else if #[cfg(not(feature = "no_std"))] {
        mod std_bus;
        pub use std_bus::{Bus, BusGuard};
    } else {
        compile_error!("Please enable the `external_mutex` feature and provide \
            a bus lock implementation.");
    }
}
