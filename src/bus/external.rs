//! Bus lock backed by an `extern "C"` semaphore pair, for firmware that
//! already has one wired up for the bus this device sits on (e.g. the board
//! support package's `spi_lock`/`spi_unlock`).

use core::cell::Cell;
use core::marker::PhantomData;

extern "C" {
    fn kfs_bus_lock();
    fn kfs_bus_unlock();
}

pub struct Bus {
    // Purely to make `Bus` !Sync-by-default-derive-safe without pulling in
    // extra state; the actual exclusion lives in the C semaphore.
    _marker: Cell<()>,
}

// The C side promises the semaphore itself provides the exclusion.
unsafe impl Sync for Bus {}

impl Bus {
    pub fn new() -> Self {
        Self { _marker: Cell::new(()) }
    }

    pub fn lock(&self) -> BusGuard<'_> {
        unsafe { kfs_bus_lock() };
        BusGuard { _bus: PhantomData }
    }
}

pub struct BusGuard<'a> {
    _bus: PhantomData<&'a Bus>,
}

impl<'a> Drop for BusGuard<'a> {
    fn drop(&mut self) {
        unsafe { kfs_bus_unlock() };
    }
}
