//! Bus lock for bare-metal Cortex-M targets with no OS and no external
//! semaphore: the bus is shared only with other code running on this same
//! core, so a critical section (interrupts masked) is sufficient exclusion.

use core::cell::Cell;
use core::marker::PhantomData;
use cortex_m::interrupt;
use cortex_m::register::primask::Primask;

pub struct Bus {
    _marker: Cell<()>,
}

unsafe impl Sync for Bus {}

impl Bus {
    pub fn new() -> Self {
        Self { _marker: Cell::new(()) }
    }

    pub fn lock(&self) -> BusGuard<'_> {
        let restore = cortex_m::register::primask::read();
        interrupt::disable();
        BusGuard { _bus: PhantomData, restore }
    }
}

pub struct BusGuard<'a> {
    _bus: PhantomData<&'a Bus>,
    restore: Primask,
}

impl<'a> Drop for BusGuard<'a> {
    fn drop(&mut self) {
        if self.restore.is_active() {
            unsafe { interrupt::enable() };
        }
    }
}
