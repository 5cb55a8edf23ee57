use std::sync::Mutex;

pub struct Bus(Mutex<()>);

impl Bus {
    pub fn new() -> Self {
        Self(Mutex::new(()))
    }

    pub fn lock(&self) -> BusGuard<'_> {
        BusGuard(self.0.lock().unwrap())
    }
}

pub struct BusGuard<'a>(std::sync::MutexGuard<'a, ()>);
