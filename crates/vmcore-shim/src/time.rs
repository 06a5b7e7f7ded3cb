use crate::host::HostClock;

/// Boot-relative microsecond clock. Monotonic as long as the host clock is.
pub struct TimeSource<'h, C: HostClock + ?Sized> {
    host: &'h C,
}

impl<'h, C: HostClock + ?Sized> TimeSource<'h, C> {
    pub fn new(host: &'h C) -> Self {
        Self { host }
    }

    #[inline]
    pub fn boot_time_us(&self) -> u64 {
        self.host.boot_time_us()
    }
}
