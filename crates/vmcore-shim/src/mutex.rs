use core::ptr::NonNull;

use crate::error::{Error, MutexOp, Result};
use crate::host::HostMutex;

/// Lifecycle of a host mutex stored in caller memory.
///
/// A handle must go through `init`, any number of `lock`/`unlock` pairs, then
/// `destroy`. Calls outside that window inherit whatever the host primitive
/// does, which is undefined. No ordering is added here: acquire on lock and
/// release on unlock are exactly the host primitive's.
pub struct MutexAdapter<'h, H: HostMutex + ?Sized> {
    host: &'h H,
}

impl<'h, H: HostMutex + ?Sized> MutexAdapter<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }

    fn call(
        &self,
        op: MutexOp,
        handle: *mut H::Raw,
        f: unsafe fn(&H, NonNull<H::Raw>) -> bool,
    ) -> Result<()> {
        let raw = NonNull::new(handle).ok_or(Error::NullHandle)?;
        if unsafe { f(self.host, raw) } {
            Ok(())
        } else {
            log::warn!("mutex {op} on {:p} refused by host", handle);
            Err(Error::Mutex(op))
        }
    }

    /// # Safety
    /// `handle` must point to writable storage for `H::Raw` that no other
    /// thread is using.
    pub unsafe fn init(&self, handle: *mut H::Raw) -> Result<()> {
        self.call(MutexOp::Init, handle, H::init)
    }

    /// # Safety
    /// `handle` must have been initialized and not yet destroyed.
    pub unsafe fn destroy(&self, handle: *mut H::Raw) -> Result<()> {
        self.call(MutexOp::Destroy, handle, H::destroy)
    }

    /// Block until the calling thread holds the mutex.
    ///
    /// # Safety
    /// `handle` must have been initialized and not yet destroyed.
    pub unsafe fn lock(&self, handle: *mut H::Raw) -> Result<()> {
        self.call(MutexOp::Lock, handle, H::lock)
    }

    /// # Safety
    /// `handle` must have been initialized and not yet destroyed.
    pub unsafe fn unlock(&self, handle: *mut H::Raw) -> Result<()> {
        self.call(MutexOp::Unlock, handle, H::unlock)
    }
}
