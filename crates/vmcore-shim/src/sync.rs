use core::sync::atomic::{AtomicI32, Ordering};

const UNLOCKED: i32 = 0;
const LOCKED: i32 = 1;
const CONTENDED: i32 = 2;

/// The native host's mutex primitive: a futex word on Linux, a yielding spin
/// elsewhere. This is what `korp_mutex` holds when the native host is linked.
///
/// Allocation-free and `repr(C)` so the runtime can embed it in its own
/// structures as a plain 32-bit integer.
#[repr(C)]
pub struct RawMutex {
    /// 0 = unlocked, 1 = locked no waiters, 2 = locked with waiters
    state: AtomicI32,
}

unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicI32::new(UNLOCKED),
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }

    #[inline]
    pub fn lock(&self) {
        // Fast path: uncontended
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        self.lock_slow();
    }

    #[cold]
    fn lock_slow(&self) {
        loop {
            let old = self.state.swap(CONTENDED, Ordering::Acquire);
            if old == UNLOCKED {
                return;
            }
            #[cfg(target_os = "linux")]
            unsafe {
                libc::syscall(
                    libc::SYS_futex,
                    &self.state as *const AtomicI32,
                    libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                    CONTENDED,
                    core::ptr::null::<libc::timespec>(),
                );
            }
            #[cfg(not(target_os = "linux"))]
            {
                core::hint::spin_loop();
                std::thread::yield_now();
            }
        }
    }

    /// Release the mutex. Returns false if it was not held.
    #[inline]
    pub fn unlock(&self) -> bool {
        let old = self.state.swap(UNLOCKED, Ordering::Release);
        match old {
            UNLOCKED => false,
            LOCKED => true,
            _ => {
                self.wake_one();
                true
            }
        }
    }

    #[cold]
    fn wake_one(&self) {
        #[cfg(target_os = "linux")]
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                &self.state as *const AtomicI32,
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
            );
        }
    }
}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_unlock_tracks_state() {
        let m = RawMutex::new();
        assert!(!m.is_locked());
        m.lock();
        assert!(m.is_locked());
        assert!(m.unlock());
        assert!(!m.is_locked());
    }

    #[test]
    fn unlock_without_lock_reports_failure() {
        let m = RawMutex::new();
        assert!(!m.unlock());
        assert!(!m.is_locked());
    }

    #[test]
    fn contended_waiter_is_woken() {
        let m = Arc::new(RawMutex::new());
        m.lock();
        let waiter = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                m.lock();
                assert!(m.unlock());
            })
        };
        thread::sleep(std::time::Duration::from_millis(20));
        assert!(m.unlock());
        waiter.join().expect("waiter panicked");
        assert!(!m.is_locked());
    }
}
