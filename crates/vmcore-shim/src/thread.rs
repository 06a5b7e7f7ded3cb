use core::fmt;
use core::ptr::NonNull;

use crate::config::Config;
use crate::host::HostThread;

/// Opaque identifier of the calling thread, for log correlation only.
/// Never use it to decide ownership of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ThreadId(usize);

impl ThreadId {
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

pub struct ThreadContext<'h, T: HostThread + ?Sized> {
    host: &'h T,
    stack_reserve: usize,
    stack_boundary: bool,
}

impl<'h, T: HostThread + ?Sized> ThreadContext<'h, T> {
    pub fn new(host: &'h T, config: &Config) -> Self {
        Self {
            host,
            stack_reserve: config.stack_reserve,
            stack_boundary: config.stack_boundary,
        }
    }

    pub fn current_thread_id(&self) -> ThreadId {
        ThreadId(self.host.current_thread_id())
    }

    /// Address below which the calling thread's native stack must not grow.
    ///
    /// `None` is a valid answer: the runtime then runs without native stack
    /// overflow detection rather than failing.
    pub fn current_stack_boundary(&self) -> Option<NonNull<u8>> {
        if !self.stack_boundary {
            log::debug!("stack boundary reporting disabled by configuration");
            return None;
        }
        let limit = self.host.stack_limit();
        if limit.is_none() {
            log::debug!(
                "{}: host cannot describe the stack, overflow detection is off",
                self.current_thread_id()
            );
        }
        let limit = limit?;
        match (limit.as_ptr() as usize).checked_add(self.stack_reserve) {
            Some(boundary) => NonNull::new(boundary as *mut u8),
            None => {
                log::debug!(
                    "stack reserve {:#x} overflows limit {:p}, overflow detection is off",
                    self.stack_reserve,
                    limit
                );
                None
            }
        }
    }

    pub fn thread_cpu_time_us(&self) -> u64 {
        self.host.thread_cpu_time_us()
    }
}
