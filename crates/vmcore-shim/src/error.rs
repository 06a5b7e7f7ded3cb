use core::ffi::c_int;

/// Mutex operation that the host primitive refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexOp {
    Init,
    Destroy,
    Lock,
    Unlock,
}

impl core::fmt::Display for MutexOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            MutexOp::Init => "init",
            MutexOp::Destroy => "destroy",
            MutexOp::Lock => "lock",
            MutexOp::Unlock => "unlock",
        };
        f.write_str(name)
    }
}

/// Everything an adapter can report before the C boundary collapses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("zero-size request rejected")]
    ZeroSize,

    #[error("size {0:#x} overflows when rounded up to the page size")]
    SizeOverflow(usize),

    #[error("address {0:#x} is not page aligned")]
    Misaligned(usize),

    #[error("null mutex handle")]
    NullHandle,

    #[error("host allocator could not provide {size} bytes")]
    OutOfMemory { size: usize },

    #[error("host refused to map {size} bytes")]
    MapFailed { size: usize },

    #[error("host refused to change protection of {size} bytes at {addr:#x}")]
    ProtectFailed { addr: usize, size: usize },

    #[error("host mutex {0} failed")]
    Mutex(MutexOp),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Two-valued status code handed to the runtime. The cause of a failure is
/// dropped here on purpose: the runtime only ever tests for zero.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    Failure = 1,
}

impl Status {
    #[inline]
    pub const fn code(self) -> c_int {
        self as c_int
    }
}

impl<T> From<Result<T>> for Status {
    #[inline]
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(_) => Status::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_polarity() {
        assert_eq!(Status::from(Ok::<(), Error>(())).code(), 0);
        assert_eq!(Status::from(Err::<(), Error>(Error::ZeroSize)).code(), 1);
        assert_eq!(Status::from(Err::<(), Error>(Error::Mutex(MutexOp::Lock))).code(), 1);
    }

    #[test]
    fn messages_name_the_operation() {
        assert_eq!(Error::Mutex(MutexOp::Unlock).to_string(), "host mutex unlock failed");
        assert_eq!(Error::Misaligned(0x1001).to_string(), "address 0x1001 is not page aligned");
    }
}
