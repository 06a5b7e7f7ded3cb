//! Native cache maintenance.
//!
//! x86 keeps instruction fetch coherent with stores, so only ordering is
//! enforced there. aarch64 and riscv64 need explicit maintenance before freshly
//! written code may be fetched.

use core::sync::atomic::{compiler_fence, fence, Ordering};

/// Make prior stores to code memory complete before anything that follows.
#[inline]
pub fn flush_data_cache() {
    compiler_fence(Ordering::SeqCst);
    arch::data_barrier();
}

/// Invalidate `start..start + len` in the instruction cache.
///
/// # Safety
/// The range must be mapped in the calling process.
#[inline]
pub unsafe fn flush_instruction_cache(start: *const u8, len: usize) {
    compiler_fence(Ordering::SeqCst);
    if len != 0 {
        arch::sync_icache(start, len);
    }
    fence(Ordering::SeqCst);
}

#[cfg(all(target_arch = "aarch64", not(target_vendor = "apple")))]
mod arch {
    use core::arch::asm;

    /// (dcache line, icache line) from CTR_EL0, which EL0 may read on Linux.
    #[inline]
    fn line_sizes() -> (usize, usize) {
        let ctr: u64;
        unsafe {
            asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack, preserves_flags));
        }
        let dline = 4usize << ((ctr >> 16) & 0xf);
        let iline = 4usize << (ctr & 0xf);
        (dline, iline)
    }

    #[inline]
    pub fn data_barrier() {
        unsafe {
            asm!("dsb ish", options(nostack, preserves_flags));
        }
    }

    pub unsafe fn sync_icache(start: *const u8, len: usize) {
        let (dline, iline) = line_sizes();
        let begin = start as usize;
        let end = begin.saturating_add(len);

        // Clean to the point of unification, then invalidate the icache lines.
        let mut addr = begin & !(dline - 1);
        while addr < end {
            asm!("dc cvau, {}", in(reg) addr, options(nostack, preserves_flags));
            addr += dline;
        }
        asm!("dsb ish", options(nostack, preserves_flags));

        let mut addr = begin & !(iline - 1);
        while addr < end {
            asm!("ic ivau, {}", in(reg) addr, options(nostack, preserves_flags));
            addr += iline;
        }
        asm!("dsb ish", "isb", options(nostack, preserves_flags));
    }
}

#[cfg(all(target_arch = "aarch64", target_vendor = "apple"))]
mod arch {
    use core::arch::asm;
    use core::ffi::c_void;

    extern "C" {
        fn sys_icache_invalidate(start: *mut c_void, len: usize);
    }

    #[inline]
    pub fn data_barrier() {
        unsafe {
            asm!("dsb ish", options(nostack, preserves_flags));
        }
    }

    pub unsafe fn sync_icache(start: *const u8, len: usize) {
        sys_icache_invalidate(start as *mut c_void, len);
    }
}

#[cfg(target_arch = "riscv64")]
mod arch {
    use core::arch::asm;

    #[inline]
    pub fn data_barrier() {
        unsafe {
            asm!("fence rw, rw", options(nostack));
        }
    }

    /// `riscv_flush_icache`; libc exports no constant for it.
    #[cfg(target_os = "linux")]
    const SYS_RISCV_FLUSH_ICACHE: libc::c_long = 259;

    pub unsafe fn sync_icache(start: *const u8, len: usize) {
        // fence.i is not ranged and only covers the local hart.
        asm!("fence.i", options(nostack));
        // The thread may migrate before it jumps in; have the kernel
        // synchronize every hart.
        #[cfg(target_os = "linux")]
        libc::syscall(
            SYS_RISCV_FLUSH_ICACHE,
            start as usize,
            (start as usize).saturating_add(len),
            0usize,
        );
        #[cfg(not(target_os = "linux"))]
        let _ = (start, len);
    }
}

#[cfg(not(any(target_arch = "aarch64", target_arch = "riscv64")))]
mod arch {
    use core::sync::atomic::{fence, Ordering};

    #[inline]
    pub fn data_barrier() {
        fence(Ordering::SeqCst);
    }

    #[inline]
    pub unsafe fn sync_icache(_start: *const u8, _len: usize) {
        fence(Ordering::SeqCst);
    }
}
