//! A host that records every call and backs memory with the Rust allocator,
//! so adapter contracts can be checked without touching the real OS.

#![allow(dead_code)]

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use vmcore_shim::host::{HostAllocator, HostCache, HostClock, HostMemory, HostMutex, HostThread};
use vmcore_shim::{HostMapping, HostProtection};

pub const PAGE: usize = 4096;
pub const HEAP_ALIGN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Allocate(usize),
    Reallocate(usize),
    Deallocate,
    Map {
        hint: Option<usize>,
        size: usize,
        alignment: usize,
        protection: HostProtection,
        flags: HostMapping,
    },
    Unmap {
        addr: usize,
        size: usize,
    },
    Protect {
        addr: usize,
        size: usize,
        protection: HostProtection,
    },
    MutexInit,
    MutexDestroy,
    MutexLock,
    MutexUnlock,
    FlushData,
    FlushInstruction {
        start: usize,
        len: usize,
    },
}

/// Storage the runtime would reserve for one fake mutex.
#[derive(Debug, Default)]
pub struct FakeMutex {
    pub initialized: bool,
    pub locked: bool,
}

#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<Call>>,
    heap: Mutex<HashMap<usize, usize>>,
    /// address -> (size, current protection)
    regions: Mutex<HashMap<usize, (usize, HostProtection)>>,
    pub refuse_alloc: AtomicBool,
    pub refuse_map: AtomicBool,
    pub refuse_protect: AtomicBool,
    pub stack_limit: Option<usize>,
    clock: AtomicU64,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_limit(limit: usize) -> Self {
        Self {
            stack_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn protection_of(&self, addr: *mut u8) -> Option<HostProtection> {
        self.regions
            .lock()
            .unwrap()
            .get(&(addr as usize))
            .map(|(_, p)| *p)
    }

    pub fn is_mapped(&self, addr: *mut u8) -> bool {
        self.regions.lock().unwrap().contains_key(&(addr as usize))
    }

    pub fn live_regions(&self) -> usize {
        self.regions.lock().unwrap().len()
    }

    pub fn live_blocks(&self) -> usize {
        self.heap.lock().unwrap().len()
    }
}

impl HostAllocator for RecordingHost {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.record(Call::Allocate(size));
        if self.refuse_alloc.load(Ordering::Relaxed) {
            return None;
        }
        let layout = Layout::from_size_align(size, HEAP_ALIGN).ok()?;
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        self.heap.lock().unwrap().insert(ptr.as_ptr() as usize, size);
        Some(ptr)
    }

    unsafe fn reallocate(&self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
        self.record(Call::Reallocate(size));
        if self.refuse_alloc.load(Ordering::Relaxed) {
            return None;
        }
        let mut heap = self.heap.lock().unwrap();
        let old = heap.remove(&(ptr.as_ptr() as usize))?;
        let layout = Layout::from_size_align(old, HEAP_ALIGN).ok()?;
        let new = NonNull::new(alloc::realloc(ptr.as_ptr(), layout, size))?;
        heap.insert(new.as_ptr() as usize, size);
        Some(new)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        self.record(Call::Deallocate);
        let size = self
            .heap
            .lock()
            .unwrap()
            .remove(&(ptr.as_ptr() as usize))
            .expect("deallocate of unknown block");
        alloc::dealloc(ptr.as_ptr(), Layout::from_size_align(size, HEAP_ALIGN).unwrap());
    }
}

impl HostMemory for RecordingHost {
    fn page_size(&self) -> usize {
        PAGE
    }

    unsafe fn map(
        &self,
        hint: Option<NonNull<u8>>,
        size: usize,
        alignment: usize,
        protection: HostProtection,
        flags: HostMapping,
    ) -> Option<NonNull<u8>> {
        self.record(Call::Map {
            hint: hint.map(|h| h.as_ptr() as usize),
            size,
            alignment,
            protection,
            flags,
        });
        if self.refuse_map.load(Ordering::Relaxed) {
            return None;
        }
        assert_eq!(size % PAGE, 0, "host saw a non page-granular size");
        let layout = Layout::from_size_align(size, PAGE).ok()?;
        let ptr = NonNull::new(alloc::alloc_zeroed(layout))?;
        self.regions
            .lock()
            .unwrap()
            .insert(ptr.as_ptr() as usize, (size, protection));
        Some(ptr)
    }

    unsafe fn unmap(&self, addr: NonNull<u8>, size: usize) {
        self.record(Call::Unmap {
            addr: addr.as_ptr() as usize,
            size,
        });
        let (mapped, _) = self
            .regions
            .lock()
            .unwrap()
            .remove(&(addr.as_ptr() as usize))
            .expect("unmap of unknown region");
        assert_eq!(mapped, size, "unmap size differs from map size");
        alloc::dealloc(addr.as_ptr(), Layout::from_size_align(size, PAGE).unwrap());
    }

    unsafe fn protect(&self, addr: NonNull<u8>, size: usize, protection: HostProtection) -> bool {
        self.record(Call::Protect {
            addr: addr.as_ptr() as usize,
            size,
            protection,
        });
        if self.refuse_protect.load(Ordering::Relaxed) {
            return false;
        }
        match self.regions.lock().unwrap().get_mut(&(addr.as_ptr() as usize)) {
            Some(entry) => {
                entry.1 = protection;
                true
            }
            None => false,
        }
    }
}

impl HostMutex for RecordingHost {
    type Raw = FakeMutex;

    unsafe fn init(&self, raw: NonNull<FakeMutex>) -> bool {
        self.record(Call::MutexInit);
        raw.as_ptr().write(FakeMutex {
            initialized: true,
            locked: false,
        });
        true
    }

    unsafe fn destroy(&self, raw: NonNull<FakeMutex>) -> bool {
        self.record(Call::MutexDestroy);
        let m = &mut *raw.as_ptr();
        if !m.initialized || m.locked {
            return false;
        }
        m.initialized = false;
        true
    }

    unsafe fn lock(&self, raw: NonNull<FakeMutex>) -> bool {
        self.record(Call::MutexLock);
        let m = &mut *raw.as_ptr();
        if !m.initialized || m.locked {
            return false;
        }
        m.locked = true;
        true
    }

    unsafe fn unlock(&self, raw: NonNull<FakeMutex>) -> bool {
        self.record(Call::MutexUnlock);
        let m = &mut *raw.as_ptr();
        if !m.initialized || !m.locked {
            return false;
        }
        m.locked = false;
        true
    }
}

impl HostThread for RecordingHost {
    fn current_thread_id(&self) -> usize {
        7
    }

    fn stack_limit(&self) -> Option<NonNull<u8>> {
        self.stack_limit.and_then(|l| NonNull::new(l as *mut u8))
    }

    fn thread_cpu_time_us(&self) -> u64 {
        self.clock.fetch_add(3, Ordering::Relaxed)
    }
}

impl HostClock for RecordingHost {
    fn boot_time_us(&self) -> u64 {
        self.clock.fetch_add(10, Ordering::Relaxed)
    }
}

impl HostCache for RecordingHost {
    fn flush_data_cache(&self) {
        self.record(Call::FlushData);
    }

    unsafe fn flush_instruction_cache(&self, start: NonNull<u8>, len: usize) {
        self.record(Call::FlushInstruction {
            start: start.as_ptr() as usize,
            len,
        });
    }
}
