//! Virtual memory mapping on top of the host mapper.
//!
//! Sizes are rounded up to whole pages on every call, so `unmap` and
//! `reprotect` cover exactly what `map` handed out when given the same size.
//! No list of live regions is kept: the caller owns every [`Region`] and is
//! responsible for ordering protection changes against its own use of the
//! memory.

use core::ffi::c_int;
use core::ptr::{self, NonNull};

use crate::error::{Error, Result};
use crate::flags::{translate_mapping, translate_protection, RuntimeMapping, RuntimeProtection};
use crate::host::HostMemory;
use crate::util::{checked_align_up, is_aligned, DEFAULT_MAP_ALIGNMENT};

/// File handle slot of the runtime's `os_mmap`. Accepted, never used: only
/// anonymous private memory is ever requested.
pub type BackingHandle = c_int;

/// Protection of every region returned by [`MappingAdapter::grow`].
pub const GROW_PROTECTION: RuntimeProtection = RuntimeProtection::READ.union(RuntimeProtection::WRITE);

/// A mapped range as handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    base: NonNull<u8>,
    size: usize,
    protection: RuntimeProtection,
}

impl Region {
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Page-rounded length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Protection the region was created with. Later `reprotect` calls are not
    /// reflected here.
    pub fn protection(&self) -> RuntimeProtection {
        self.protection
    }
}

pub struct MappingAdapter<'h, M: HostMemory + ?Sized> {
    host: &'h M,
    alignment: usize,
}

impl<'h, M: HostMemory + ?Sized> MappingAdapter<'h, M> {
    pub fn new(host: &'h M) -> Self {
        Self {
            host,
            alignment: DEFAULT_MAP_ALIGNMENT,
        }
    }

    /// Alignment forwarded to the host mapper. Must be a power of two.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        debug_assert!(alignment.is_power_of_two());
        self.alignment = alignment;
        self
    }

    pub fn page_size(&self) -> usize {
        self.host.page_size()
    }

    fn round_to_pages(&self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(Error::ZeroSize);
        }
        checked_align_up(size, self.page_size()).ok_or(Error::SizeOverflow(size))
    }

    fn check_page_aligned(&self, addr: NonNull<u8>) -> Result<()> {
        let addr = addr.as_ptr() as usize;
        if is_aligned(addr, self.page_size()) {
            Ok(())
        } else {
            Err(Error::Misaligned(addr))
        }
    }

    /// Map anonymous private memory.
    ///
    /// # Safety
    /// With [`RuntimeMapping::FIXED`] the host may replace whatever is mapped at
    /// `hint`; the caller must own that range.
    pub unsafe fn map(
        &self,
        hint: Option<NonNull<u8>>,
        size: usize,
        protection: RuntimeProtection,
        mapping: RuntimeMapping,
        _backing: Option<BackingHandle>,
    ) -> Result<Region> {
        let size = self.round_to_pages(size).inspect_err(|e| {
            log::debug!("map: {e}");
        })?;
        let host_protection = translate_protection(protection);
        let host_flags = translate_mapping(mapping);

        match self
            .host
            .map(hint, size, self.alignment, host_protection, host_flags)
        {
            Some(base) => {
                log::trace!(
                    "map({:?}, {size:#x}, {:?}, {:?}) -> {:p}",
                    hint,
                    host_protection,
                    host_flags,
                    base
                );
                Ok(Region {
                    base,
                    size,
                    protection,
                })
            }
            None => {
                log::warn!("map of {size:#x} bytes ({:?}) refused by host", host_protection);
                Err(Error::MapFailed { size })
            }
        }
    }

    /// Release a region. A zero `size` is a no-op.
    ///
    /// # Safety
    /// `addr`/`size` must describe memory obtained from [`map`](Self::map) or
    /// [`grow`](Self::grow) that is no longer in use.
    pub unsafe fn unmap(&self, addr: NonNull<u8>, size: usize) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let size = self
            .check_page_aligned(addr)
            .and_then(|()| self.round_to_pages(size))
            .inspect_err(|e| log::warn!("unmap({:p}, {size:#x}) not forwarded: {e}", addr))?;
        log::trace!("unmap({:p}, {size:#x})", addr);
        self.host.unmap(addr, size);
        Ok(())
    }

    /// Change the protection of a mapped range. A zero `size` is a no-op.
    ///
    /// # Safety
    /// `addr`/`size` must lie inside memory obtained from this adapter.
    pub unsafe fn reprotect(
        &self,
        addr: NonNull<u8>,
        size: usize,
        protection: RuntimeProtection,
    ) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        self.check_page_aligned(addr)?;
        let size = self.round_to_pages(size)?;
        let host_protection = translate_protection(protection);

        if self.host.protect(addr, size, host_protection) {
            log::trace!("reprotect({:p}, {size:#x}, {:?})", addr, host_protection);
            Ok(())
        } else {
            log::warn!(
                "reprotect({:p}, {size:#x}, {:?}) refused by host",
                addr,
                host_protection
            );
            Err(Error::ProtectFailed {
                addr: addr.as_ptr() as usize,
                size,
            })
        }
    }

    /// Move a region into a fresh mapping of `new_size` bytes, copying the
    /// common prefix and releasing the old one.
    ///
    /// The new region is always [`GROW_PROTECTION`] (read/write). Whatever
    /// protection the old region carried is dropped; callers that need the
    /// memory executable again must call [`reprotect`](Self::reprotect).
    /// On failure the old region is left mapped and untouched.
    ///
    /// # Safety
    /// `old`/`old_size` must describe a readable region obtained from this
    /// adapter, and nothing may use it after a successful call.
    pub unsafe fn grow(
        &self,
        old: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
    ) -> Result<Region> {
        // Validate the old region up front so a failure never strands the new one.
        let old_len = match old {
            Some(old) if old_size != 0 => {
                self.check_page_aligned(old)?;
                self.round_to_pages(old_size)?
            }
            _ => 0,
        };

        let region = self.map(None, new_size, GROW_PROTECTION, RuntimeMapping::empty(), None)?;

        if let Some(old) = old {
            let keep = old_size.min(new_size);
            ptr::copy_nonoverlapping(old.as_ptr(), region.as_ptr(), keep);
            if old_len != 0 {
                self.host.unmap(old, old_len);
            }
            log::trace!(
                "grow({:p}, {old_size:#x}, {new_size:#x}) -> {:p}",
                old,
                region.base()
            );
        }
        Ok(region)
    }
}
