//! Protection and mapping flag translation.
//!
//! The runtime speaks the vmcore `MMAP_PROT_*` / `MMAP_MAP_*` vocabulary, the
//! host speaks its own. Both directions of a mistake here are silent (a page
//! that is executable when it should not be, or a fixed mapping that clobbers
//! live memory), so translation goes through explicit tables indexed by the
//! recognized runtime bits instead of chains of conditionals. The tests
//! enumerate the whole input domain.

use bitflags::bitflags;
use core::ffi::c_int;

bitflags! {
    /// Runtime-side protection bits (`MMAP_PROT_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuntimeProtection: c_int {
        const READ = 1;
        const WRITE = 2;
        const EXEC = 4;
    }
}

bitflags! {
    /// Runtime-side mapping bits (`MMAP_MAP_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuntimeMapping: c_int {
        const ADDRESS_32_BIT = 1;
        const FIXED = 2;
    }
}

bitflags! {
    /// Host-side protection bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HostProtection: u8 {
        const EXECUTE = 1 << 0;
        const WRITE = 1 << 1;
        const READ = 1 << 2;
    }
}

bitflags! {
    /// Host-side mapping bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HostMapping: u8 {
        const ANONYMOUS = 1 << 0;
        const PRIVATE = 1 << 1;
        const FIXED = 1 << 2;
        const ADDRESS_32_BIT = 1 << 3;
    }
}

/// Every mapping request carries these; file-backed or shared memory is never
/// asked for.
pub const IMPLICIT_MAPPING: HostMapping = HostMapping::ANONYMOUS.union(HostMapping::PRIVATE);

const R: HostProtection = HostProtection::READ;
const W: HostProtection = HostProtection::WRITE;
const X: HostProtection = HostProtection::EXECUTE;

/// Indexed by `RuntimeProtection::bits()`.
const PROTECTION_TABLE: [HostProtection; 8] = [
    HostProtection::empty(), // ---
    R,                       // R--
    W,                       // -W-
    R.union(W),              // RW-
    X,                       // --X
    R.union(X),              // R-X
    W.union(X),              // -WX
    R.union(W).union(X),     // RWX
];

/// Indexed by `RuntimeMapping::bits()`.
const MAPPING_TABLE: [HostMapping; 4] = [
    IMPLICIT_MAPPING,
    IMPLICIT_MAPPING.union(HostMapping::ADDRESS_32_BIT),
    IMPLICIT_MAPPING.union(HostMapping::FIXED),
    IMPLICIT_MAPPING
        .union(HostMapping::FIXED)
        .union(HostMapping::ADDRESS_32_BIT),
];

/// Translate runtime protection bits into the host vocabulary.
///
/// Bits outside [`RuntimeProtection::all`] are ignored, so the function is
/// defined for every value a `RuntimeProtection` can hold.
#[inline]
pub const fn translate_protection(protection: RuntimeProtection) -> HostProtection {
    let index = protection.bits() & RuntimeProtection::all().bits();
    PROTECTION_TABLE[index as usize]
}

/// Translate runtime mapping bits into the host vocabulary. The result always
/// contains [`IMPLICIT_MAPPING`].
#[inline]
pub const fn translate_mapping(mapping: RuntimeMapping) -> HostMapping {
    let index = mapping.bits() & RuntimeMapping::all().bits();
    MAPPING_TABLE[index as usize]
}

/// Decode a raw `prot` argument from the C boundary, dropping unknown bits.
#[inline]
pub const fn protection_from_raw(raw: c_int) -> RuntimeProtection {
    RuntimeProtection::from_bits_truncate(raw)
}

/// Decode a raw `flags` argument from the C boundary, dropping unknown bits.
#[inline]
pub const fn mapping_from_raw(raw: c_int) -> RuntimeMapping {
    RuntimeMapping::from_bits_truncate(raw)
}
