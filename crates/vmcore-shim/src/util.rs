/// Align `value` up to the next multiple of `align`, or `None` on overflow.
/// `align` must be a power of two.
#[inline(always)]
pub const fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Check if `value` is aligned to `align`.
#[inline(always)]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    value & (align - 1) == 0
}

/// Alignment requested from the host mapper when nothing else is configured.
pub const DEFAULT_MAP_ALIGNMENT: usize = 8;

/// Page size assumed when the host cannot report one.
pub const FALLBACK_PAGE_SIZE: usize = 4096;
