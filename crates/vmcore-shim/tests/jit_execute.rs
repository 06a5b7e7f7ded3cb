//! Load freshly written machine code and run it: the sequence an AOT/JIT
//! runtime performs for every compiled function.

#![cfg(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64")
))]

use std::ffi::c_void;
use std::ptr;

use vmcore_shim::api;
use vmcore_shim::config::Config;
use vmcore_shim::host::NativeHost;
use vmcore_shim::{Platform, RuntimeMapping, RuntimeProtection};

static HOST: NativeHost = NativeHost;

const CODE_LEN: usize = 16;

/// `return value;` padded with traps to 16 bytes.
#[cfg(target_arch = "x86_64")]
fn return_constant(value: u8) -> [u8; CODE_LEN] {
    let mut code = [0xCC; CODE_LEN]; // int3
    code[..6].copy_from_slice(&[0xB8, value, 0x00, 0x00, 0x00, 0xC3]); // mov eax, imm32; ret
    code
}

#[cfg(target_arch = "aarch64")]
fn return_constant(value: u8) -> [u8; CODE_LEN] {
    let movz = 0x5280_0000u32 | ((value as u32) << 5); // movz w0, #value
    let ret = 0xD65F_03C0u32;
    let brk = 0xD420_0000u32;
    let mut code = [0u8; CODE_LEN];
    for (i, word) in [movz, ret, brk, brk].iter().enumerate() {
        code[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    code
}

#[cfg(target_arch = "riscv64")]
fn return_constant(value: u8) -> [u8; CODE_LEN] {
    let li = ((value as u32) << 20) | 0x0000_0513; // addi a0, zero, #value
    let ret = 0x0000_8067u32; // jalr zero, 0(ra)
    let ebreak = 0x0010_0073u32;
    let mut code = [0u8; CODE_LEN];
    for (i, word) in [li, ret, ebreak, ebreak].iter().enumerate() {
        code[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    code
}

unsafe fn call(addr: *mut u8) -> u32 {
    let f: extern "C" fn() -> u32 = std::mem::transmute(addr);
    f()
}

#[test]
fn write_flush_protect_flush_execute() {
    let p = Platform::new(&HOST, Config::default());
    let mapping = p.mapping();
    let cache = p.cache();
    unsafe {
        let region = mapping
            .map(None, 4096, RuntimeProtection::WRITE, RuntimeMapping::empty(), None)
            .expect("map code page");

        ptr::copy_nonoverlapping(return_constant(42).as_ptr(), region.as_ptr(), CODE_LEN);
        cache.flush_data_cache();
        mapping
            .reprotect(region.base(), 4096, RuntimeProtection::EXEC | RuntimeProtection::READ)
            .expect("make executable");
        cache.flush_instruction_cache(region.as_ptr(), CODE_LEN);

        assert_eq!(call(region.as_ptr()), 42);

        mapping.unmap(region.base(), 4096).unwrap();
    }
}

#[test]
fn repeated_instruction_flush_is_harmless() {
    let p = Platform::new(&HOST, Config::default());
    let mapping = p.mapping();
    let cache = p.cache();
    unsafe {
        let region = mapping
            .map(None, 4096, RuntimeProtection::WRITE, RuntimeMapping::empty(), None)
            .unwrap();
        ptr::copy_nonoverlapping(return_constant(5).as_ptr(), region.as_ptr(), CODE_LEN);
        cache.flush_data_cache();
        mapping
            .reprotect(region.base(), 4096, RuntimeProtection::EXEC | RuntimeProtection::READ)
            .unwrap();
        cache.flush_instruction_cache(region.as_ptr(), CODE_LEN);
        let once = call(region.as_ptr());
        cache.flush_instruction_cache(region.as_ptr(), CODE_LEN);
        cache.flush_instruction_cache(region.as_ptr(), CODE_LEN);
        assert_eq!(call(region.as_ptr()), once);
        assert_eq!(once, 5);

        mapping.unmap(region.base(), 4096).unwrap();
    }
}

#[test]
fn rewritten_code_is_observed_after_flushes() {
    let p = Platform::new(&HOST, Config::default());
    let mapping = p.mapping();
    let cache = p.cache();
    let rx = RuntimeProtection::EXEC | RuntimeProtection::READ;
    let rw = RuntimeProtection::READ | RuntimeProtection::WRITE;
    unsafe {
        let region = mapping
            .map(None, 4096, rw, RuntimeMapping::empty(), None)
            .unwrap();

        for value in [1u8, 2, 3, 200] {
            mapping.reprotect(region.base(), 4096, rw).unwrap();
            ptr::copy_nonoverlapping(return_constant(value).as_ptr(), region.as_ptr(), CODE_LEN);
            cache.flush_data_cache();
            mapping.reprotect(region.base(), 4096, rx).unwrap();
            cache.flush_instruction_cache(region.as_ptr(), CODE_LEN);
            assert_eq!(call(region.as_ptr()), value as u32);
        }

        mapping.unmap(region.base(), 4096).unwrap();
    }
}

#[test]
fn grown_code_runs_after_reprotect() {
    let p = Platform::new(&HOST, Config::default());
    let mapping = p.mapping();
    let cache = p.cache();
    unsafe {
        let region = mapping
            .map(None, 4096, RuntimeProtection::READ | RuntimeProtection::WRITE, RuntimeMapping::empty(), None)
            .unwrap();
        ptr::copy_nonoverlapping(return_constant(9).as_ptr(), region.as_ptr(), CODE_LEN);

        let grown = mapping.grow(Some(region.base()), 4096, 8192).unwrap();
        cache.flush_data_cache();
        mapping
            .reprotect(grown.base(), grown.size(), RuntimeProtection::EXEC | RuntimeProtection::READ)
            .unwrap();
        cache.flush_instruction_cache(grown.as_ptr(), CODE_LEN);
        assert_eq!(call(grown.as_ptr()), 9);

        mapping.unmap(grown.base(), grown.size()).unwrap();
    }
}

#[test]
fn c_abi_code_loading() {
    const PROT_READ: i32 = 1;
    const PROT_WRITE: i32 = 2;
    const PROT_EXEC: i32 = 4;
    unsafe {
        assert_eq!(api::bh_platform_init(), 0);
        let page = api::os_getpagesize() as usize;
        let addr = api::os_mmap(ptr::null_mut(), page, PROT_WRITE, 0, -1);
        assert!(!addr.is_null());

        ptr::copy_nonoverlapping(return_constant(77).as_ptr(), addr as *mut u8, CODE_LEN);
        api::os_dcache_flush();
        assert_eq!(api::os_mprotect(addr, page, PROT_EXEC | PROT_READ), 0);
        api::os_icache_flush(addr, CODE_LEN);

        assert_eq!(call(addr as *mut u8), 77);
        api::os_munmap(addr as *mut c_void, page);
    }
}
