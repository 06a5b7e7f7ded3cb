use crate::config;
use crate::host::NativeHost;
use crate::platform::Platform;
use core::sync::atomic::{AtomicU8, Ordering};

const UNINIT: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

static INIT_STATE: AtomicU8 = AtomicU8::new(UNINIT);

/// The host the exported C symbols are bound to.
static HOST: NativeHost = NativeHost;

/// Bring the platform up: read configuration and mark it ready. Safe to call
/// repeatedly and from several threads at once; late callers wait for the
/// first one to finish.
pub fn platform_init() {
    match INIT_STATE.compare_exchange(UNINIT, INITIALIZING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {}
        Err(INITIALIZING) => {
            while INIT_STATE.load(Ordering::Acquire) == INITIALIZING {
                core::hint::spin_loop();
            }
            return;
        }
        Err(_) => return,
    }

    let config = config::read_config();
    log::info!(
        "platform ready: page size {:#x}, map alignment {}, stack boundary {}",
        crate::host::sys::page_size(),
        config.map_alignment,
        if config.stack_boundary { "on" } else { "off" }
    );

    INIT_STATE.store(READY, Ordering::Release);
}

/// Return to the uninitialized state. The next call re-reads configuration.
pub fn platform_destroy() {
    if INIT_STATE
        .compare_exchange(READY, UNINIT, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        log::info!("platform destroyed");
    }
}

#[inline(always)]
pub fn is_ready() -> bool {
    INIT_STATE.load(Ordering::Acquire) == READY
}

#[cold]
#[inline(never)]
fn initialize_late() {
    platform_init();
}

/// The native platform, initializing it first if the runtime skipped
/// `bh_platform_init`.
#[inline]
pub fn platform() -> Platform<'static, NativeHost> {
    if !is_ready() {
        initialize_late();
    }
    Platform::new(&HOST, config::current())
}
