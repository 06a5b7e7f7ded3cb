use crate::util::DEFAULT_MAP_ALIGNMENT;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const ENV_MAP_ALIGNMENT: &str = "VMCORE_SHIM_MAP_ALIGNMENT";
pub const ENV_STACK_RESERVE: &str = "VMCORE_SHIM_STACK_RESERVE";
pub const ENV_NO_STACK_BOUNDARY: &str = "VMCORE_SHIM_NO_STACK_BOUNDARY";

/// Tunables for the adapters. Plain data: adapters receive a copy, they never
/// read the environment themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Alignment handed to the host mapper.
    pub map_alignment: usize,
    /// Headroom added above the host's stack limit when reporting the boundary.
    pub stack_reserve: usize,
    /// When false the stack boundary is always reported as unknown.
    pub stack_boundary: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map_alignment: DEFAULT_MAP_ALIGNMENT,
            stack_reserve: 0,
            stack_boundary: true,
        }
    }
}

impl Config {
    /// Build a config from an arbitrary key lookup. Malformed values fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(align) = lookup(ENV_MAP_ALIGNMENT).as_deref().and_then(parse_usize) {
            if align.is_power_of_two() {
                config.map_alignment = align;
            } else {
                log::warn!("{ENV_MAP_ALIGNMENT}={align} is not a power of two, keeping {}", config.map_alignment);
            }
        }
        if let Some(reserve) = lookup(ENV_STACK_RESERVE).as_deref().and_then(parse_usize) {
            config.stack_reserve = reserve;
        }
        if lookup(ENV_NO_STACK_BOUNDARY).is_some() {
            config.stack_boundary = false;
        }
        config
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_usize(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Process-wide copy used by the exported C symbols.
static MAP_ALIGNMENT: AtomicUsize = AtomicUsize::new(DEFAULT_MAP_ALIGNMENT);
static STACK_RESERVE: AtomicUsize = AtomicUsize::new(0);
static STACK_BOUNDARY: AtomicBool = AtomicBool::new(true);

/// Read configuration from environment variables into the process-wide copy.
/// Called from platform init.
pub fn read_config() -> Config {
    let config = Config::from_env();
    store(config);
    config
}

pub fn store(config: Config) {
    MAP_ALIGNMENT.store(config.map_alignment, Ordering::Relaxed);
    STACK_RESERVE.store(config.stack_reserve, Ordering::Relaxed);
    STACK_BOUNDARY.store(config.stack_boundary, Ordering::Relaxed);
}

pub fn current() -> Config {
    Config {
        map_alignment: MAP_ALIGNMENT.load(Ordering::Relaxed),
        stack_reserve: STACK_RESERVE.load(Ordering::Relaxed),
        stack_boundary: STACK_BOUNDARY.load(Ordering::Relaxed),
    }
}
