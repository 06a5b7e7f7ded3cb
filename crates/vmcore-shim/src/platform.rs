use crate::cache::CacheControl;
use crate::config::Config;
use crate::heap::AllocatorBridge;
use crate::host::Host;
use crate::mmap::MappingAdapter;
use crate::mutex::MutexAdapter;
use crate::thread::ThreadContext;
use crate::time::TimeSource;

/// One host plus the configuration, handing out the individual adapters.
///
/// Holds no state of its own; building one is free and every adapter it
/// returns borrows the same host.
pub struct Platform<'h, H: Host + ?Sized> {
    host: &'h H,
    config: Config,
}

impl<'h, H: Host + ?Sized> Platform<'h, H> {
    pub fn new(host: &'h H, config: Config) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn heap(&self) -> AllocatorBridge<'h, H> {
        AllocatorBridge::new(self.host)
    }

    pub fn mapping(&self) -> MappingAdapter<'h, H> {
        MappingAdapter::new(self.host).with_alignment(self.config.map_alignment)
    }

    pub fn mutex(&self) -> MutexAdapter<'h, H> {
        MutexAdapter::new(self.host)
    }

    pub fn thread(&self) -> ThreadContext<'h, H> {
        ThreadContext::new(self.host, &self.config)
    }

    pub fn time(&self) -> TimeSource<'h, H> {
        TimeSource::new(self.host)
    }

    pub fn cache(&self) -> CacheControl<'h, H> {
        CacheControl::new(self.host)
    }
}
