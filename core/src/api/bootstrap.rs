//! One-time, process-wide engine setup.

use core::fmt;

use once_cell::sync::OnceCell;

use super::{Error, InitOptions};

static PLATFORM: OnceCell<()> = OnceCell::new();

/// Initialize the engine platform with default options.
///
/// Must run before any [`super::Environment`] is created. A second call
/// returns [`Error::AlreadyInitialized`] and leaves the running platform
/// untouched.
pub fn init() -> Result<(), Error> {
    init_with(InitOptions::default())
}

/// Initialize the engine platform with `options`.
pub fn init_with(options: InitOptions) -> Result<(), Error> {
    let mut ran = false;
    PLATFORM.get_or_init(|| {
        ran = true;
        start(&options)
    });
    if ran {
        Ok(())
    } else {
        tracing::warn!("engine bootstrap requested twice");
        Err(Error::AlreadyInitialized)
    }
}

/// Initialize with default options unless that already happened.
///
/// For hosts that cannot funnel bootstrap through a single call site.
pub fn init_once() {
    PLATFORM.get_or_init(|| start(&InitOptions::default()));
}

pub fn is_initialized() -> bool {
    PLATFORM.get().is_some()
}

fn start(options: &InitOptions) {
    if let Some(flags) = &options.flags {
        v8::V8::set_flags_from_string(flags);
    }
    let platform = v8::new_default_platform(options.thread_pool_size, false).make_shared();
    v8::V8::initialize_platform(platform);
    v8::V8::initialize();
    tracing::debug!(version = %version(), "engine initialized");
}

/// Build numbers of the embedded engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub patch: u32,
}

impl Version {
    /// Parse a dotted engine version such as `"12.9.202.13-rusty"`. Missing
    /// or non-numeric components read as 0.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split('.').map(|part| {
            let digits = part
                .find(|c: char| !c.is_ascii_digit())
                .map_or(part, |end| &part[..end]);
            digits.parse().unwrap_or(0)
        });
        let mut next = || parts.next().unwrap_or(0);
        Version {
            major: next(),
            minor: next(),
            build: next(),
            patch: next(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.patch
        )
    }
}

/// Version of the embedded engine. Needs no initialization.
pub fn version() -> Version {
    Version::parse(v8::V8::get_version())
}
