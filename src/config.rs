/// Engine configuration
///
/// Options are fixed once the engine is created. They can be assembled with
/// `EngineOptionsBuilder` or layered from environment variables.
use crate::contracts::Mode;

/// Environment variable enabling raw mode
pub const ENV_RAW: &str = "CYNDA_UDP_RAW";

/// Environment variable naming the network device to bind to
pub const ENV_BIND_DEVICE: &str = "CYNDA_UDP_BIND_DEVICE";

/// Environment variable controlling multicast loopback
pub const ENV_MULTICAST_LOOP: &str = "CYNDA_UDP_MULTICAST_LOOP";

/// Configuration consumed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Expose peer addresses instead of the group envelope
    pub raw: bool,

    /// Network device the socket is bound to, if any
    pub bound_device: Option<String>,

    /// Whether multicast datagrams we send loop back to local receivers
    pub multicast_loop: bool,
}

impl EngineOptions {
    pub fn mode(&self) -> Mode {
        if self.raw {
            Mode::Raw
        } else {
            Mode::Framed
        }
    }

    /// Load options from the process environment, over the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load options through an arbitrary key lookup
    ///
    /// Unset or unparseable booleans keep their default value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|value| parse_flag(&value))
                .unwrap_or(default)
        };

        Self {
            raw: flag(ENV_RAW, defaults.raw),
            bound_device: lookup(ENV_BIND_DEVICE)
                .map(|device| device.trim().to_string())
                .filter(|device| !device.is_empty()),
            multicast_loop: flag(ENV_MULTICAST_LOOP, defaults.multicast_loop),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            raw: false,
            bound_device: None,
            multicast_loop: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// EngineOptionsBuilder - Fluent interface for engine configuration
pub struct EngineOptionsBuilder {
    options: EngineOptions,
}

impl EngineOptionsBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
        }
    }

    /// Enable or disable raw mode
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.options.raw = raw;
        self
    }

    /// Bind the socket to a network device
    pub fn with_bound_device(mut self, device: impl Into<String>) -> Self {
        self.options.bound_device = Some(device.into());
        self
    }

    /// Set the multicast loopback preference
    pub fn with_multicast_loop(mut self, enable: bool) -> Self {
        self.options.multicast_loop = enable;
        self
    }

    pub fn is_raw(&self) -> bool {
        self.options.raw
    }

    pub fn get_bound_device(&self) -> Option<&str> {
        self.options.bound_device.as_deref()
    }

    pub fn is_multicast_loop_enabled(&self) -> bool {
        self.options.multicast_loop
    }

    pub fn build(self) -> EngineOptions {
        self.options
    }
}

impl Default for EngineOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
