//! Server configuration constants.

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address (localhost only).
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "testdesk.toml";
