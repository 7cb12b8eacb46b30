//! Keys and markers used in the per-network configuration files

/// The path segment appended to the explorer URL when no API URL is configured
pub const DEFAULT_EXPLORER_API_PATH: &str = "api";

/// The top-level key holding the addresses recorded by prior deployments
pub const DEPLOYED_ADDRESS_KEY: &str = "deployedAddress";

/// The suffix of a deployed-address key holding a proxy address,
/// e.g. `GatewaySendProxy`
pub const PROXY_KEY_SUFFIX: &str = "Proxy";

/// The suffix of a deployed-address key holding an implementation address,
/// e.g. `GatewaySendImpl`
pub const IMPL_KEY_SUFFIX: &str = "Impl";

/// The extension used when staging a rewritten config file before it
/// replaces the original
pub const STAGING_FILE_EXTENSION: &str = "json.tmp";

/// The indentation used when writing config files
pub const JSON_INDENT: &[u8] = b"    ";
