//! Definitions of errors that can occur while reading or writing network configuration

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur while reading or writing a network configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Error reading the configuration file
    ReadFile(String),
    /// Error writing the configuration file
    WriteFile(String),
    /// Error parsing the configuration JSON
    Parse(String),
    /// A deployed-address value that is not a valid address
    InvalidAddress {
        /// The key under which the value was found
        key: String,
        /// The offending value
        value: String,
    },
    /// A deployed-address key that names neither a proxy nor an implementation
    UnknownDeployedKey(String),
    /// A logical contract with only one of its proxy / implementation addresses recorded
    InconsistentEntry(String),
    /// The same logical contract name appears twice in the contract plan
    DuplicateContract(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFile(s) => write!(f, "error reading config: {}", s),
            ConfigError::WriteFile(s) => write!(f, "error writing config: {}", s),
            ConfigError::Parse(s) => write!(f, "error parsing config: {}", s),
            ConfigError::InvalidAddress { key, value } => {
                write!(f, "invalid address for `{}`: {}", key, value)
            }
            ConfigError::UnknownDeployedKey(key) => write!(
                f,
                "deployed address key `{}` must end in `Proxy` or `Impl`",
                key
            ),
            ConfigError::InconsistentEntry(name) => write!(
                f,
                "`{}` has only one of its proxy / implementation addresses recorded",
                name
            ),
            ConfigError::DuplicateContract(name) => {
                write!(f, "contract `{}` is declared more than once", name)
            }
        }
    }
}

impl Error for ConfigError {}
