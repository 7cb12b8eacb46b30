//! Scripts for deploying, verifying, and upgrading the gateway contracts behind
//! upgradeable proxies, driven by per-network configuration files.

#![deny(missing_docs)]

pub mod artifacts;
#[allow(missing_docs)]
pub mod cli;
mod commands;
pub mod constants;
pub mod deployer;
pub mod errors;
pub mod orchestrator;
pub mod registry;
#[allow(missing_docs)]
pub mod solidity;
pub mod transport;
pub mod upgrader;
pub mod utils;
pub mod verifier;
