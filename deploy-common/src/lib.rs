//! Common types used throughout the deployment tooling, including the per-network
//! configuration, the contract plan, and the results of deployment actions

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
