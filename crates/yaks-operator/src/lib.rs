//! YAKS operator: runs the Test controller in a cluster

#![deny(missing_docs)]

/// Command line and environment configuration
pub mod cli;
/// Builds the Test controller future
pub mod controller_runner;
/// Startup utilities (CRD install)
pub mod startup;
