//! Startup utilities for the YAKS operator

mod crds;
mod retry;

pub use crds::{ensure_test_crd, test_crd, test_crd_yaml};
