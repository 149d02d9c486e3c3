//! Integration tests for the YAKS operator
//!
//! These tests require a Kubernetes cluster (kind) and tell the story of how
//! users run tests through the operator.
//!
//! # Test Organization
//!
//! - `crd_operations`: creating, reading, updating and deleting Test
//!   resources through the Kubernetes API
//!
//! - `test_lifecycle`: the controller driving a Test from creation to a
//!   terminal phase, and restarting it when its source changes
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they require a kind cluster:
//!
//! ```bash
//! cargo test -p yaks-operator --test kind -- --ignored --nocapture
//! ```

mod crd_operations;
mod helpers;
mod test_lifecycle;
