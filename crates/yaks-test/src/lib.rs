//! Test lifecycle controller for YAKS
//!
//! Reconciles `Test` resources through a phase-driven state machine:
//! New → Pending → Running → Passed/Failed/Error, restarting a finished
//! test when its digest (spec + controller version) changes.
//!
//! - [`actions`] - the five reconciliation actions and their selection
//! - [`digest`] - change-detection fingerprint
//! - [`workload`] - Pod/ConfigMap materialization for one generation
//! - [`rbac`] - viewer ServiceAccount/Role/RoleBinding for test Pods
//! - [`results`] - outcome and report of a finished worker Pod
//! - [`controller`] - the reconcile loop and Kubernetes client seam

pub mod actions;
pub mod config;
pub mod controller;
pub mod digest;
pub mod error;
pub mod rbac;
pub mod results;
pub mod workload;

pub use config::TestControllerConfig;
pub use controller::{error_policy, reconcile, Context, KubeClient, KubeClientImpl};
pub use error::TestError;
