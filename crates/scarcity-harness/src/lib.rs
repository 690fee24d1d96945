//! # scarcity-harness
//!
//! Integration harness: probes the three external services and runs the
//! protocol scenarios as a self-test, degrading gracefully when services
//! are unreachable.
//!
//! ## Modules
//!
//! - [`probe`] — External-service reachability checks
//! - [`scenarios`] — End-to-end scenario orchestration
//! - [`wiring`] — Transport-to-gossip glue for live deployments

pub mod probe;
pub mod scenarios;
pub mod wiring;
