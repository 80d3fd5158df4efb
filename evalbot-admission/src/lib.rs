//! Admission control and abuse mitigation
//!
//! Arbitrates concurrent requests from many untrusted callers: per-identity
//! warn/ban escalation, duplicate-command suppression, global in-flight
//! accounting, and load-proportional response scheduling.

mod controller;
mod store;

pub use controller::{AdmissionConfig, AdmissionController, Decision};
pub use store::{FileListStore, ListStore, MemoryListStore};
