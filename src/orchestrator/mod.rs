//! Application-level orchestration.
//!
//! Owns the run lifecycle (fetch, skip check, transform, deliver) and the
//! row transforms that turn a query result into something deliverable.

mod controller;
mod transform;

pub(crate) use controller::{failure_title, run};
