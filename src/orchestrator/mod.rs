//! Application-level orchestration.
//!
//! This module owns the run lifecycle (log channel, start requests, health poll) and
//! the fallback-tolerant backend reads. UI/CLI layers call into this module to keep
//! responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
