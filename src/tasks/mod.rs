//! Background Tasks Module
//!
//! Contains the tasks that expire cache entries in the background.
//!
//! # Tasks
//! - TTL Sweep: Removes every expired entry at a fixed interval
//! - Expiry Timer: One-shot removal of a single entry after its TTL

mod expiry;
mod sweep;

pub(crate) use expiry::spawn_expiry_timer;
pub(crate) use sweep::spawn_sweep_task;
