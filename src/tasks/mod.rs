//! Background Tasks Module
//!
//! Contains the long-lived loops owned by every cache instance.
//!
//! # Tasks
//! - Sweeper: Removes expired items at the configured sweep interval
//! - Auditor: Reports store statistics at the configured audit interval

mod auditor;
mod sweeper;

pub use auditor::spawn_auditor;
pub use sweeper::spawn_sweeper;
