//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod tick_driver;
pub mod wake_up_recovery;

// Re-export main functions
pub use tick_driver::tick_driver_task;
pub use wake_up_recovery::wake_up_recovery_task;
