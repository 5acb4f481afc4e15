//! I/O helpers and external collaborators for the mission core.

pub mod agent;
pub mod approval;
pub mod clock;
pub mod config;
pub mod memory;
pub mod process;
pub mod sandbox;
pub mod tools;
