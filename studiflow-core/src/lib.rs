//! studiflow-core - Scheduling and automation engine for StudiFlow
//!
//! This crate provides the core services behind the StudiFlow engine daemon:
//!
//! - **scheduler**: Scheduled posts, weekly calendar, publish loop
//! - **session**: Automation session lifecycle and activity loop
//! - **budget**: Daily per-action-type budgets
//! - **executor**: Simulated action execution
//! - **strategy**: Built-in engagement strategy presets
//! - **risk**: Risk and compliance assessment
//! - **collaborators**: Publishing, content and targeting contracts
//! - **time**: Injectable clock and calendar helpers

pub mod budget;
pub mod collaborators;
pub mod error;
pub mod executor;
pub mod risk;
pub mod scheduler;
pub mod session;
pub mod strategy;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use scheduler::PostScheduler;
pub use session::AutomationSessionManager;
