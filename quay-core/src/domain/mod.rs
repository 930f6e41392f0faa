//! Core domain types
//!
//! This module contains the core domain structures used across Quay services.
//! These types represent the fundamental business entities and are shared
//! between the orchestrator (for persistence), the build worker (for event
//! production) and the proxy (for resolution).

pub mod deployment;
pub mod log;
pub mod project;
pub mod user;
