//! # Hafiz Support
//!
//! Shared utilities for the Hafiz retention registry.
//!
//! This crate provides:
//! - Text rendering for diagnostics (ancestor chains, short type names)
//! - Logging bootstrap on top of `tracing-subscriber`

pub mod logging;
pub mod rendering;
