//! Discforge - media descriptors for remote disc images
//!
//! Turns `.strm` placeholders pointing at remote Blu-ray/DVD images into
//! `-mediainfo.json` descriptors. This library crate exposes the core
//! functionality for integration testing.

pub mod config;
pub mod descriptor;
pub mod failures;
pub mod notifications;
pub mod scanner;
pub mod upload;
