//! Discforge-Common: Shared types, error handling, and path utilities.
//!
//! This crate provides common functionality used across discforge:
//!
//! - **Error Handling**: The unified [`Error`] type and [`Result`] alias
//! - **Disc Protocol**: [`DiscProtocol`] and filename-based detection
//! - **Path Utilities**: Placeholder and descriptor path conventions
//!
//! # Examples
//!
//! ```
//! use discforge_common::{detect_protocol, DiscProtocol};
//! use std::path::Path;
//!
//! assert_eq!(detect_protocol(Path::new("/m/Movie.DVD9.iso")), DiscProtocol::Dvd);
//! assert_eq!(detect_protocol(Path::new("/m/Movie.iso")), DiscProtocol::Bluray);
//! ```

pub mod error;
pub mod paths;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::{detect_protocol, DiscProtocol};
