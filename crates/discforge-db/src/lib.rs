//! Discforge-DB: SQLite-backed failure and upload caches
//!
//! This crate provides the two durable stores discforge keeps between scans,
//! each in its own SQLite file, using rusqlite with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations, one set per store
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the cache tables
//! - `queries` - Query operations for each cache
//!
//! # Example
//!
//! ```no_run
//! use discforge_db::migrations::Store;
//! use discforge_db::pool::{get_conn, init_pool};
//! use discforge_db::queries::failures;
//!
//! let pool = init_pool("/var/lib/discforge/failures.db", Store::Failures).unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let entry = failures::record(&conn, "/lib/Movie.strm", "ffprobe timed out").unwrap();
//! println!("{} has failed {} times", entry.file_path, entry.failure_count);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
