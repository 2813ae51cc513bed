//! # discforge-av
//!
//! External-tool plumbing for turning disc images into raw media facts.
//!
//! This crate provides:
//! - [`ToolCommand`], a timeout-bounded subprocess builder
//! - [`BackoffSchedule`] and [`retry_with_backoff`], the retry policy
//! - [`RemoteMountDetector`], the pluggable "is this on a remote mount" check
//! - The probe extractor ([`probe::ProbeExtractor`]) wrapping a [`probe::Prober`]
//! - The disc structure extractor ([`disc::DiscStructureExtractor`]) that
//!   mounts an image and runs a [`disc::DiscLister`]
//! - [`reconcile::reconcile_duration`], which picks the trustworthy runtime
//!
//! The external binaries are opaque: each sits behind a narrow trait so tests
//! can substitute fixtures.

pub mod command;
pub mod disc;
pub mod locate;
pub mod probe;
pub mod reconcile;
pub mod remote;
pub mod retry;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use disc::{
    BdListTitles, DiscLanguageInfo, DiscLister, DiscSettings, DiscStructureExtractor, DiscTitle,
    LanguageCache, LoopMounter, Mounter,
};
pub use locate::ensure_visible;
pub use probe::{FfprobeProber, ProbeExtractor, ProbeOutcome, ProbeResult, ProbeSettings, Prober};
pub use reconcile::{reconcile_duration, ReconcileSettings};
pub use remote::{default_remote_markers, MountHeuristic, RemoteMountDetector};
pub use retry::{retry_with_backoff, BackoffSchedule};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
