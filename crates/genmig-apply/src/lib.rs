//! genmig patch application
//!
//! Applies rendered hunks to a project's files by exact whole-line matching.
//!
//! # Core Concepts
//!
//! - [`TextBuffer`]: file content as lines, terminators preserved
//! - [`PatchApplicator`]: per-hunk and per-file application
//! - [`HunkOutcome`]: `Applied`, `Skipped` or `Conflict` for one hunk
//! - [`ApplyResult`]: aggregate result for one file
//! - [`FileProposal`]: write, delete or leave the local file
//! - [`ConflictPolicy`]: untouched file or appended conflict blocks
//!
//! # Example
//!
//! ```rust,ignore
//! use genmig_apply::{PatchApplicator, TextBuffer};
//!
//! let mut buffer = TextBuffer::from_text("Welcome to widget\n");
//! let outcome = PatchApplicator::default().apply_hunk(&mut buffer, &hunk);
//! assert!(outcome.is_applied());
//! assert_eq!(buffer.to_text(), "Welcome to widget!\n");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod applicator;
mod buffer;
pub mod markers;
mod outcome;

// Re-exports
pub use applicator::{ConflictPolicy, PatchApplicator};
pub use buffer::{LineEnding, TextBuffer};
pub use outcome::{
    ApplyResult, ConflictKind, FileApplication, FileProposal, HunkOutcome, HunkReport, SkipReason,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
