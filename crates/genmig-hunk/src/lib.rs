//! genmig hunk model
//!
//! Template-side change blocks and their translation into rendered text.
//!
//! # Core Concepts
//!
//! - [`RawHunk`]: change block against the generator's template sources
//! - [`NormalizedHunk`]: the same block with placeholders substituted
//! - [`DelimiterSpec`]: open/close markers of template placeholders
//! - [`PropertyMap`]: resolved placeholder values with fixed source precedence
//! - [`Normalizer`]: pure RawHunk → NormalizedHunk translation
//! - [`FileChange`] / [`DiffSet`]: hunks grouped by upstream file
//! - [`TemplatePrefix`]: upstream → project path mapping
//! - [`ContentHash`]: Blake3 fingerprint of local file bytes
//!
//! # Example
//!
//! ```rust,ignore
//! use genmig_hunk::{DelimiterSpec, Normalizer, PropertyMap, RawHunk};
//!
//! let props = PropertyMap::from_pairs([("appName", "widget")]);
//! let delimiters = DelimiterSpec::ejs();
//! let hunk = RawHunk::replacement(
//!     "templates/index.html",
//!     &["Welcome to <%= appName %>"],
//!     &["Welcome to <%= appName %>!"],
//! );
//!
//! let normalized = Normalizer::new(&delimiters, &props).normalize(&hunk);
//! assert_eq!(normalized.added_block(), vec!["Welcome to widget!"]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod delimiter;
mod hash;
mod hunk;
mod normalize;
mod path;
mod property;
mod unified;

// Re-exports
pub use delimiter::{DelimiterError, DelimiterSpec, EJS_CLOSE, EJS_OPEN};
pub use hash::ContentHash;
pub use hunk::{
    ChangeStatus, DiffSet, FileChange, HunkBuilder, HunkLine, HunkText, LineKind, LineRange,
    NormalizedHunk, RawHunk,
};
pub use normalize::{NormalizedLine, Normalizer};
pub use path::{PathError, TemplatePrefix};
pub use property::{stringify, PropertyMap, PropertyMapBuilder, PropertySource};
pub use unified::{parse_patch, parse_unified_diff, PatchParseError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
